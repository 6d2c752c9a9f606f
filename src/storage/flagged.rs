//! # Flagged Store (variant B)
//!
//! Fixed-width record store where every row carries one leading deletion
//! flag byte followed by the packed-layout field bytes. Deleting a record
//! sets the flag and leaves the field bytes untouched: they remain
//! recoverable by inspection but are semantically gone, and every read path
//! excludes the row.
//!
//! ## Row Layout
//!
//! ```text
//! +------+----------------------------+
//! | flag |  packed fields             |
//! | 1 B  |  model.packed_row_width()  |
//! +------+----------------------------+
//! ```
//!
//! Because deletion is explicit, the packed layout may contain all-zero
//! field bytes (an integer zero, an empty text field) without any
//! ambiguity, closing the gap that makes the tombstone variant a
//! lower-guarantee mode. This is the default variant.

use std::path::{Path, PathBuf};

use eyre::{bail, Result};
use hashbrown::HashMap;

use super::record_file::RecordFile;
use super::store::{resolve_live, DeleteMarking, RecordStore, Scan};
use super::{DB_FILE_EXTENSION, FLAG_DELETED, FLAG_LIVE, FLAG_WIDTH};
use crate::error::StoreError;
use crate::index::{index_file_name, TrieIndex};
use crate::model::{trim_fill, FieldKind, ModelSpec, FILL_BYTE};

pub struct FlaggedStore {
    file: RecordFile,
    model: ModelSpec,
    dir: PathBuf,
    indexes: HashMap<String, TrieIndex>,
}

impl FlaggedStore {
    /// Opens `<dir>/<model>.db`, creating it empty if absent.
    pub fn open<P: AsRef<Path>>(dir: P, model: ModelSpec) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let path = dir.join(format!("{}.{}", model.name(), DB_FILE_EXTENSION));
        let file = RecordFile::open(path, FLAG_WIDTH + model.packed_row_width())?;

        Ok(Self {
            file,
            model,
            dir,
            indexes: HashMap::new(),
        })
    }

    pub fn model(&self) -> &ModelSpec {
        &self.model
    }

    /// Width of the record payload, flag byte excluded.
    pub fn record_width(&self) -> usize {
        self.file.row_width() - FLAG_WIDTH
    }

    /// Attaches the prefix index for `field`, opening
    /// `<dir>/<model>.<field>.index`. A missing or undersized index file is
    /// a configuration error; create it first with
    /// [`create_index`](Self::create_index).
    pub fn attach_index(&mut self, field: &str) -> Result<()> {
        self.indexable_field(field)?;

        let path = self.dir.join(index_file_name(self.model.name(), field));
        let index = TrieIndex::open(&path)?;
        self.indexes.insert(field.to_string(), index);
        Ok(())
    }

    /// Creates the index block file for `field` if it does not exist yet,
    /// then attaches it.
    pub fn create_index(&mut self, field: &str) -> Result<()> {
        self.indexable_field(field)?;

        let path = self.dir.join(index_file_name(self.model.name(), field));
        if !path.exists() {
            TrieIndex::create(&path)?;
        }
        self.attach_index(field)
    }

    /// Records whose `field` value starts with `value`, resolved through
    /// `get`. Entries the index still holds for deleted records are
    /// skipped.
    pub fn filter(&self, field: &str, value: &str) -> Result<Vec<(u64, Vec<u8>)>> {
        let Some(index) = self.indexes.get(field) else {
            bail!(StoreError::configuration(format!(
                "no index attached to field '{}' of model '{}'",
                field,
                self.model.name()
            )));
        };

        let pks = index.find(value)?;
        resolve_live(self, &pks)
    }

    pub fn sync(&self) -> Result<()> {
        self.file.sync()?;
        for index in self.indexes.values() {
            index.sync()?;
        }
        Ok(())
    }

    fn indexable_field(&self, field: &str) -> Result<()> {
        let Some(spec) = self.model.field(field) else {
            bail!(StoreError::configuration(format!(
                "model '{}' has no field '{}'",
                self.model.name(),
                field
            )));
        };
        if spec.kind() != FieldKind::Text {
            bail!(StoreError::configuration(format!(
                "field '{}' of model '{}' is not a text field and cannot be indexed",
                field,
                self.model.name()
            )));
        }
        Ok(())
    }

    fn feed_indexes(&mut self, pk: u64, record: &[u8]) -> Result<()> {
        for (field, index) in self.indexes.iter_mut() {
            // Range is known valid: attach_index checked the field exists.
            let range = self.model.packed_field_range(field).unwrap_or_default();
            index.add_bytes(pk, trim_fill(&record[range]))?;
        }
        Ok(())
    }

    /// Builds a full row: live flag plus the record padded to the packed
    /// width.
    fn flagged_row(&self, record: &[u8]) -> Result<Vec<u8>> {
        let record_width = self.record_width();
        if record.len() > record_width {
            bail!(StoreError::Integrity {
                len: record.len(),
                row_width: record_width,
            });
        }
        let mut row = Vec::with_capacity(self.file.row_width());
        row.push(FLAG_LIVE);
        row.extend_from_slice(record);
        row.resize(self.file.row_width(), FILL_BYTE);
        Ok(row)
    }

    fn ensure_in_bounds(&self, pk: u64) -> Result<()> {
        if pk >= self.file.record_count()? {
            bail!(StoreError::NotFound { pk });
        }
        Ok(())
    }
}

impl RecordStore for FlaggedStore {
    fn insert(&mut self, record: &[u8]) -> Result<u64> {
        let row = self.flagged_row(record)?;
        let pk = self.file.append(&row)?;
        self.feed_indexes(pk, &row[FLAG_WIDTH..])?;
        Ok(pk)
    }

    fn update(&mut self, pk: u64, record: &[u8]) -> Result<()> {
        // Updating a deleted slot is allowed: the rewritten flag byte
        // revives it.
        self.ensure_in_bounds(pk)?;
        let row = self.flagged_row(record)?;
        self.file.write_at(pk, &row)?;
        self.feed_indexes(pk, &row[FLAG_WIDTH..])
    }

    fn get(&self, pk: u64) -> Result<Vec<u8>> {
        self.ensure_in_bounds(pk)?;

        let mut row = vec![0u8; self.file.row_width()];
        self.file.read_at(pk, &mut row)?;

        if DeleteMarking::FlagByte.is_deleted(&row) {
            bail!(StoreError::NotFound { pk });
        }
        Ok(row[FLAG_WIDTH..].to_vec())
    }

    fn delete(&mut self, pk: u64) -> Result<()> {
        self.ensure_in_bounds(pk)?;

        // Read-modify-write of the whole row: only the flag byte changes,
        // field bytes stay in place.
        let mut row = vec![0u8; self.file.row_width()];
        self.file.read_at(pk, &mut row)?;
        row[0] = FLAG_DELETED;
        self.file.write_at(pk, &row)
    }

    fn scan(&self) -> Result<Scan<'_>> {
        Scan::new(&self.file, DeleteMarking::FlagByte)
    }

    fn total_count(&self) -> Result<u64> {
        self.file.record_count()
    }
}
