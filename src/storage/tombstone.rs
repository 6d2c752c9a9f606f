//! # Tombstone Store (variant A)
//!
//! Fixed-width record store where a deleted row is the all-zero row. This
//! is the legacy-compatible variant: the file holds nothing but raw
//! text-layout rows, and deletion overwrites the slot with fill bytes.
//!
//! The marking scheme has a documented correctness gap: a legitimately
//! all-zero-valued row is indistinguishable from a tombstone. The text
//! codec keeps integer fields safe (zero encodes as the digit `'0'`), but a
//! model whose every field can encode empty should use
//! [`FlaggedStore`](super::FlaggedStore) instead.

use std::path::{Path, PathBuf};

use eyre::{bail, Result};
use hashbrown::HashMap;

use super::record_file::RecordFile;
use super::store::{resolve_live, DeleteMarking, RecordStore, Scan};
use super::DB_FILE_EXTENSION;
use crate::error::StoreError;
use crate::index::{index_file_name, TrieIndex};
use crate::model::{trim_fill, FieldKind, ModelSpec, FILL_BYTE};

pub struct TombstoneStore {
    file: RecordFile,
    model: ModelSpec,
    dir: PathBuf,
    indexes: HashMap<String, TrieIndex>,
}

impl TombstoneStore {
    /// Opens `<dir>/<model>.db`, creating it empty if absent.
    pub fn open<P: AsRef<Path>>(dir: P, model: ModelSpec) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let path = dir.join(format!("{}.{}", model.name(), DB_FILE_EXTENSION));
        let file = RecordFile::open(path, model.text_row_width())?;

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

    fn feed_indexes(&mut self, pk: u64, row: &[u8]) -> Result<()> {
        for (field, index) in self.indexes.iter_mut() {
            // Range is known valid: attach_index checked the field exists.
            let range = self.model.text_field_range(field).unwrap_or_default();
            index.add_bytes(pk, trim_fill(&row[range]))?;
        }
        Ok(())
    }

    fn padded_row(&self, record: &[u8]) -> Result<Vec<u8>> {
        let row_width = self.file.row_width();
        if record.len() > row_width {
            bail!(StoreError::Integrity {
                len: record.len(),
                row_width,
            });
        }
        let mut row = record.to_vec();
        row.resize(row_width, FILL_BYTE);
        Ok(row)
    }

    fn ensure_in_bounds(&self, pk: u64) -> Result<()> {
        if pk >= self.file.record_count()? {
            bail!(StoreError::NotFound { pk });
        }
        Ok(())
    }
}

impl RecordStore for TombstoneStore {
    fn insert(&mut self, record: &[u8]) -> Result<u64> {
        let row = self.padded_row(record)?;
        let pk = self.file.append(&row)?;
        self.feed_indexes(pk, &row)?;
        Ok(pk)
    }

    fn update(&mut self, pk: u64, record: &[u8]) -> Result<()> {
        // Updating a deleted slot is allowed and revives it.
        self.ensure_in_bounds(pk)?;
        let row = self.padded_row(record)?;
        self.file.write_at(pk, &row)?;
        self.feed_indexes(pk, &row)
    }

    fn get(&self, pk: u64) -> Result<Vec<u8>> {
        self.ensure_in_bounds(pk)?;

        let mut row = vec![0u8; self.file.row_width()];
        self.file.read_at(pk, &mut row)?;

        if DeleteMarking::ZeroRow.is_deleted(&row) {
            bail!(StoreError::NotFound { pk });
        }
        Ok(row)
    }

    fn delete(&mut self, pk: u64) -> Result<()> {
        self.ensure_in_bounds(pk)?;
        let tombstone = vec![FILL_BYTE; self.file.row_width()];
        self.file.write_at(pk, &tombstone)
    }

    fn scan(&self) -> Result<Scan<'_>> {
        Scan::new(&self.file, DeleteMarking::ZeroRow)
    }

    fn total_count(&self) -> Result<u64> {
        self.file.record_count()
    }
}
