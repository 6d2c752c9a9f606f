//! # Shared Store Contract
//!
//! Both store variants expose the same operation set; [`RecordStore`]
//! captures it so collaborators can stay generic over the deletion marking.
//! The stores differ only in how a deleted row is encoded, which is what
//! [`DeleteMarking`] abstracts for the scan path.

use eyre::Result;

use super::record_file::RecordFile;
use super::{FLAG_LIVE, FLAG_WIDTH};
use crate::error::store_error;
use crate::model::FILL_BYTE;

/// The operation set shared by [`TombstoneStore`](super::TombstoneStore)
/// and [`FlaggedStore`](super::FlaggedStore).
///
/// `record` buffers are already-encoded fixed-width rows (flag byte
/// excluded for the flagged variant); the model codecs produce and consume
/// them. Mutating operations take `&mut self`: one writer at a time,
/// enforced at compile time.
pub trait RecordStore {
    /// Appends a record and returns its number, which is always the total
    /// count measured immediately before the call.
    fn insert(&mut self, record: &[u8]) -> Result<u64>;

    /// Overwrites the record at `pk` in place. Permitted on a deleted slot:
    /// updating a tombstoned record revives it.
    fn update(&mut self, pk: u64, record: &[u8]) -> Result<()>;

    /// Returns the record at `pk`, or NotFound if `pk` is out of bounds or
    /// the slot is deleted.
    fn get(&self, pk: u64) -> Result<Vec<u8>>;

    /// Marks the record at `pk` deleted. The slot keeps its number and its
    /// file space.
    fn delete(&mut self, pk: u64) -> Result<()>;

    /// Lazy forward pass over all live records in ascending pk order. Each
    /// call starts a fresh pass from record 0.
    fn scan(&self) -> Result<Scan<'_>>;

    /// Number of slots in the file, deleted ones included. O(1).
    fn total_count(&self) -> Result<u64>;

    /// Number of live records. Requires a full scan, O(total_count).
    fn count(&self) -> Result<u64> {
        let mut live = 0;
        for entry in self.scan()? {
            entry?;
            live += 1;
        }
        Ok(live)
    }
}

/// Resolves index hits through `get`, dropping pks the index still holds
/// for deleted records. Any failure other than NotFound propagates.
pub(crate) fn resolve_live<S: RecordStore + ?Sized>(
    store: &S,
    pks: &[u64],
) -> Result<Vec<(u64, Vec<u8>)>> {
    let mut out = Vec::with_capacity(pks.len());
    for &pk in pks {
        match store.get(pk) {
            Ok(record) => out.push((pk, record)),
            Err(report) => {
                if !store_error(&report).is_some_and(|e| e.is_not_found()) {
                    return Err(report);
                }
            }
        }
    }
    Ok(out)
}

/// How a store marks a row deleted.
#[derive(Debug, Clone, Copy)]
pub(crate) enum DeleteMarking {
    /// The entire row equals the fill byte.
    ZeroRow,
    /// A leading flag byte; the record payload follows it.
    FlagByte,
}

impl DeleteMarking {
    pub(crate) fn is_deleted(self, row: &[u8]) -> bool {
        match self {
            DeleteMarking::ZeroRow => row.iter().all(|&b| b == FILL_BYTE),
            DeleteMarking::FlagByte => row[0] != FLAG_LIVE,
        }
    }

    /// The record payload within a raw row.
    pub(crate) fn record(self, row: &[u8]) -> &[u8] {
        match self {
            DeleteMarking::ZeroRow => row,
            DeleteMarking::FlagByte => &row[FLAG_WIDTH..],
        }
    }
}

/// Iterator over `(pk, record)` pairs of live rows.
///
/// The slot count is snapshotted when the scan starts; rows appended while
/// iterating are not visited. An I/O failure is yielded once, then the
/// iterator is exhausted.
pub struct Scan<'a> {
    file: &'a RecordFile,
    marking: DeleteMarking,
    next_pk: u64,
    total: u64,
}

impl<'a> Scan<'a> {
    pub(crate) fn new(file: &'a RecordFile, marking: DeleteMarking) -> Result<Self> {
        let total = file.record_count()?;
        Ok(Self {
            file,
            marking,
            next_pk: 0,
            total,
        })
    }
}

impl Iterator for Scan<'_> {
    type Item = Result<(u64, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut row = vec![0u8; self.file.row_width()];

        while self.next_pk < self.total {
            let pk = self.next_pk;
            self.next_pk += 1;

            if let Err(e) = self.file.read_at(pk, &mut row) {
                self.next_pk = self.total;
                return Some(Err(e));
            }

            if !self.marking.is_deleted(&row) {
                return Some(Ok((pk, self.marking.record(&row).to_vec())));
            }
        }

        None
    }
}
