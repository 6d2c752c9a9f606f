//! # Storage Module
//!
//! The storage layer persists fixed-width rows in a single flat file and
//! gives O(1) addressing by record number. It is deliberately headerless:
//! the on-disk format is nothing but `total_count` rows of `row_width`
//! bytes each, bit-compatible with the legacy format this engine replaces.
//!
//! ## File Layout
//!
//! ```text
//! <model>.db
//! Offset 0:              row 0 (row_width bytes)
//! Offset row_width:      row 1
//! Offset 2*row_width:    row 2
//! ...
//! ```
//!
//! Because the row width is not self-describing, opening a file with a
//! mismatched model silently produces garbage rows and misaligned deletion
//! detection. The width comes from model metadata and must match the file's
//! entire history.
//!
//! ## Record Numbers
//!
//! A record number (`pk`) is the row's position: byte offset is always
//! `pk * row_width`. Numbers are dense and contiguous from 0; there is no
//! reuse and no compaction. A deleted slot keeps its number, keeps its file
//! space, and stays addressable forever (reads report NotFound).
//!
//! ## Two Deletion Markings
//!
//! - [`TombstoneStore`]: a deleted row is the all-zero row. Simple and
//!   legacy-compatible, but a legitimately all-zero-valued row would be
//!   indistinguishable from a tombstone, so the codec must never produce
//!   one. The text-layout codec guarantees this for integer fields (zero
//!   encodes as the digit `'0'`); models whose rows can encode entirely
//!   empty should use the flagged variant instead.
//! - [`FlaggedStore`]: every row carries one leading flag byte; deletion
//!   sets the flag and leaves the field bytes in place. This is the
//!   default, higher-guarantee variant.
//!
//! ## Thread Safety
//!
//! Stores are single-threaded: every mutating operation takes
//! `&mut self`, so the borrow checker enforces the single-writer discipline
//! at compile time. A store is `Send`; to share one across threads, wrap it
//! in your own `RwLock`. Row writes are issued as a single `pwrite` of
//! `row_width` bytes, so a reader through another handle never observes a
//! partially written row.

mod flagged;
mod record_file;
mod store;
mod tombstone;

pub use flagged::FlaggedStore;
pub use record_file::RecordFile;
pub use store::{RecordStore, Scan};
pub use tombstone::TombstoneStore;

/// Extension of the record file, `<model>.db`.
pub const DB_FILE_EXTENSION: &str = "db";

/// Flag byte of a live row in the flagged layout.
pub const FLAG_LIVE: u8 = 0;

/// Flag byte of a deleted row in the flagged layout.
pub const FLAG_DELETED: u8 = 1;

/// Width of the flag prefix in the flagged layout.
pub const FLAG_WIDTH: usize = 1;
