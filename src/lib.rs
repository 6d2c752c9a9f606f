//! # rowdb - Minimal Embedded Record Store
//!
//! rowdb persists fixed-width binary rows in a single flat file, addressed
//! by a zero-based record number, with soft deletion and an optional
//! memory-mapped prefix index over text fields. It is a storage engine
//! only: a higher-level mapping layer hands it ready-made fixed-width
//! byte buffers and receives them back.
//!
//! ## Quick Start
//!
//! ```ignore
//! use rowdb::{FieldSpec, FieldValue, FlaggedStore, ModelSpec, RecordStore};
//!
//! let model = ModelSpec::new(
//!     "pets",
//!     vec![FieldSpec::text("name", 16), FieldSpec::int("age")],
//! )?;
//!
//! let mut store = FlaggedStore::open("./data", model)?;
//! store.create_index("name")?;
//!
//! let row = store.model().encode_packed_row(&[
//!     FieldValue::from("rex"),
//!     FieldValue::Int(4),
//! ])?;
//! let pk = store.insert(&row)?;
//!
//! let matches = store.filter("name", "re")?;
//! assert_eq!(matches[0].0, pk);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │   Collaborator (object/field mapping)    │
//! ├──────────────────────────────────────────┤
//! │   Model codecs (text / packed layout)    │
//! ├─────────────────────┬────────────────────┤
//! │ TombstoneStore      │ FlaggedStore       │
//! ├─────────────────────┴────────────────────┤
//! │ RecordFile (positioned row I/O)          │  TrieIndex (mmap block)
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! ```text
//! data_dir/
//! ├── pets.db            # fixed-width rows, headerless
//! └── pets.name.index    # trie index block, 8 B header + 1000 pages
//! ```
//!
//! ## Choosing a Variant
//!
//! [`FlaggedStore`] is the default: one leading flag byte per row makes
//! deletion unambiguous, so field bytes may legally be all zero.
//! [`TombstoneStore`] is the legacy-compatible mode where the all-zero row
//! *is* the deletion marker; it is bit-compatible with existing files but
//! relies on the codec never producing an all-zero row.
//!
//! ## What This Engine Does Not Do
//!
//! No multi-record atomicity, no crash recovery, no concurrent
//! multi-process access, no schema migration, no variable-length rows.
//! Deleted slots are never reclaimed, and the prefix index never shrinks:
//! deletion leaves stale index entries that lookups drop on resolution.
//!
//! ## Module Overview
//!
//! - [`storage`]: the record file and both store variants
//! - [`index`]: the memory-mapped prefix trie
//! - [`model`]: field descriptors and the two row codecs
//! - [`error`]: the NotFound / Integrity / Configuration classification

pub mod error;
pub mod index;
pub mod model;
pub mod storage;

pub use error::{store_error, StoreError};
pub use index::{PkSet, TrieIndex};
pub use model::{FieldKind, FieldSpec, FieldValue, ModelSpec};
pub use storage::{FlaggedStore, RecordFile, RecordStore, Scan, TombstoneStore};
