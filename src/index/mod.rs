//! # Prefix Trie Index
//!
//! The secondary index is a bounded-depth trie over the leading characters
//! of one text field, materialized as a fixed array of fixed-size pages
//! inside a single memory-mapped block. Walking one page per character
//! resolves a prefix to a bucket of record numbers without scanning the
//! store.
//!
//! ## Block Layout
//!
//! ```text
//! <model>.<field>.index
//! +----------------+-----------+-----------+-----+-------------+
//! | header (8 B)   |  page 0   |  page 1   | ... |  page 999   |
//! +----------------+-----------+-----------+-----+-------------+
//! ```
//!
//! The header holds the free-page cursor: a bump allocator that only moves
//! forward, never reclaiming pages. Page 0 is the root and is implicitly
//! allocated; child pointer value 0 therefore doubles as the "no page"
//! sentinel without ambiguity.
//!
//! ## Page Layout (293 bytes)
//!
//! ```text
//! Offset  Size  Description
//! 0       1     symbol: the character this page extends the path with
//! 1       40    data pointers: 10 x 4-byte bucket slots, slot = pk + 1
//! 41      248   child pointers: 62 x 4-byte page numbers, one per symbol
//! 289     4     next pointer: sibling page number (reserved by the format)
//! ```
//!
//! Bucket slots store `pk + 1` so that 0 can stay the empty-slot sentinel
//! while record number 0 remains indexable. The alphabet is `a-z`, `A-Z`,
//! `0-9`, in that order; a character outside it terminates the indexed
//! path.
//!
//! ## Semantics
//!
//! Inserting a value records the pk in the bucket of *every* page along
//! its path, so a lookup for any prefix of the value finds it: prefix
//! matching rather than exact matching. A bucket holds at most 10 entries;
//! on overflow the last slot is overwritten (preserved legacy behavior).
//! Removal is not supported: the store compensates by re-resolving index
//! hits through `get` and dropping deleted records.
//!
//! ## Sharing
//!
//! The mapped block lives behind an `Arc<RwLock<..>>` owned by the
//! [`TrieIndex`] handle; cloning the handle shares the mapping, so every
//! handle for one field sees one view. There is no process-global state.

mod page;
mod trie;

pub use page::{alphabet_index, BlockHeader, TriePage};
pub use trie::{PkSet, TrieIndex};

/// Number of symbols a page can branch on: `a-z`, `A-Z`, `0-9`.
pub const ALPHABET_LEN: usize = 62;

/// Capacity of one page's record-number bucket.
pub const BUCKET_CAPACITY: usize = 10;

/// Pages in one index block.
pub const PAGE_COUNT: usize = 1000;

/// On-disk size of one page.
pub const TRIE_PAGE_SIZE: usize = 1 + BUCKET_CAPACITY * 4 + ALPHABET_LEN * 4 + 4;

/// On-disk size of the block header.
pub const BLOCK_HEADER_SIZE: usize = 8;

/// Total size of an index block file.
pub const BLOCK_SIZE: usize = BLOCK_HEADER_SIZE + PAGE_COUNT * TRIE_PAGE_SIZE;

/// Characters of the indexed value a walk consumes at most.
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// The root page, implicitly allocated in every block.
pub const ROOT_PAGE: u32 = 0;

/// Child-pointer sentinel for "no page".
pub const NO_PAGE: u32 = 0;

/// File name of the index block for `field` of `model`:
/// `<model>.<field>.index`.
pub fn index_file_name(model: &str, field: &str) -> String {
    format!("{}.{}.index", model, field)
}
