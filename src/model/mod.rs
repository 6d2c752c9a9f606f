//! # Model Metadata and Row Codecs
//!
//! A model is a named, ordered list of fixed-width field descriptors. The
//! descriptors are plain data built once from static configuration; the
//! store derives every byte offset from them and never interprets field
//! semantics beyond the row width and the deletion marker.
//!
//! ## Field Descriptors
//!
//! | Kind | Text layout | Packed layout |
//! |------|-------------|---------------|
//! | `Text` | raw bytes, right-padded with `0x00` to `width` | same |
//! | `Int`  | decimal string, right-padded with `0x00` to `width` | 8-byte little-endian `i64` |
//!
//! ## Two Row Layouts
//!
//! The **text layout** is what [`TombstoneStore`](crate::TombstoneStore)
//! persists: every field is a padded byte string, so an integer zero still
//! produces a non-zero byte (`'0'` = 0x30) and cannot collide with the
//! all-zero tombstone. The **packed layout** is what
//! [`FlaggedStore`](crate::FlaggedStore) persists after its leading flag
//! byte: integers become fixed-width binary, which is only safe because
//! deletion is an explicit flag rather than a byte pattern.
//!
//! ## Offsets
//!
//! Field offsets are the running sum of the preceding widths, computed on
//! demand. A model is small (a handful of fields), so there is no
//! pre-computed offset table.

mod spec;
mod value;

pub use spec::{FieldKind, FieldSpec, ModelSpec};
pub use value::FieldValue;

pub(crate) use spec::trim_fill;

/// On-disk width of an integer field in the packed layout.
pub const INT_PACKED_WIDTH: usize = 8;

/// Default decimal width of an integer field in the text layout.
pub const INT_TEXT_WIDTH: usize = 10;

/// Padding byte for both layouts. Also the tombstone fill byte.
pub const FILL_BYTE: u8 = 0x00;
