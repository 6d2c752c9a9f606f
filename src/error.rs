//! # Store Error Classification
//!
//! rowdb reports all failures through `eyre::Result`, matching the rest of
//! the storage layer. The three outcomes a caller is expected to react to
//! are carried as a typed [`StoreError`] inside the report, so they can be
//! recovered with `Report::downcast_ref::<StoreError>()` without string
//! matching:
//!
//! | Variant | Meaning | Caller reaction |
//! |---------|---------|-----------------|
//! | `NotFound` | pk out of bounds, or the slot is deleted | Expected negative result |
//! | `Integrity` | encoded row exceeds the fixed row width | Caller bug, do not retry |
//! | `Configuration` | index file missing/unreadable, or filter on an unindexed field | Fatal at attach time |
//!
//! Underlying I/O failures (disk errors, permissions) are *not* classified;
//! they propagate unchanged with path and offset context attached via
//! `wrap_err`. There is no transient-failure class and no retry policy:
//! this is a single-local-file engine.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound { pk: u64 },
    Integrity { len: usize, row_width: usize },
    Configuration { detail: String },
}

impl StoreError {
    pub fn configuration(detail: impl Into<String>) -> Self {
        StoreError::Configuration {
            detail: detail.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound { pk } => {
                write!(f, "record {} does not exist", pk)
            }
            StoreError::Integrity { len, row_width } => {
                write!(f, "encoded length {} exceeds fixed width {}", len, row_width)
            }
            StoreError::Configuration { detail } => {
                write!(f, "store misconfigured: {}", detail)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Returns the [`StoreError`] carried by `report`, if any.
pub fn store_error(report: &eyre::Report) -> Option<&StoreError> {
    report.downcast_ref::<StoreError>()
}
