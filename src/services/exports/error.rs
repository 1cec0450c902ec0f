// src/services/exports/error.rs
use std::time::Duration;
use thiserror::Error;

use super::SourceKind;

/// Failures while resolving an export. `NotFound` and `TooLarge` are the
/// kinds callers act on; everything else is reported as-is.
#[derive(Error, Debug)]
pub enum ExportError {
    /// No backend had the requested slug
    #[error("export not found: {slug}")]
    NotFound { slug: String },

    /// Size ceiling exceeded, either up front or while decompressing
    #[error("export exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("invalid export slug: {0:?}")]
    InvalidSlug(String),

    #[error("{backend} backend did not answer within {after:?}")]
    Timeout { backend: SourceKind, after: Duration },

    #[error("object storage returned HTTP {status} for {key}")]
    Storage { status: u16, key: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ExportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExportError::NotFound { .. })
    }

    pub fn is_too_large(&self) -> bool {
        matches!(self, ExportError::TooLarge { .. })
    }
}
