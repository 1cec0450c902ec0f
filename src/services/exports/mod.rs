// src/services/exports/mod.rs
//! Export resolution: finds a dataset's JSON export by trying the local ETL
//! output, then object storage, then the bundled sample files, in that order.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use log::{debug, error, info};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::ExportConfig;
use crate::models::ExportBundle;

pub mod csv_export;
pub mod error;
pub mod gzip;
pub mod local;
pub mod object_store;
pub mod sample;
mod sigv4;

pub use csv_export::convert_export_to_csv;
pub use error::ExportError;

pub const DEFAULT_MAX_EXPORT_BYTES: u64 = 50 * 1024 * 1024;
pub(crate) const READ_CHUNK_SIZE: usize = 64 * 1024;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ExportError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceKind {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "s3")]
    ObjectStorage,
    #[serde(rename = "sample")]
    Sample,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Local => "local",
            SourceKind::ObjectStorage => "s3",
            SourceKind::Sample => "sample",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Item,
    Region,
}

impl ExportKind {
    pub fn dir(&self) -> &'static str {
        match self {
            ExportKind::Item => "items",
            ExportKind::Region => "regions",
        }
    }

    pub fn object_key(&self, slug: &str) -> String {
        format!("exports/{}/{}.json.gz", self.dir(), slug)
    }
}

/// Decompressed JSON bytes found by one backend.
#[derive(Debug)]
pub struct FoundExport {
    pub bytes: Vec<u8>,
    pub local_path: Option<PathBuf>,
}

/// One read-only place an export may live.
///
/// `Ok(None)` means "this backend has no copy" and lets the resolver move on;
/// any `Err` ends the resolution.
#[async_trait]
pub trait ExportSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn try_load(&self, kind: ExportKind, slug: &str) -> Result<Option<FoundExport>, ExportError>;

    /// Gzip-encoded bytes of the export, for proxying downloads.
    async fn try_open(&self, kind: ExportKind, slug: &str) -> Result<Option<ByteStream>, ExportError>;
}

#[derive(Debug)]
pub struct LoadedExport {
    pub data: ExportBundle,
    pub source: SourceKind,
    pub raw_buffer: Vec<u8>,
    pub local_path: Option<PathBuf>,
}

pub struct GzipDownload {
    pub source: SourceKind,
    pub stream: ByteStream,
}

/// Slugs end up in file paths and object keys.
pub fn validate_slug(slug: &str) -> Result<(), ExportError> {
    let valid = !slug.is_empty()
        && slug.len() <= 128
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ExportError::InvalidSlug(slug.to_string()))
    }
}

pub struct ExportResolver {
    sources: Vec<Box<dyn ExportSource>>,
    backend_timeout: Duration,
}

impl ExportResolver {
    /// `sources` are tried in the given order.
    pub fn new(sources: Vec<Box<dyn ExportSource>>, backend_timeout: Duration) -> Self {
        ExportResolver {
            sources,
            backend_timeout,
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        let mut sources: Vec<Box<dyn ExportSource>> = vec![Box::new(local::LocalExportSource::new(
            config.project_root.clone(),
            config.max_bytes,
        ))];

        match &config.object_storage {
            Some(storage) => {
                info!("Object storage exports enabled (bucket {})", storage.bucket);
                sources.push(Box::new(object_store::ObjectStorageSource::new(
                    storage.clone(),
                    config.max_bytes,
                )));
            }
            None => info!("Object storage not configured, skipping that backend"),
        }

        sources.push(Box::new(sample::SampleExportSource::new(
            config.project_root.clone(),
            config.max_bytes,
        )));

        Self::new(sources, config.backend_timeout)
    }

    pub fn source_kinds(&self) -> Vec<SourceKind> {
        self.sources.iter().map(|source| source.kind()).collect()
    }

    pub async fn load_item_export(&self, slug: &str, include_sample: bool) -> Result<LoadedExport, ExportError> {
        self.load(ExportKind::Item, slug, include_sample).await
    }

    pub async fn load_region_export(&self, code: &str, include_sample: bool) -> Result<LoadedExport, ExportError> {
        self.load(ExportKind::Region, code, include_sample).await
    }

    pub async fn load(&self, kind: ExportKind, slug: &str, include_sample: bool) -> Result<LoadedExport, ExportError> {
        validate_slug(slug)?;

        for source in &self.sources {
            if source.kind() == SourceKind::Sample && !include_sample {
                continue;
            }
            debug!("Trying {} backend for {}/{}", source.kind(), kind.dir(), slug);

            let attempt = timeout(self.backend_timeout, source.try_load(kind, slug))
                .await
                .map_err(|_| ExportError::Timeout {
                    backend: source.kind(),
                    after: self.backend_timeout,
                })
                .and_then(|result| result);

            match attempt {
                Ok(Some(found)) => {
                    let data: ExportBundle = serde_json::from_slice(&found.bytes)?;
                    info!(
                        "Resolved {}/{} from {} ({} bytes, {} points)",
                        kind.dir(),
                        slug,
                        source.kind(),
                        found.bytes.len(),
                        data.series.len()
                    );
                    return Ok(LoadedExport {
                        data,
                        source: source.kind(),
                        raw_buffer: found.bytes,
                        local_path: found.local_path,
                    });
                }
                Ok(None) => debug!("{} backend has no {}/{}", source.kind(), kind.dir(), slug),
                Err(e) => {
                    error!("{} backend failed for {}/{}: {}", source.kind(), kind.dir(), slug, e);
                    return Err(e);
                }
            }
        }

        Err(ExportError::NotFound { slug: slug.to_string() })
    }

    /// Same backend order as `load_item_export`, but hands back gzip bytes as a
    /// stream. The sample backend compresses on the fly, so the body is always gzip.
    pub async fn get_gzip_stream_for_download(&self, slug: &str) -> Result<GzipDownload, ExportError> {
        validate_slug(slug)?;

        for source in &self.sources {
            let attempt = timeout(self.backend_timeout, source.try_open(ExportKind::Item, slug))
                .await
                .map_err(|_| ExportError::Timeout {
                    backend: source.kind(),
                    after: self.backend_timeout,
                })
                .and_then(|result| result);

            match attempt {
                Ok(Some(stream)) => {
                    info!("Streaming download of {} from {}", slug, source.kind());
                    return Ok(GzipDownload {
                        source: source.kind(),
                        stream,
                    });
                }
                Ok(None) => continue,
                Err(e) => {
                    error!("{} backend failed to open {}: {}", source.kind(), slug, e);
                    return Err(e);
                }
            }
        }

        Err(ExportError::NotFound { slug: slug.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_validation() {
        assert!(validate_slug("milk").is_ok());
        assert!(validate_slug("all-india_2012").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("..").is_err());
        assert!(validate_slug("a/b").is_err());
    }

    #[test]
    fn test_object_keys() {
        assert_eq!(ExportKind::Item.object_key("milk"), "exports/items/milk.json.gz");
        assert_eq!(ExportKind::Region.object_key("mh"), "exports/regions/mh.json.gz");
    }
}
