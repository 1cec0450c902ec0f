// src/services/exports/sample.rs
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

use super::gzip::gzip_bytes;
use super::{ByteStream, ExportError, ExportKind, ExportSource, FoundExport, SourceKind};

/// Plain JSON samples shipped with the site under `<root>/public/sample-data`.
pub struct SampleExportSource {
    root: PathBuf,
    max_bytes: u64,
}

impl SampleExportSource {
    pub fn new(project_root: PathBuf, max_bytes: u64) -> Self {
        SampleExportSource {
            root: project_root,
            max_bytes,
        }
    }

    pub fn path_for(&self, kind: ExportKind, slug: &str) -> PathBuf {
        self.root
            .join("public")
            .join("sample-data")
            .join(kind.dir())
            .join(format!("{}.json", slug))
    }

    async fn read(&self, kind: ExportKind, slug: &str) -> Result<Option<(PathBuf, Vec<u8>)>, ExportError> {
        let path = self.path_for(kind, slug);
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if meta.len() > self.max_bytes {
            return Err(ExportError::TooLarge { limit: self.max_bytes });
        }
        let bytes = fs::read(&path).await?;
        Ok(Some((path, bytes)))
    }
}

#[async_trait]
impl ExportSource for SampleExportSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Sample
    }

    async fn try_load(&self, kind: ExportKind, slug: &str) -> Result<Option<FoundExport>, ExportError> {
        Ok(self.read(kind, slug).await?.map(|(path, bytes)| FoundExport {
            bytes,
            local_path: Some(path),
        }))
    }

    async fn try_open(&self, kind: ExportKind, slug: &str) -> Result<Option<ByteStream>, ExportError> {
        let (_, bytes) = match self.read(kind, slug).await? {
            Some(found) => found,
            None => return Ok(None),
        };
        let compressed = tokio::task::spawn_blocking(move || gzip_bytes(&bytes))
            .await
            .map_err(|e| ExportError::Io(std::io::Error::new(ErrorKind::Other, e)))??;

        let body: ByteStream = Box::pin(stream::once(async move { Ok(Bytes::from(compressed)) }));
        Ok(Some(body))
    }
}
