// src/services/exports/local.rs
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, Stream};
use log::debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;

use super::gzip::{cap_stream, BoundedGunzip};
use super::{ByteStream, ExportError, ExportKind, ExportSource, FoundExport, SourceKind, READ_CHUNK_SIZE};

/// Gzipped exports written by the ETL under `<root>/etl/data/exports`.
pub struct LocalExportSource {
    root: PathBuf,
    max_bytes: u64,
}

impl LocalExportSource {
    pub fn new(project_root: PathBuf, max_bytes: u64) -> Self {
        LocalExportSource {
            root: project_root,
            max_bytes,
        }
    }

    pub fn path_for(&self, kind: ExportKind, slug: &str) -> PathBuf {
        self.root
            .join("etl")
            .join("data")
            .join("exports")
            .join(kind.dir())
            .join(format!("{}.json.gz", slug))
    }

    /// Opens the file after checking its on-disk size. `None` when absent.
    async fn open_checked(&self, path: &Path) -> Result<Option<File>, ExportError> {
        let meta = match fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if meta.len() > self.max_bytes {
            return Err(ExportError::TooLarge { limit: self.max_bytes });
        }
        Ok(Some(File::open(path).await?))
    }
}

pub(crate) fn file_chunks(file: File) -> impl Stream<Item = Result<Bytes, ExportError>> + Send {
    stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        let read = file.read(&mut buf).await?;
        if read == 0 {
            return Ok::<_, ExportError>(None);
        }
        buf.truncate(read);
        Ok(Some((Bytes::from(buf), file)))
    })
}

#[async_trait]
impl ExportSource for LocalExportSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    async fn try_load(&self, kind: ExportKind, slug: &str) -> Result<Option<FoundExport>, ExportError> {
        let path = self.path_for(kind, slug);
        let mut file = match self.open_checked(&path).await? {
            Some(file) => file,
            None => return Ok(None),
        };

        let mut gunzip = BoundedGunzip::new(self.max_bytes);
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let read = file.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            gunzip.push(&buf[..read])?;
        }
        debug!("Read {} ({} bytes inflated)", path.display(), gunzip.decompressed_len());

        Ok(Some(FoundExport {
            bytes: gunzip.finish()?,
            local_path: Some(path),
        }))
    }

    async fn try_open(&self, kind: ExportKind, slug: &str) -> Result<Option<ByteStream>, ExportError> {
        let path = self.path_for(kind, slug);
        Ok(self
            .open_checked(&path)
            .await?
            .map(|file| cap_stream(file_chunks(file), self.max_bytes)))
    }
}
