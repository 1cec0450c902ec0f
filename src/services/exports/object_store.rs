// src/services/exports/object_store.rs
use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream;
use log::debug;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use reqwest::{Client, Method, Response, StatusCode, Url};
use std::io;

use super::gzip::{cap_stream, BoundedGunzip};
use super::sigv4::{self, Credentials};
use super::{ByteStream, ExportError, ExportKind, ExportSource, FoundExport, SourceKind};
use crate::config::ObjectStorageConfig;

/// S3-compatible bucket holding `exports/<kind>/<slug>.json.gz`, addressed path-style.
pub struct ObjectStorageSource {
    client: Client,
    config: ObjectStorageConfig,
    max_bytes: u64,
}

/// Length declared by a HEAD response. Read from the header itself because
/// HEAD responses carry no body for reqwest to size.
fn declared_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

impl ObjectStorageSource {
    pub fn new(config: ObjectStorageConfig, max_bytes: u64) -> Self {
        ObjectStorageSource {
            client: Client::new(),
            config,
            max_bytes,
        }
    }

    pub fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.bucket,
            key
        )
    }

    async fn request(&self, method: Method, key: &str) -> Result<Response, ExportError> {
        let url = Url::parse(&self.object_url(key))
            .map_err(|e| ExportError::Io(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        let mut request = self.client.request(method.clone(), url.clone());

        if let (Some(access_key), Some(secret_key)) = (&self.config.access_key, &self.config.secret_key) {
            let host = match (url.host_str(), url.port()) {
                (Some(host), Some(port)) => format!("{}:{}", host, port),
                (Some(host), None) => host.to_string(),
                (None, _) => String::new(),
            };
            let credentials = Credentials {
                access_key,
                secret_key,
                region: &self.config.region,
            };
            let signed = sigv4::sign(&credentials, method.as_str(), &host, url.path(), Utc::now());
            request = request
                .header(AUTHORIZATION, signed.authorization)
                .header("x-amz-date", signed.amz_date)
                .header("x-amz-content-sha256", signed.content_sha256);
        }

        debug!("{} {}", method, url);
        Ok(request.send().await?)
    }

    /// HEAD then GET. `None` when either says the object does not exist.
    async fn fetch(&self, key: &str) -> Result<Option<Response>, ExportError> {
        let head = self.request(Method::HEAD, key).await?;
        match head.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => {
                return Err(ExportError::Storage {
                    status: status.as_u16(),
                    key: key.to_string(),
                })
            }
            _ => {}
        }
        if let Some(size) = declared_length(&head) {
            if size > self.max_bytes {
                return Err(ExportError::TooLarge { limit: self.max_bytes });
            }
        }

        let response = self.request(Method::GET, key).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if !status.is_success() => Err(ExportError::Storage {
                status: status.as_u16(),
                key: key.to_string(),
            }),
            _ => Ok(Some(response)),
        }
    }
}

#[async_trait]
impl ExportSource for ObjectStorageSource {
    fn kind(&self) -> SourceKind {
        SourceKind::ObjectStorage
    }

    async fn try_load(&self, kind: ExportKind, slug: &str) -> Result<Option<FoundExport>, ExportError> {
        let key = kind.object_key(slug);
        let mut response = match self.fetch(&key).await? {
            Some(response) => response,
            None => return Ok(None),
        };

        let mut gunzip = BoundedGunzip::new(self.max_bytes);
        let mut received: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            received += chunk.len() as u64;
            if received > self.max_bytes {
                return Err(ExportError::TooLarge { limit: self.max_bytes });
            }
            gunzip.push(&chunk)?;
        }

        Ok(Some(FoundExport {
            bytes: gunzip.finish()?,
            local_path: None,
        }))
    }

    async fn try_open(&self, kind: ExportKind, slug: &str) -> Result<Option<ByteStream>, ExportError> {
        let key = kind.object_key(slug);
        let response = match self.fetch(&key).await? {
            Some(response) => response,
            None => return Ok(None),
        };

        let chunks = stream::try_unfold(response, |mut response| async move {
            match response.chunk().await? {
                Some(chunk) => Ok::<_, ExportError>(Some((chunk, response))),
                None => Ok(None),
            }
        });
        Ok(Some(cap_stream(chunks, self.max_bytes)))
    }
}
