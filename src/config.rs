// src/config.rs
use anyhow::{bail, Context, Result};
use log::warn;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use warp::http::uri::{Authority, Scheme};

use crate::services::exports::DEFAULT_MAX_EXPORT_BYTES;

const DEFAULT_PORT: u16 = 3030;
const DEFAULT_CPI_SLUG: &str = "cpi-all-india";

const PRODUCTION_ORIGINS: [&str; 2] = [
    "https://indiainflation.com",
    "https://staging.indiainflation.com",
];

#[derive(Clone)]
pub struct ObjectStorageConfig {
    pub bucket: String,
    pub endpoint: String,
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl fmt::Debug for ObjectStorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ObjectStorageConfig")
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub project_root: PathBuf,
    pub max_bytes: u64,
    pub backend_timeout: Duration,
    /// `None` unless both bucket and endpoint are set.
    pub object_storage: Option<ObjectStorageConfig>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub exports: ExportConfig,
    pub cpi_series_slug: String,
    pub historical_cache_ttl: Duration,
    pub allowed_origins: Vec<String>,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number, got '{}'", name, raw)),
        _ => Ok(default),
    }
}

/// `scheme://host[:port]`, the only shape the CORS layer accepts.
fn validate_origin(origin: &str) -> Result<()> {
    let (scheme, authority) = origin
        .split_once("://")
        .with_context(|| format!("CORS origin '{}' is missing a scheme", origin))?;
    Scheme::from_str(scheme).with_context(|| format!("CORS origin '{}' has an invalid scheme", origin))?;
    Authority::from_str(authority).with_context(|| format!("CORS origin '{}' has an invalid host", origin))?;
    if authority.contains('/') {
        bail!("CORS origin '{}' must not contain a path", origin);
    }
    Ok(())
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match non_empty(&lookup, "PORT") {
            Some(raw) => raw.parse().with_context(|| format!("PORT must be a number, got '{}'", raw))?,
            None => {
                warn!("$PORT not set, defaulting to {}", DEFAULT_PORT);
                DEFAULT_PORT
            }
        };

        let object_storage = match (non_empty(&lookup, "S3_BUCKET"), non_empty(&lookup, "S3_ENDPOINT")) {
            (Some(bucket), Some(endpoint)) => Some(ObjectStorageConfig {
                bucket,
                endpoint,
                region: non_empty(&lookup, "S3_REGION")
                    .or_else(|| non_empty(&lookup, "AWS_REGION"))
                    .unwrap_or_else(|| "us-east-1".to_string()),
                access_key: non_empty(&lookup, "S3_ACCESS_KEY"),
                secret_key: non_empty(&lookup, "S3_SECRET_KEY"),
            }),
            _ => None,
        };

        let exports = ExportConfig {
            project_root: non_empty(&lookup, "PROJECT_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            max_bytes: parse_or(&lookup, "EXPORT_MAX_BYTES", DEFAULT_MAX_EXPORT_BYTES)?,
            backend_timeout: Duration::from_secs(parse_or(&lookup, "EXPORT_BACKEND_TIMEOUT_SECS", 15u64)?),
            object_storage,
        };

        let mut allowed_origins: Vec<String> = PRODUCTION_ORIGINS.iter().map(|o| o.to_string()).collect();
        if let Some(extra) = non_empty(&lookup, "CORS_ALLOW_EXTRA") {
            allowed_origins.extend(
                extra
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(String::from),
            );
        }
        for origin in &allowed_origins {
            validate_origin(origin)?;
        }

        Ok(AppConfig {
            port,
            exports,
            cpi_series_slug: non_empty(&lookup, "CPI_SERIES_SLUG").unwrap_or_else(|| DEFAULT_CPI_SLUG.to_string()),
            historical_cache_ttl: Duration::from_secs(parse_or(&lookup, "HISTORICAL_CACHE_TTL_SECS", 3600u64)?),
            allowed_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(move |name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 3030);
        assert_eq!(config.exports.max_bytes, 50 * 1024 * 1024);
        assert_eq!(config.exports.backend_timeout, Duration::from_secs(15));
        assert!(config.exports.object_storage.is_none());
        assert_eq!(config.cpi_series_slug, "cpi-all-india");
        assert_eq!(config.allowed_origins.len(), 2);
    }

    #[test]
    fn test_object_storage_needs_bucket_and_endpoint() {
        let only_bucket = config_from(&[("S3_BUCKET", "exports")]).unwrap();
        assert!(only_bucket.exports.object_storage.is_none());

        let full = config_from(&[
            ("S3_BUCKET", "exports"),
            ("S3_ENDPOINT", "https://r2.example.com"),
            ("AWS_REGION", "ap-south-1"),
            ("S3_ACCESS_KEY", "AKID"),
        ])
        .unwrap();
        let storage = full.exports.object_storage.unwrap();
        assert_eq!(storage.region, "ap-south-1");
        assert_eq!(storage.access_key.as_deref(), Some("AKID"));
        assert!(storage.secret_key.is_none());
    }

    #[test]
    fn test_bad_numbers_are_rejected() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("EXPORT_MAX_BYTES", "-1")]).is_err());
    }

    #[test]
    fn test_extra_origins() {
        let config = config_from(&[("CORS_ALLOW_EXTRA", "http://localhost:3000, ,https://preview.example")]).unwrap();
        assert_eq!(config.allowed_origins.len(), 4);
        assert_eq!(config.allowed_origins[2], "http://localhost:3000");
    }

    #[test]
    fn test_malformed_origins_are_rejected() {
        for bad in ["localhost:3000", "http://", "https://example.com/app", "http://exa mple.com"] {
            let err = config_from(&[("CORS_ALLOW_EXTRA", bad)]).unwrap_err();
            assert!(err.to_string().contains("CORS origin"), "{}: {}", bad, err);
        }
        assert!(config_from(&[("CORS_ALLOW_EXTRA", "http://127.0.0.1:8080")]).is_ok());
    }
}
