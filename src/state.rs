// src/state.rs
use log::warn;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::handlers::historical::HistoricalResponse;
use crate::models::CpiObservation;
use crate::services::clock::Clock;
use crate::services::exports::{ExportError, ExportResolver};

/// Upper bound on cached historical responses.
pub const HISTORICAL_CACHE_ENTRIES: usize = 256;

/// Shared by every request handler.
pub struct AppState {
    pub resolver: ExportResolver,
    pub clock: Arc<dyn Clock>,
    pub cpi_series_slug: String,
    pub historical_cache: ResponseCache<HistoricalResponse>,
}

impl AppState {
    pub fn new(resolver: ExportResolver, clock: Arc<dyn Clock>, cpi_series_slug: String, cache_ttl: Duration) -> Self {
        AppState {
            resolver,
            clock,
            cpi_series_slug,
            historical_cache: ResponseCache::new(cache_ttl, HISTORICAL_CACHE_ENTRIES),
        }
    }

    /// The headline CPI series, resolved through the export backends.
    pub async fn cpi_series(&self) -> Result<Vec<CpiObservation>, ExportError> {
        let export = self.resolver.load_item_export(&self.cpi_series_slug, true).await?;
        let observations = export.data.observations();
        let skipped = export.data.series.len() - observations.len();
        if skipped > 0 {
            warn!("Skipped {} CPI points with unreadable dates in {}", skipped, self.cpi_series_slug);
        }
        Ok(observations)
    }
}

/// Small in-process TTL cache for rendered responses, holding at most
/// `max_entries` values.
pub struct ResponseCache<T> {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<String, (T, Instant)>>,
}

impl<T: Clone> ResponseCache<T> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        ResponseCache {
            ttl,
            max_entries,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match entries.get(key) {
            Some((value, expires)) if Instant::now() < *expires => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Sweeps expired entries first; when still full, the entry closest to
    /// expiry makes room.
    pub fn insert(&self, key: String, value: T) {
        if self.max_entries == 0 {
            return;
        }
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.retain(|_, (_, expires)| *expires > now);

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, (_, expires))| *expires)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(key, (value, now + self.ttl));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
