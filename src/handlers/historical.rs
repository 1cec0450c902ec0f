// src/handlers/historical.rs
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::models::{Sector, YearMonth};
use crate::services::calculator::{filter_cpi_data_by_range, get_data_coverage, EARLIEST_COVERAGE};
use crate::services::series::summarize;
use crate::state::AppState;

const SOURCE: &str = "MoSPI CPI All-India Combined (Base Year 2012 = 100)";

#[derive(Debug, Deserialize)]
pub struct HistoricalQuery {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoricalPoint {
    pub date: YearMonth,
    pub cpi_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Coverage {
    pub from: YearMonth,
    pub to: YearMonth,
    pub total_points: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoricalResponse {
    pub data: Vec<HistoricalPoint>,
    pub coverage: Coverage,
    pub source: &'static str,
    pub cached: bool,
}

fn cache_key(query: &HistoricalQuery) -> String {
    format!(
        "historical:{}:{}",
        query.from_date.as_deref().unwrap_or("all"),
        query.to_date.as_deref().unwrap_or("all")
    )
}

fn parse_bound(value: Option<&str>, which: &str) -> Result<Option<YearMonth>, ApiError> {
    match value {
        None => Ok(None),
        Some(raw) => YearMonth::parse(raw).map(Some).ok_or_else(|| {
            ApiError::bad_request(
                "INVALID_DATE",
                format!("Invalid '{}' date format. Use YYYY-MM.", which),
            )
        }),
    }
}

fn validate_range(query: &HistoricalQuery) -> Result<(Option<YearMonth>, Option<YearMonth>), ApiError> {
    let from = parse_bound(query.from_date.as_deref(), "from")?;
    let to = parse_bound(query.to_date.as_deref(), "to")?;

    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ApiError::bad_request(
                "INVALID_RANGE",
                "'from' date must be on or before 'to' date.",
            ));
        }
    }
    if let Some(from) = from {
        if from < EARLIEST_COVERAGE {
            return Err(ApiError::bad_request(
                "FROM_DATE_TOO_EARLY",
                format!("Data coverage begins from {}. 'from' date cannot be earlier.", EARLIEST_COVERAGE),
            ));
        }
    }
    Ok((from, to))
}

pub async fn get_historical(query: HistoricalQuery, state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling request for historical CPI data");
    let (from, to) = validate_range(&query).map_err(warp::reject::custom)?;

    let key = cache_key(&query);
    if let Some(mut cached) = state.historical_cache.get(&key) {
        debug!("Serving {} from cache", key);
        cached.cached = true;
        return Ok(warp::reply::json(&cached));
    }

    let series = state.cpi_series().await.map_err(|e| {
        error!("Error fetching historical CPI data: {}", e);
        warp::reject::custom(ApiError::internal(
            "Internal server error while fetching historical CPI data.",
        ))
    })?;

    let today = state.clock.current_month();
    let data: Vec<HistoricalPoint> = filter_cpi_data_by_range(
        &series,
        from.unwrap_or(EARLIEST_COVERAGE),
        to.unwrap_or(today),
    )
    .into_iter()
    .map(|observation| HistoricalPoint {
        date: observation.date,
        cpi_value: observation.index_value,
    })
    .collect();

    if data.is_empty() {
        return Err(warp::reject::custom(ApiError::new(
            StatusCode::NOT_FOUND,
            "NO_DATA",
            "No CPI data found for the requested date range.",
        )));
    }

    let summary = summarize(&series);
    let response = HistoricalResponse {
        data,
        coverage: Coverage {
            from: summary.first_date.unwrap_or(EARLIEST_COVERAGE),
            to: summary.last_date.unwrap_or(today),
            total_points: summary.count,
        },
        source: SOURCE,
        cached: false,
    };

    state.historical_cache.insert(key, response.clone());
    Ok(warp::reply::json(&response))
}

pub async fn get_historical_metadata(state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling request for historical CPI metadata");
    let series = state.cpi_series().await.map_err(|e| {
        error!("Error fetching historical metadata: {}", e);
        warp::reject::custom(ApiError::internal("Internal server error while fetching metadata."))
    })?;

    let coverage = get_data_coverage(state.clock.current_month());
    let summary = summarize(&series);

    Ok(warp::reply::json(&json!({
        "data_coverage": {
            "from": summary.first_date.unwrap_or(coverage.from),
            "to": summary.last_date.unwrap_or(coverage.to),
            "total_months": summary.count,
        },
        "base_year": 2012,
        "update_frequency": "Monthly",
        "source": "Ministry of Statistics and Programme Implementation (MoSPI), Government of India",
        "sectors_available": [Sector::Combined, Sector::Urban, Sector::Rural],
        "latest_update": state.clock.now().to_rfc3339(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(from: Option<&str>, to: Option<&str>) -> HistoricalQuery {
        HistoricalQuery {
            from_date: from.map(String::from),
            to_date: to.map(String::from),
        }
    }

    #[test]
    fn test_range_validation() {
        assert!(validate_range(&query(None, None)).is_ok());
        assert!(validate_range(&query(Some("2000-01"), Some("2024-10"))).is_ok());
        assert_eq!(validate_range(&query(Some("2000-1"), None)).unwrap_err().code, "INVALID_DATE");
        assert_eq!(validate_range(&query(None, Some("bad"))).unwrap_err().code, "INVALID_DATE");
        assert_eq!(
            validate_range(&query(Some("2024-10"), Some("2000-01"))).unwrap_err().code,
            "INVALID_RANGE"
        );
        assert_eq!(
            validate_range(&query(Some("1950-01"), None)).unwrap_err().code,
            "FROM_DATE_TOO_EARLY"
        );
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key(&query(None, None)), "historical:all:all");
        assert_eq!(cache_key(&query(Some("2000-01"), None)), "historical:2000-01:all");
    }
}
