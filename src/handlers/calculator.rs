// src/handlers/calculator.rs
use bytes::Bytes;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use warp::http::Method;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::services::calculator::{calculate_inflation, validate_request, InflationResult};
use crate::services::series::{trend_between, TrendPoint};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalculateRequest {
    #[serde(default)]
    amount: Value,
    #[serde(default)]
    from_date: Option<String>,
    #[serde(default)]
    to_date: Option<String>,
    #[serde(default)]
    include_trend: bool,
}

#[derive(Debug, Serialize)]
struct CalculateData {
    #[serde(flatten)]
    result: InflationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    trend: Option<Vec<TrendPoint>>,
}

/// Cap on the calculator request body.
pub const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Everything but POST on the calculator path. POST is left to `calculate`.
pub async fn reject_method(method: Method) -> Result<Json, Rejection> {
    if method == Method::POST {
        Err(warp::reject::not_found())
    } else {
        Err(warp::reject::custom(ApiError::method_not_allowed()))
    }
}

pub async fn calculate(body: Bytes, state: Arc<AppState>) -> Result<Json, Rejection> {
    let request: CalculateRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!("Rejecting calculator body: {}", e);
        warp::reject::custom(ApiError::bad_request("INVALID_REQUEST", "Request body must be a JSON object"))
    })?;

    // Non-numeric amounts fall through to the calculator's amount check.
    let amount = request.amount.as_f64().unwrap_or(f64::NAN);
    let from_date = request.from_date.unwrap_or_default();
    let to_date = request.to_date.unwrap_or_default();
    let today = state.clock.current_month();
    info!("Calculating inflation for {} -> {}", from_date, to_date);

    let series = match state.cpi_series().await {
        Ok(series) => series,
        Err(e) => {
            error!("Failed to load CPI series: {}", e);
            // Keep input validation ahead of the data outage.
            return match validate_request(amount, &from_date, &to_date, today) {
                Err(err) => Err(warp::reject::custom(ApiError::from(err))),
                Ok(_) => Err(warp::reject::custom(ApiError::data_unavailable())),
            };
        }
    };

    let result = calculate_inflation(amount, &from_date, &to_date, &series, today)
        .map_err(|err| warp::reject::custom(ApiError::from(err)))?;

    let trend = if request.include_trend {
        Some(trend_between(&series, result.from_date, result.to_date))
    } else {
        None
    };

    debug!(
        "Adjusted {} -> {} ({}%)",
        result.original_amount, result.adjusted_amount, result.inflation_rate
    );
    Ok(warp::reply::json(&json!({
        "success": true,
        "data": CalculateData { result, trend },
    })))
}
