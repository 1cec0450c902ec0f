// src/routes.rs
use log::{error, info};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reject::Rejection;
use warp::{Filter, Reply};

use crate::handlers::error::ApiError;
use crate::handlers::{calculator, exports, health, historical};
use crate::services::exports::ExportKind;
use crate::state::AppState;

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let api_error = if err.is_not_found() {
        ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Not Found")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", "Request body is too large")
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        ApiError::new(StatusCode::LENGTH_REQUIRED, "LENGTH_REQUIRED", "Content-Length is required")
    } else if let Some(api_error) = err.find::<ApiError>() {
        api_error.clone()
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        ApiError::bad_request("INVALID_QUERY", "Invalid query string")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ApiError::method_not_allowed()
    } else {
        error!("Unhandled rejection: {:?}", err);
        ApiError::internal("Internal Server Error")
    };

    Ok(api_error.to_reply())
}

fn with_state(state: Arc<AppState>) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub fn routes(state: Arc<AppState>) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let calculate_route = warp::path!("api" / "inflation" / "calculate")
        .and(warp::post())
        .and(warp::body::content_length_limit(calculator::MAX_BODY_BYTES))
        .and(warp::body::bytes())
        .and(with_state(state.clone()))
        .and_then(calculator::calculate);

    // Non-POST calls get a JSON 405 instead of warp's plain one.
    let calculate_method_route = warp::path!("api" / "inflation" / "calculate")
        .and(warp::method())
        .and_then(calculator::reject_method);

    let historical_route = warp::path!("api" / "inflation" / "historical")
        .and(warp::get())
        .and(warp::query::<historical::HistoricalQuery>())
        .and(with_state(state.clone()))
        .and_then(historical::get_historical);

    let metadata_route = warp::path!("api" / "inflation" / "historical" / "metadata")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(historical::get_historical_metadata);

    let item_export_route = warp::path!("api" / "exports" / "items" / String)
        .and(warp::get())
        .map(|slug: String| (ExportKind::Item, slug))
        .untuple_one()
        .and(with_state(state.clone()))
        .and_then(exports::get_export);

    let region_export_route = warp::path!("api" / "exports" / "regions" / String)
        .and(warp::get())
        .map(|code: String| (ExportKind::Region, code))
        .untuple_one()
        .and(with_state(state.clone()))
        .and_then(exports::get_export);

    let download_route = warp::path!("api" / "exports" / "items" / String / "download")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(exports::download_export);

    let csv_route = warp::path!("api" / "exports" / "items" / String / "csv")
        .and(warp::get())
        .and(with_state(state))
        .and_then(exports::export_csv);

    let health_route = warp::path!("api" / "health")
        .and(warp::get())
        .and_then(health::health);

    let root_route = warp::path::end().and(warp::get()).and_then(health::root);

    info!("All routes configured successfully.");

    calculate_route
        .or(calculate_method_route)
        .or(historical_route)
        .or(metadata_route)
        .or(item_export_route)
        .or(region_export_route)
        .or(download_route)
        .or(csv_route)
        .or(health_route)
        .or(root_route)
        .recover(handle_rejection)
}
