// src/handlers/exports.rs
use log::{error, info, warn};
use std::sync::Arc;
use warp::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use warp::http::Response;
use warp::hyper::Body;
use warp::Rejection;

use super::error::ApiError;
use crate::services::exports::{convert_export_to_csv, ExportError, ExportKind};
use crate::state::AppState;

const SOURCE_HEADER: &str = "x-export-source";

fn reject_export(slug: &str, err: ExportError) -> Rejection {
    if err.is_not_found() {
        info!("No export for {}", slug);
    } else if err.is_too_large() {
        warn!("Refusing oversized export {}: {}", slug, err);
    } else {
        error!("Failed to resolve export {}: {}", slug, err);
    }
    warp::reject::custom(ApiError::from(&err))
}

fn build(response: warp::http::response::Builder, body: Body) -> Result<Response<Body>, Rejection> {
    response
        .body(body)
        .map_err(|e| warp::reject::custom(ApiError::internal(e.to_string())))
}

/// The parsed export, served back as JSON. The raw decompressed bytes are
/// returned untouched.
pub async fn get_export(kind: ExportKind, slug: String, state: Arc<AppState>) -> Result<Response<Body>, Rejection> {
    info!("Handling export request for {}/{}", kind.dir(), slug);
    let export = state
        .resolver
        .load(kind, &slug, true)
        .await
        .map_err(|e| reject_export(&slug, e))?;

    build(
        Response::builder()
            .header(CONTENT_TYPE, "application/json")
            .header(SOURCE_HEADER, export.source.as_str()),
        Body::from(export.raw_buffer),
    )
}

pub async fn download_export(slug: String, state: Arc<AppState>) -> Result<Response<Body>, Rejection> {
    info!("Handling download request for {}", slug);
    let download = state
        .resolver
        .get_gzip_stream_for_download(&slug)
        .await
        .map_err(|e| reject_export(&slug, e))?;

    build(
        Response::builder()
            .header(CONTENT_TYPE, "application/gzip")
            .header(CONTENT_DISPOSITION, format!("attachment; filename=\"{}.json.gz\"", slug))
            .header(SOURCE_HEADER, download.source.as_str()),
        Body::wrap_stream(download.stream),
    )
}

pub async fn export_csv(slug: String, state: Arc<AppState>) -> Result<Response<Body>, Rejection> {
    info!("Handling CSV request for {}", slug);
    let export = state
        .resolver
        .load_item_export(&slug, true)
        .await
        .map_err(|e| reject_export(&slug, e))?;
    let csv = convert_export_to_csv(&export.data).map_err(|e| reject_export(&slug, e))?;

    build(
        Response::builder()
            .header(CONTENT_TYPE, "text/csv; charset=utf-8")
            .header(CONTENT_DISPOSITION, format!("attachment; filename=\"{}.csv\"", slug)),
        Body::from(csv),
    )
}
