// src/handlers/health.rs
use serde_json::json;
use warp::reply::Json;
use warp::Rejection;

pub async fn health() -> Result<Json, Rejection> {
    Ok(warp::reply::json(&json!({ "status": "ok" })))
}

pub async fn root() -> Result<Json, Rejection> {
    Ok(warp::reply::json(&json!({ "message": "IndiaInflation API" })))
}
