//! Liveness and service information endpoints

use serde_json::json;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};

use crate::constants::API_VERSION;
use crate::core::clock::Clock;
use crate::core::state::AppState;

pub async fn root(state: AppState) -> Result<Response, Infallible> {
    Ok(warp::reply::json(&json!({
        "success": true,
        "message": "Bem-vindo à API de Aprendizado de Japonês",
        "version": API_VERSION,
        "timestamp": state.clock.now().to_rfc3339(),
        "status": "online",
    }))
    .into_response())
}

/// Reports 503 when the storage backend does not answer its health check
pub async fn health(state: AppState) -> Result<Response, Infallible> {
    let storage_ok = match state.storage.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            log::error!("Storage health check failed: {}", e);
            false
        }
    };
    let status = if storage_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = json!({
        "success": storage_ok,
        "status": if storage_ok { "healthy" } else { "degraded" },
        "timestamp": state.clock.now().to_rfc3339(),
        "uptime": state.uptime_secs(),
        "environment": state.config.environment.to_string(),
    });
    Ok(warp::reply::with_status(warp::reply::json(&body), status).into_response())
}

pub async fn api_status(state: AppState) -> Result<Response, Infallible> {
    Ok(warp::reply::json(&json!({
        "success": true,
        "status": "online",
        "timestamp": state.clock.now().to_rfc3339(),
        "version": API_VERSION,
    }))
    .into_response())
}
