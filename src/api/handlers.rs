//! Endpoint handlers
//!
//! Each handler performs a handful of small synchronous file reads inline;
//! none of them waits on the network.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::{AppState, NAMESPACE};
use crate::metrics;
use crate::usage::{DiskUsageEntry, GpuInfo, GpuStats, Identity, Limits, Resources};

/// `{"value": ...}` envelope used by the single-value endpoints
#[derive(Serialize, Debug)]
pub struct ValueResponse<T> {
    pub value: T,
}

#[derive(Serialize, Debug)]
pub struct HasGpuResponse {
    pub has_gpu: bool,
}

/// Liveness check the dashboard uses to detect the extension
pub async fn get_example() -> Json<Value> {
    Json(json!({
        "data": format!("This is /{}/get-example endpoint!", NAMESPACE)
    }))
}

pub async fn get_env(State(state): State<AppState>) -> Json<Identity> {
    Json(state.sampler.identity())
}

pub async fn get_limits(State(state): State<AppState>) -> Result<Json<Limits>, ApiError> {
    Ok(Json(state.sampler.limits()?))
}

pub async fn get_current_memory(
    State(state): State<AppState>,
) -> Result<Json<ValueResponse<u64>>, ApiError> {
    let value = state.sampler.current_memory()?;
    Ok(Json(ValueResponse { value }))
}

/// Raw CPU rate (CPUs busy, not divided by the limit)
pub async fn get_cpu_usage(
    State(state): State<AppState>,
) -> Result<Json<ValueResponse<f64>>, ApiError> {
    let value = state.sampler.cpu_usage()?;
    Ok(Json(ValueResponse { value }))
}

pub async fn get_resources(State(state): State<AppState>) -> Result<Json<Resources>, ApiError> {
    Ok(Json(state.sampler.resources()?))
}

pub async fn get_disk_usage(
    State(state): State<AppState>,
) -> Result<Json<Vec<DiskUsageEntry>>, ApiError> {
    Ok(Json(state.sampler.disk_usage()?))
}

pub async fn get_has_gpu(State(state): State<AppState>) -> Json<HasGpuResponse> {
    Json(HasGpuResponse {
        has_gpu: state.sampler.has_gpu(),
    })
}

pub async fn get_gpu_info(State(state): State<AppState>) -> Result<Json<GpuInfo>, ApiError> {
    Ok(Json(state.sampler.gpu_info()?))
}

pub async fn get_gpu_stats(State(state): State<AppState>) -> Result<Json<GpuStats>, ApiError> {
    Ok(Json(state.sampler.gpu_stats()?))
}

/// Prometheus text exposition
pub async fn get_metrics() -> Result<impl IntoResponse, ApiError> {
    let body = metrics::render()?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
