use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use uptime_core::{
    normalize_url, MonitoringStatus, OwnerId, PingResult, UptimeStats, UrlState,
};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddUrlRequest {
    pub url: String,
}

#[derive(Serialize)]
pub struct AddUrlResponse {
    pub message: String,
    pub owner_id: OwnerId,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub url: String,
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,
}

fn default_window_hours() -> u32 {
    24
}

#[derive(Serialize)]
pub struct UrlListResponse {
    pub owner_id: OwnerId,
    pub urls: HashMap<String, UrlState>,
}

#[derive(Serialize)]
pub struct PingBatchResponse {
    pub owner_id: OwnerId,
    pub results: HashMap<String, PingResult>,
}

#[derive(Debug, Deserialize)]
pub struct PingOneRequest {
    pub url: String,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub owner_id: OwnerId,
    pub url: String,
    #[serde(flatten)]
    pub stats: UptimeStats,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/owners/{owner_id}/urls",
            post(add_url).get(list_urls).delete(remove_url),
        )
        .route("/owners/{owner_id}/urls/stats", get(uptime_stats))
        .route("/owners/{owner_id}/ping", post(ping_owner))
        .route("/ping", post(ping_one))
        .route("/status", get(monitoring_status))
        .route("/monitoring/start", post(start_monitoring))
        .route("/monitoring/stop", post(stop_monitoring))
}

/// POST /api/v1/owners/:owner_id/urls
async fn add_url(
    State(state): State<AppState>,
    Path(owner_id): Path<OwnerId>,
    Json(body): Json<AddUrlRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let normalized = normalize_url(&body.url)?;

    let added = state.scheduler.add_url(owner_id, &body.url).await?;
    if !added {
        return Err(ApiError::Conflict(format!(
            "{} is already being monitored",
            normalized
        )));
    }

    Ok((
        StatusCode::CREATED,
        Json(AddUrlResponse {
            message: "URL added to monitoring".into(),
            owner_id,
            url: normalized,
        }),
    ))
}

/// GET /api/v1/owners/:owner_id/urls
async fn list_urls(
    State(state): State<AppState>,
    Path(owner_id): Path<OwnerId>,
) -> Result<Json<UrlListResponse>, ApiError> {
    let urls = state.scheduler.urls(owner_id).await?;
    Ok(Json(UrlListResponse { owner_id, urls }))
}

/// DELETE /api/v1/owners/:owner_id/urls?url=
async fn remove_url(
    State(state): State<AppState>,
    Path(owner_id): Path<OwnerId>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = state.scheduler.remove_url(owner_id, &query.url).await?;
    if !removed {
        return Err(ApiError::NotFound(format!(
            "{} is not monitored for owner {}",
            query.url, owner_id
        )));
    }

    Ok(Json(MessageResponse {
        message: "URL removed from monitoring".into(),
    }))
}

/// GET /api/v1/owners/:owner_id/urls/stats?url=&window_hours=
async fn uptime_stats(
    State(state): State<AppState>,
    Path(owner_id): Path<OwnerId>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, ApiError> {
    if query.window_hours == 0 {
        return Err(ApiError::BadRequest("window_hours must be positive".into()));
    }

    let normalized = normalize_url(&query.url)?;
    let stats = state
        .scheduler
        .uptime_stats(&query.url, owner_id, query.window_hours)
        .await?;

    Ok(Json(StatsResponse {
        owner_id,
        url: normalized,
        stats,
    }))
}

/// POST /api/v1/owners/:owner_id/ping
async fn ping_owner(
    State(state): State<AppState>,
    Path(owner_id): Path<OwnerId>,
) -> Result<Json<PingBatchResponse>, ApiError> {
    let results = state.scheduler.ping_owner_urls(owner_id).await?;
    Ok(Json(PingBatchResponse { owner_id, results }))
}

/// POST /api/v1/ping: ephemeral connectivity check, nothing is persisted.
async fn ping_one(
    State(state): State<AppState>,
    Json(body): Json<PingOneRequest>,
) -> Result<Json<PingResult>, ApiError> {
    let normalized = normalize_url(&body.url)?;
    let result = state.scheduler.ping_one(&normalized).await;
    Ok(Json(result))
}

/// GET /api/v1/status
async fn monitoring_status(
    State(state): State<AppState>,
) -> Result<Json<MonitoringStatus>, ApiError> {
    let status = state.scheduler.status().await?;
    Ok(Json(status))
}

/// POST /api/v1/monitoring/start
async fn start_monitoring(State(state): State<AppState>) -> Json<MessageResponse> {
    state.scheduler.start().await;
    Json(MessageResponse {
        message: "Monitoring started".into(),
    })
}

/// POST /api/v1/monitoring/stop
async fn stop_monitoring(State(state): State<AppState>) -> Json<MessageResponse> {
    state.scheduler.stop().await;
    Json(MessageResponse {
        message: "Monitoring stopped".into(),
    })
}
