//! Request handlers for the catalog API.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::query::{self, ListParams, QueryResult};
use crate::stats::StatsAggregate;
use crate::storage::{Item, NewItem};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    stats_cache: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        stats_cache: state.stats.state().label().to_string(),
    })
}

/// `GET /api/items`: bare array, or an envelope when paginated
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<QueryResult>, ApiError> {
    let list = params.resolve(state.param_policy)?;
    let items = state.store.load().await?;
    Ok(Json(query::query(&items, &list)))
}

/// `GET /api/items/:id`
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    let id = query::parse_item_id(&id)?;
    let items = state.store.load().await?;
    let item = query::find_by_id(&items, id)?;
    Ok(Json(item.clone()))
}

/// `POST /api/items`
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewItem>, JsonRejection>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let Json(candidate) = payload?;
    let item = state.repository.create(candidate).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// `GET /api/stats`
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsAggregate>, ApiError> {
    Ok(Json(state.stats.get_stats().await?))
}
