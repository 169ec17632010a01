//! Worker management handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppResult, AppState};
use crate::models::{CreateWorker, Worker};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Create a new worker
pub async fn create(
    State(state): State<AppState>,
    Json(data): Json<CreateWorker>,
) -> AppResult<Json<Worker>> {
    if data.worker_id.trim().is_empty() {
        return Err(AppError::ValidationError("worker_id is required".to_string()));
    }

    if Worker::find_by_worker_id(&state.pool, &data.worker_id)
        .await?
        .is_some()
    {
        return Err(AppError::AlreadyExists("Worker ID already exists".to_string()));
    }

    let worker = Worker::create(&state.pool, data).await?;
    Ok(Json(worker))
}

/// List workers
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Worker>>> {
    let limit = query.limit.unwrap_or(100);
    let skip = query.skip.unwrap_or(0);
    let workers = Worker::list(&state.pool, limit, skip).await?;
    Ok(Json(workers))
}

/// Get specific worker by ID
pub async fn get(
    State(state): State<AppState>,
    Path(worker_id): Path<String>,
) -> AppResult<Json<Worker>> {
    let worker = Worker::find_by_worker_id(&state.pool, &worker_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Worker not found".to_string()))?;

    Ok(Json(worker))
}
