use axum::extract::{Path, State};
use axum::response::Response;
use uuid::Uuid;

use crate::ticketing::reporting;
use crate::utils::error::AppError;
use crate::utils::response::success;

use super::AppState;

pub async fn event_stats(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let stats = reporting::event_stats(&state.pool, event_id).await?;
    Ok(success(stats, "Event stats computed"))
}

pub async fn overall_stats(State(state): State<AppState>) -> Result<Response, AppError> {
    let stats = reporting::overall_stats(&state.pool).await?;
    Ok(success(stats, "Stats computed"))
}
