use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::ticketing::ingestion::{self, BulkDeclaration, ImportRow};
use crate::utils::error::AppError;
use crate::utils::response::success;

use super::AppState;

#[derive(Deserialize)]
pub struct ImportRequest {
    /// Rows already parsed from the upload; CSV handling happens upstream.
    pub rows: Vec<ImportRow>,
    pub bulk: Option<BulkDeclaration>,
    pub actor: String,
}

pub async fn import_tickets(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(request): Json<ImportRequest>,
) -> Result<Response, AppError> {
    let report = ingestion::ingest(
        &state.pool,
        &state.locks,
        event_id,
        request.rows,
        request.bulk,
        &request.actor,
    )
    .await?;

    Ok(success(report, "Import processed"))
}
