use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::ticketing::admission::{self, ScanVerdict};
use crate::utils::error::AppError;
use crate::utils::response::success;

use super::AppState;

#[derive(Deserialize)]
pub struct ScanRequest {
    /// QR payload or printed code, whichever the scanner read.
    pub identifier: String,
    pub actor: String,
}

/// All three verdicts are successful responses; the scanner branches on
/// the payload, not the HTTP status.
pub async fn scan_ticket(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(request): Json<ScanRequest>,
) -> Result<Response, AppError> {
    let outcome =
        admission::scan(&state.pool, event_id, &request.identifier, &request.actor).await?;

    let message = match outcome.verdict {
        ScanVerdict::Accepted => "Ticket admitted",
        ScanVerdict::Duplicate => "Ticket already used",
        ScanVerdict::Invalid => "Ticket rejected",
    };
    Ok(success(outcome, message))
}
