use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::ticketing::TicketingError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Ticketing(#[from] TicketingError),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Ticketing(e) => match e {
                TicketingError::EventNotFound(_) => StatusCode::NOT_FOUND,
                TicketingError::InvalidInterval { .. }
                | TicketingError::OutOfBounds { .. }
                | TicketingError::EmptyInput
                | TicketingError::OutOfEventRange { .. } => StatusCode::BAD_REQUEST,
                TicketingError::DiscontinuousRange { .. }
                | TicketingError::BulkCashierConflict { .. }
                | TicketingError::InBulkRange { .. }
                | TicketingError::NoInventory
                | TicketingError::AlreadySold { .. }
                | TicketingError::AlreadyUsed { .. }
                | TicketingError::BulkTicketNotIndividuallySellable { .. }
                | TicketingError::ConcurrentSaleConflict { .. } => StatusCode::CONFLICT,
                TicketingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Ticketing(e) => match e {
                TicketingError::EventNotFound(_) => "NOT_FOUND",
                TicketingError::InvalidInterval { .. } => "INVALID_INTERVAL",
                TicketingError::OutOfBounds { .. } => "OUT_OF_BOUNDS",
                TicketingError::DiscontinuousRange { .. } => "DISCONTINUOUS_RANGE",
                TicketingError::EmptyInput => "EMPTY_INPUT",
                TicketingError::BulkCashierConflict { .. } => "BULK_CASHIER_CONFLICT",
                TicketingError::OutOfEventRange { .. } => "OUT_OF_EVENT_RANGE",
                TicketingError::InBulkRange { .. } => "IN_BULK_RANGE",
                TicketingError::NoInventory => "NO_INVENTORY",
                TicketingError::AlreadySold { .. } => "ALREADY_SOLD",
                TicketingError::AlreadyUsed { .. } => "ALREADY_USED",
                TicketingError::BulkTicketNotIndividuallySellable { .. } => "BULK_NOT_SELLABLE",
                TicketingError::ConcurrentSaleConflict { .. } => "CONCURRENT_SALE_CONFLICT",
                TicketingError::Store(_) => "DATABASE_ERROR",
            },
            AppError::DatabaseError(_) => "DATABASE_ERROR",
        }
    }

    /// Structured diagnostic fields for errors the caller can act on.
    pub fn details(&self) -> Option<Value> {
        match self {
            AppError::Ticketing(TicketingError::DiscontinuousRange { gap }) => {
                Some(json!({ "gap": gap }))
            }
            AppError::Ticketing(TicketingError::BulkCashierConflict { conflicting_numbers }) => {
                Some(json!({ "conflicting_numbers": conflicting_numbers }))
            }
            AppError::Ticketing(TicketingError::OutOfEventRange {
                range_start,
                range_end,
                ..
            }) => Some(json!({ "range_start": range_start, "range_end": range_end })),
            AppError::Ticketing(e @ TicketingError::Store(_)) => {
                Some(json!({ "retryable": e.is_retryable() }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let details = self.details();

        // Store errors keep their internals out of the API response.
        let public_message = match &self {
            AppError::Ticketing(TicketingError::Store(e)) | AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
                "A database error occurred".to_string()
            }
            other => {
                error!(error = ?other, code, "Request rejected");
                other.to_string()
            }
        };

        error_response(code, public_message, details, status)
    }
}
