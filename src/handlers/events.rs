use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Buyer, Event};
use crate::ticketing::{allocator, ledger};
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

use super::AppState;

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub venue: Option<String>,
    pub starts_at: DateTime<Utc>,
    /// Range bounds may be declared now or learned from the first
    /// ingestion; supply both or neither.
    pub range_start: Option<i64>,
    pub range_end: Option<i64>,
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> Result<Response, AppError> {
    let (range_start, range_end) = match (request.range_start, request.range_end) {
        (Some(start), Some(end)) => {
            if start > end {
                return Err(AppError::ValidationError(format!(
                    "range [{start}, {end}] is inverted"
                )));
            }
            if start < 1 {
                return Err(AppError::ValidationError(
                    "ticket numbers start at 1".to_string(),
                ));
            }
            (start, end)
        }
        (None, None) => (0, 0),
        _ => {
            return Err(AppError::ValidationError(
                "range_start and range_end must be supplied together".to_string(),
            ))
        }
    };

    let now = Utc::now();
    let event = Event {
        id: Uuid::new_v4(),
        name: request.name,
        venue: request.venue,
        starts_at: request.starts_at,
        range_start,
        range_end,
        bulk_range_start: None,
        bulk_range_end: None,
        bulk_buyer_name: None,
        bulk_buyer_email: None,
        bulk_buyer_phone: None,
        created_at: now,
        updated_at: now,
    };

    let mut conn = state.pool.acquire().await?;
    ledger::insert_event(&mut conn, &event).await?;

    Ok(created(event, "Event created"))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let mut conn = state.pool.acquire().await?;
    let event = ledger::find_event(&mut conn, event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event '{event_id}' was not found")))?;

    Ok(success(event, "Event fetched"))
}

#[derive(Deserialize)]
pub struct BulkAllocationRequest {
    pub start: i64,
    pub end: i64,
    pub buyer: Buyer,
    pub actor: String,
}

pub async fn propose_bulk_allocation(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(request): Json<BulkAllocationRequest>,
) -> Result<Response, AppError> {
    let event = allocator::propose_bulk_allocation(
        &state.pool,
        &state.locks,
        event_id,
        request.start,
        request.end,
        request.buyer,
        &request.actor,
    )
    .await?;

    Ok(success(event, "Bulk allocation updated"))
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub event_id: Uuid,
    pub start: Option<i64>,
    pub end: Option<i64>,
    /// Width of the sellable interval; zero when nothing is sellable.
    pub count: i64,
}

pub async fn get_availability(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let mut conn = state.pool.acquire().await?;
    let event = ledger::find_event(&mut conn, event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event '{event_id}' was not found")))?;

    let payload = match allocator::available_range(&event) {
        Some((start, end)) => AvailabilityResponse {
            event_id,
            start: Some(start),
            end: Some(end),
            // Ranges learned from imported rows can span most of i64.
            count: end.saturating_sub(start).saturating_add(1),
        },
        None => AvailabilityResponse {
            event_id,
            start: None,
            end: None,
            count: 0,
        },
    };

    Ok(success(payload, "Availability computed"))
}
