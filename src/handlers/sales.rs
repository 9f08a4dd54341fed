use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::Buyer;
use crate::ticketing::sales::{self, SaleRequest};
use crate::utils::error::AppError;
use crate::utils::response::success;

use super::AppState;

#[derive(Deserialize)]
pub struct SellTicketRequest {
    pub number: i64,
    pub buyer: Buyer,
    pub amount_cents: i64,
    pub payment_mode: String,
    pub actor: String,
}

pub async fn sell_ticket(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(request): Json<SellTicketRequest>,
) -> Result<Response, AppError> {
    if request.amount_cents < 0 {
        return Err(AppError::ValidationError(
            "amount_cents must not be negative".to_string(),
        ));
    }

    let ticket = sales::sell(
        &state.pool,
        event_id,
        SaleRequest {
            number: request.number,
            buyer: request.buyer,
            amount_cents: request.amount_cents,
            payment_mode: request.payment_mode,
            actor: request.actor,
        },
    )
    .await?;

    Ok(success(ticket, "Ticket sold"))
}
