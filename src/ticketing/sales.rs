//! The cashier sale path: sell exactly one ticket number to one buyer,
//! exactly once.
//!
//! This is the one place a genuine write race exists (two cashiers, same
//! number). The whole operation runs in an immediate transaction and the
//! `available -> sold` transition is conditional, so the loser of a race
//! gets a typed rejection, never a double sale. The sale row lands in the
//! same transaction as the ticket write.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::models::{Buyer, Sale, SaleType, Ticket, TicketStatus};
use crate::store;

use super::allocator;
use super::error::TicketingError;
use super::ledger;

pub struct SaleRequest {
    pub number: i64,
    pub buyer: Buyer,
    pub amount_cents: i64,
    pub payment_mode: String,
    pub actor: String,
}

pub async fn sell(
    pool: &SqlitePool,
    event_id: Uuid,
    request: SaleRequest,
) -> Result<Ticket, TicketingError> {
    let mut conn = pool.acquire().await.map_err(TicketingError::Store)?;

    store::begin_immediate(&mut conn).await?;
    match sell_in_tx(&mut conn, event_id, request).await {
        Ok(ticket) => {
            store::commit(&mut conn).await?;
            Ok(ticket)
        }
        Err(e) => {
            store::rollback(&mut conn).await;
            Err(e)
        }
    }
}

async fn sell_in_tx(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    request: SaleRequest,
) -> Result<Ticket, TicketingError> {
    let event = ledger::find_event(conn, event_id)
        .await?
        .ok_or(TicketingError::EventNotFound(event_id))?;
    let number = request.number;

    if !event.contains(number) {
        return Err(TicketingError::OutOfEventRange {
            number,
            range_start: event.range_start,
            range_end: event.range_end,
        });
    }
    if allocator::is_in_bulk_range(&event, number) {
        return Err(TicketingError::InBulkRange { number });
    }
    match allocator::available_range(&event) {
        None => return Err(TicketingError::NoInventory),
        Some((start, end)) if number < start || number > end => {
            return Err(TicketingError::NoInventory)
        }
        Some(_) => {}
    }

    let now = Utc::now();
    let ticket_id = match ledger::find_ticket_by_number(conn, event_id, number).await? {
        None => {
            // Number never ingested: create the ticket lazily, already sold.
            let code = format!("C{number:06}");
            let qr_payload = Uuid::new_v4().to_string();
            ledger::insert_cashier_sold(
                conn,
                event_id,
                number,
                &code,
                &qr_payload,
                &request.buyer,
                &request.actor,
                now,
            )
            .await?
        }
        Some(ticket) => match (ticket.status, ticket.sale_type) {
            (TicketStatus::Sold, _) => return Err(TicketingError::AlreadySold { number }),
            (TicketStatus::Used, _) => return Err(TicketingError::AlreadyUsed { number }),
            // Unreachable given the bulk-range check above, unless the
            // ledger and the event bounds have drifted apart.
            (_, SaleType::Bulk) => {
                return Err(TicketingError::BulkTicketNotIndividuallySellable { number })
            }
            (TicketStatus::Available, SaleType::Cashier) => {
                let updated =
                    ledger::mark_sold(conn, ticket.id, &request.buyer, &request.actor, now).await?;
                if updated == 0 {
                    return Err(TicketingError::ConcurrentSaleConflict { number });
                }
                ticket.id
            }
        },
    };

    let sale = Sale {
        id: Uuid::new_v4(),
        ticket_id,
        cashier: request.actor.clone(),
        amount_cents: request.amount_cents,
        payment_mode: request.payment_mode.clone(),
        created_at: now,
    };
    ledger::insert_sale(conn, &sale).await?;

    tracing::info!(
        event_id = %event_id,
        number,
        cashier = %request.actor,
        amount_cents = request.amount_cents,
        "ticket sold"
    );

    ledger::find_ticket_by_id(conn, ticket_id)
        .await?
        .ok_or(TicketingError::Store(sqlx::Error::RowNotFound))
}
