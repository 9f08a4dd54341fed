//! The gate-scan state machine.
//!
//! A scan either accepts a sold ticket (transitioning it to used exactly
//! once), flags a duplicate, or rejects it with a human-readable reason.
//! Verdicts are results, not errors: the scanner renders all three the
//! same way. Only event-not-found and store failures propagate as errors.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{SaleType, Ticket, TicketStatus};

use super::allocator;
use super::error::TicketingError;
use super::ledger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanVerdict {
    Accepted,
    Invalid,
    Duplicate,
}

/// Ticket fields the gate display needs.
#[derive(Debug, Serialize)]
pub struct ScannedTicket {
    pub number: i64,
    pub code: String,
    pub sale_type: SaleType,
    pub status: TicketStatus,
    pub buyer_name: Option<String>,
}

impl From<&Ticket> for ScannedTicket {
    fn from(ticket: &Ticket) -> Self {
        Self {
            number: ticket.number,
            code: ticket.code.clone(),
            sale_type: ticket.sale_type,
            status: ticket.status,
            buyer_name: ticket.buyer_name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScanOutcome {
    pub verdict: ScanVerdict,
    pub reason: Option<String>,
    pub ticket: Option<ScannedTicket>,
    /// Set on duplicate verdicts: when the ticket was first scanned.
    pub previously_scanned_at: Option<DateTime<Utc>>,
}

impl ScanOutcome {
    fn accepted(ticket: &Ticket) -> Self {
        Self {
            verdict: ScanVerdict::Accepted,
            reason: None,
            ticket: Some(ticket.into()),
            previously_scanned_at: None,
        }
    }

    fn invalid(reason: &str, ticket: Option<&Ticket>) -> Self {
        Self {
            verdict: ScanVerdict::Invalid,
            reason: Some(reason.to_string()),
            ticket: ticket.map(Into::into),
            previously_scanned_at: None,
        }
    }

    fn duplicate(ticket: &Ticket) -> Self {
        Self {
            verdict: ScanVerdict::Duplicate,
            reason: Some("already used".to_string()),
            ticket: Some(ticket.into()),
            previously_scanned_at: ticket.scanned_at,
        }
    }
}

/// Looks up a ticket by QR payload or code and runs the admission checks.
///
/// The `sold -> used` transition is conditional; when two scanners race on
/// one ticket, the loser's zero-row update is re-read and reported as a
/// duplicate rather than a second acceptance.
pub async fn scan(
    pool: &SqlitePool,
    event_id: Uuid,
    identifier: &str,
    actor: &str,
) -> Result<ScanOutcome, TicketingError> {
    let mut conn = pool.acquire().await.map_err(TicketingError::Store)?;

    let event = ledger::find_event(&mut conn, event_id)
        .await?
        .ok_or(TicketingError::EventNotFound(event_id))?;

    let Some(ticket) = ledger::find_ticket_by_identifier(&mut conn, event_id, identifier).await?
    else {
        return Ok(ScanOutcome::invalid("not found", None));
    };

    if !event.contains(ticket.number) {
        return Ok(ScanOutcome::invalid("outside event range", Some(&ticket)));
    }

    match ticket.status {
        TicketStatus::Available => {
            return Ok(ScanOutcome::invalid("not sold yet", Some(&ticket)))
        }
        TicketStatus::Used => return Ok(ScanOutcome::duplicate(&ticket)),
        TicketStatus::Sold => {}
    }

    // Channel consistency: a sold ticket's recorded channel must agree with
    // the event's current bulk bounds at scan time.
    let in_bulk = allocator::is_in_bulk_range(&event, ticket.number);
    match ticket.sale_type {
        SaleType::Bulk if !in_bulk => {
            return Ok(ScanOutcome::invalid(
                "bulk ticket outside bulk range",
                Some(&ticket),
            ))
        }
        SaleType::Cashier if in_bulk => {
            return Ok(ScanOutcome::invalid(
                "cashier ticket inside bulk range — invalid",
                Some(&ticket),
            ))
        }
        _ => {}
    }

    let now = Utc::now();
    let updated = ledger::mark_used(&mut conn, ticket.id, actor, now).await?;
    let fresh = ledger::find_ticket_by_id(&mut conn, ticket.id)
        .await?
        .ok_or(TicketingError::Store(sqlx::Error::RowNotFound))?;

    if updated == 0 {
        // The other scanner won the race.
        return Ok(ScanOutcome::duplicate(&fresh));
    }

    tracing::info!(
        event_id = %event_id,
        number = fresh.number,
        scanned_by = %actor,
        "ticket admitted"
    );
    Ok(ScanOutcome::accepted(&fresh))
}
