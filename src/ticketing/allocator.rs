//! The range allocator: owns the bulk/available partition of an event's
//! ticket-number space.
//!
//! The bulk sub-range is always one contiguous interval. A new proposal
//! that overlaps or touches the current interval merges into it; one that
//! leaves a numeric gap is rejected with the gap size as diagnostic.

use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::models::{Buyer, Event};
use crate::store::{self, EventLocks};

use super::error::TicketingError;
use super::ledger;

/// Merges a proposed interval into the current bulk bounds.
///
/// Overlap-or-adjacency test: `start <= ce + 1 && end >= cs - 1`. Anything
/// else leaves a gap and fails with [`TicketingError::DiscontinuousRange`].
pub fn merge_bulk_bounds(
    current: Option<(i64, i64)>,
    start: i64,
    end: i64,
) -> Result<(i64, i64), TicketingError> {
    let Some((cs, ce)) = current else {
        return Ok((start, end));
    };
    // Saturating arithmetic: bounds are arbitrary i64 values once a range
    // has been learned from imported rows.
    if start <= ce.saturating_add(1) && end >= cs.saturating_sub(1) {
        return Ok((cs.min(start), ce.max(end)));
    }
    let gap = if start > ce {
        start.saturating_sub(ce).saturating_sub(1)
    } else {
        cs.saturating_sub(end).saturating_sub(1)
    };
    Err(TicketingError::DiscontinuousRange { gap })
}

/// The interval of individually sellable ticket numbers, if any.
///
/// With no bulk range this is the whole event range. When the bulk range
/// splits the event range in two, the segment before the bulk range is
/// returned; the after-bulk segment is only used when nothing precedes the
/// bulk range. One rule, applied everywhere.
pub fn available_range(event: &Event) -> Option<(i64, i64)> {
    if !event.has_known_range() {
        return None;
    }
    let Some((bulk_start, bulk_end)) = event.bulk_bounds() else {
        return Some((event.range_start, event.range_end));
    };
    if event.range_start < bulk_start {
        Some((event.range_start, bulk_start - 1))
    } else if bulk_end < event.range_end {
        Some((bulk_end + 1, event.range_end))
    } else {
        None
    }
}

/// Containment check against the bulk bounds; false when none are set.
pub fn is_in_bulk_range(event: &Event, number: i64) -> bool {
    event
        .bulk_bounds()
        .is_some_and(|(start, end)| number >= start && number <= end)
}

/// Proposes a bulk allocation for the event, merging with any existing one.
///
/// Runs under the per-event exclusive lock and an immediate transaction so
/// a concurrent proposal observes the committed merge, never stale bounds.
pub async fn propose_bulk_allocation(
    pool: &SqlitePool,
    locks: &EventLocks,
    event_id: Uuid,
    start: i64,
    end: i64,
    buyer: Buyer,
    actor: &str,
) -> Result<Event, TicketingError> {
    let _guard = locks.acquire(event_id).await;
    let mut conn = pool.acquire().await.map_err(TicketingError::Store)?;

    store::begin_immediate(&mut conn).await?;
    match propose_in_tx(&mut conn, event_id, start, end, buyer, actor).await {
        Ok(event) => {
            store::commit(&mut conn).await?;
            Ok(event)
        }
        Err(e) => {
            store::rollback(&mut conn).await;
            Err(e)
        }
    }
}

async fn propose_in_tx(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    start: i64,
    end: i64,
    buyer: Buyer,
    actor: &str,
) -> Result<Event, TicketingError> {
    let mut event = ledger::find_event(conn, event_id)
        .await?
        .ok_or(TicketingError::EventNotFound(event_id))?;
    apply_bulk_allocation(conn, &mut event, start, end, buyer, actor).await?;
    Ok(event)
}

/// Validates and writes a bulk allocation against an already-loaded event,
/// updating it in place. Shared between the standalone proposal operation
/// and ingestion's declared-up-front bulk range; the caller holds the
/// per-event lock and the enclosing transaction.
pub(crate) async fn apply_bulk_allocation(
    conn: &mut SqliteConnection,
    event: &mut Event,
    start: i64,
    end: i64,
    buyer: Buyer,
    actor: &str,
) -> Result<(), TicketingError> {
    if start > end {
        return Err(TicketingError::InvalidInterval { start, end });
    }
    if start < event.range_start || end > event.range_end {
        return Err(TicketingError::OutOfBounds {
            start,
            end,
            range_start: event.range_start,
            range_end: event.range_end,
        });
    }

    let current = event.bulk_bounds();
    let (merged_start, merged_end) = merge_bulk_bounds(current, start, end)?;

    // Merge-with-override: the latest caller's name always wins; email and
    // phone fall back to the previous allocation when not supplied.
    let (email, phone) = if current.is_some() {
        (
            buyer.email.or_else(|| event.bulk_buyer_email.clone()),
            buyer.phone.or_else(|| event.bulk_buyer_phone.clone()),
        )
    } else {
        (buyer.email, buyer.phone)
    };

    let now = chrono::Utc::now();
    ledger::update_bulk_allocation(
        conn,
        event.id,
        merged_start,
        merged_end,
        &buyer.name,
        email.as_deref(),
        phone.as_deref(),
        now,
    )
    .await?;

    tracing::info!(
        event_id = %event.id,
        bulk_start = merged_start,
        bulk_end = merged_end,
        actor = %actor,
        "bulk allocation updated"
    );

    event.bulk_range_start = Some(merged_start);
    event.bulk_range_end = Some(merged_end);
    event.bulk_buyer_name = Some(buyer.name);
    event.bulk_buyer_email = email;
    event.bulk_buyer_phone = phone;
    event.updated_at = now;
    Ok(())
}
