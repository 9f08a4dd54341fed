//! Read-only dashboard counts derived from the ledger.
//!
//! Every figure is a live count; in particular `bulk_sold` counts actual
//! sold bulk tickets rather than trusting the event's bulk-range width,
//! which diverges from reality under partial ingestion.

use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::error::TicketingError;
use super::ledger;

#[derive(Debug, Serialize)]
pub struct TicketStats {
    pub total: i64,
    /// Cashier tickets not yet sold. Bulk tickets are never "available".
    pub available: i64,
    /// Sold on either channel, not yet scanned.
    pub sold: i64,
    pub used: i64,
    pub bulk_sold: i64,
    pub cashier_sold: i64,
    pub revenue_cents: i64,
}

#[derive(FromRow)]
struct StatusCounts {
    total: i64,
    available: i64,
    sold: i64,
    used: i64,
    bulk_sold: i64,
    cashier_sold: i64,
}

const COUNTS_SELECT: &str = "SELECT \
    COUNT(*) AS total, \
    COUNT(*) FILTER (WHERE status = 'available' AND sale_type = 'cashier') AS available, \
    COUNT(*) FILTER (WHERE status = 'sold') AS sold, \
    COUNT(*) FILTER (WHERE status = 'used') AS used, \
    COUNT(*) FILTER (WHERE status = 'sold' AND sale_type = 'bulk') AS bulk_sold, \
    COUNT(*) FILTER (WHERE status = 'sold' AND sale_type = 'cashier') AS cashier_sold \
    FROM tickets";

/// Stats for one event. Fails only on a missing event or a store error.
pub async fn event_stats(pool: &SqlitePool, event_id: Uuid) -> Result<TicketStats, TicketingError> {
    let mut conn = pool.acquire().await.map_err(TicketingError::Store)?;

    ledger::find_event(&mut conn, event_id)
        .await?
        .ok_or(TicketingError::EventNotFound(event_id))?;

    let counts = sqlx::query_as::<_, StatusCounts>(&format!("{COUNTS_SELECT} WHERE event_id = ?"))
        .bind(event_id)
        .fetch_one(&mut *conn)
        .await?;
    let revenue_cents = revenue(&mut conn, Some(event_id)).await?;

    Ok(assemble(counts, revenue_cents))
}

/// Stats across all events.
pub async fn overall_stats(pool: &SqlitePool) -> Result<TicketStats, TicketingError> {
    let mut conn = pool.acquire().await.map_err(TicketingError::Store)?;

    let counts = sqlx::query_as::<_, StatusCounts>(COUNTS_SELECT)
        .fetch_one(&mut *conn)
        .await?;
    let revenue_cents = revenue(&mut conn, None).await?;

    Ok(assemble(counts, revenue_cents))
}

async fn revenue(
    conn: &mut SqliteConnection,
    event_id: Option<Uuid>,
) -> Result<i64, sqlx::Error> {
    match event_id {
        Some(id) => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COALESCE(SUM(s.amount_cents), 0) FROM sales s \
                 JOIN tickets t ON t.id = s.ticket_id WHERE t.event_id = ?",
            )
            .bind(id)
            .fetch_one(conn)
            .await
        }
        None => {
            sqlx::query_scalar::<_, i64>("SELECT COALESCE(SUM(amount_cents), 0) FROM sales")
                .fetch_one(conn)
                .await
        }
    }
}

fn assemble(counts: StatusCounts, revenue_cents: i64) -> TicketStats {
    TicketStats {
        total: counts.total,
        available: counts.available,
        sold: counts.sold,
        used: counts.used,
        bulk_sold: counts.bulk_sold,
        cashier_sold: counts.cashier_sold,
        revenue_cents,
    }
}
