//! Batch ticket ingestion: splits pre-parsed rows into bulk-sold and
//! cashier-available ledger writes.
//!
//! The bulk range is declared up front (here or via an earlier allocation
//! proposal) and rows are partitioned by containment. Bounds and the
//! bulk/cashier conflict check commit in one transaction before any ticket
//! write, so a failed import never leaves the event's bulk bounds pointing
//! at tickets that were not written.

use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::models::{Buyer, Event};
use crate::store::{self, EventLocks};

use super::allocator;
use super::error::TicketingError;
use super::ledger;

/// Rows per write transaction. A failed batch falls back to per-row
/// writes so one bad row costs one row, not a hundred.
const BATCH_SIZE: usize = 100;

/// One pre-parsed row of the import file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRow {
    pub number: i64,
    pub code: String,
    pub qr_payload: String,
}

/// A bulk allocation declared alongside the import. Routed through the
/// same merge logic as a standalone proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkDeclaration {
    pub start: i64,
    pub end: i64,
    pub buyer: Buyer,
}

/// Outcome of one ingestion call. Per-row failures are attributed with
/// the offending ticket number and the underlying error.
#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub bulk_succeeded: usize,
    pub cashier_succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

pub async fn ingest(
    pool: &SqlitePool,
    locks: &EventLocks,
    event_id: Uuid,
    rows: Vec<ImportRow>,
    bulk: Option<BulkDeclaration>,
    actor: &str,
) -> Result<IngestReport, TicketingError> {
    if rows.is_empty() {
        return Err(TicketingError::EmptyInput);
    }

    // Bulk-range writes for the whole call are serialized behind the same
    // per-event lock as allocation proposals.
    let _guard = locks.acquire(event_id).await;
    let mut conn = pool.acquire().await.map_err(TicketingError::Store)?;

    store::begin_immediate(&mut conn).await?;
    let event = match prepare_event(&mut conn, event_id, &rows, bulk, actor).await {
        Ok(event) => {
            store::commit(&mut conn).await?;
            event
        }
        Err(e) => {
            store::rollback(&mut conn).await;
            return Err(e);
        }
    };

    let mut report = IngestReport::default();
    let mut bulk_rows = Vec::new();
    let mut cashier_rows = Vec::new();
    for row in &rows {
        if !event.contains(row.number) {
            report.failed += 1;
            report.errors.push(format!(
                "ticket {}: outside event range [{}, {}]",
                row.number, event.range_start, event.range_end
            ));
        } else if allocator::is_in_bulk_range(&event, row.number) {
            bulk_rows.push(row);
        } else {
            cashier_rows.push(row);
        }
    }

    write_partition(&mut conn, &event, &bulk_rows, true, actor, &mut report).await;
    write_partition(&mut conn, &event, &cashier_rows, false, actor, &mut report).await;

    tracing::info!(
        event_id = %event_id,
        bulk = report.bulk_succeeded,
        cashier = report.cashier_succeeded,
        failed = report.failed,
        "ingestion finished"
    );
    Ok(report)
}

/// Establishes the event range and bulk bounds before any ticket write.
///
/// Validate-before-commit: the cashier-conflict check runs inside the same
/// transaction as the bounds merge, so a conflicting import rolls the
/// bounds back wholesale.
async fn prepare_event(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    rows: &[ImportRow],
    bulk: Option<BulkDeclaration>,
    actor: &str,
) -> Result<Event, TicketingError> {
    let mut event = ledger::find_event(conn, event_id)
        .await?
        .ok_or(TicketingError::EventNotFound(event_id))?;

    if !event.has_known_range() {
        // First ingestion defines the range.
        let (min, max) = rows.iter().fold((i64::MAX, i64::MIN), |(lo, hi), row| {
            (lo.min(row.number), hi.max(row.number))
        });
        let now = chrono::Utc::now();
        ledger::set_event_range(conn, event_id, min, max, now).await?;
        event.range_start = min;
        event.range_end = max;
        event.updated_at = now;
        tracing::info!(
            event_id = %event_id,
            range_start = min,
            range_end = max,
            "event range learned from ingestion"
        );
    }

    if let Some(declaration) = bulk {
        allocator::apply_bulk_allocation(
            conn,
            &mut event,
            declaration.start,
            declaration.end,
            declaration.buyer,
            actor,
        )
        .await?;
    }

    if let Some((bulk_start, bulk_end)) = event.bulk_bounds() {
        let conflicting_numbers =
            ledger::cashier_sold_numbers_in(conn, event_id, bulk_start, bulk_end).await?;
        if !conflicting_numbers.is_empty() {
            return Err(TicketingError::BulkCashierConflict { conflicting_numbers });
        }
    }

    Ok(event)
}

/// Writes one partition in batches, falling back to per-row writes when a
/// batch transaction fails.
async fn write_partition(
    conn: &mut SqliteConnection,
    event: &Event,
    rows: &[&ImportRow],
    as_bulk: bool,
    actor: &str,
    report: &mut IngestReport,
) {
    for chunk in rows.chunks(BATCH_SIZE) {
        match write_batch(conn, event, chunk, as_bulk, actor).await {
            Ok(()) => {
                if as_bulk {
                    report.bulk_succeeded += chunk.len();
                } else {
                    report.cashier_succeeded += chunk.len();
                }
            }
            Err(e) => {
                tracing::warn!(
                    event_id = %event.id,
                    rows = chunk.len(),
                    error = %e,
                    "batch write failed, retrying per row"
                );
                for row in chunk {
                    match write_row(conn, event, row, as_bulk, actor).await {
                        Ok(()) => {
                            if as_bulk {
                                report.bulk_succeeded += 1;
                            } else {
                                report.cashier_succeeded += 1;
                            }
                        }
                        Err(e) => {
                            report.failed += 1;
                            report.errors.push(format!("ticket {}: {}", row.number, e));
                        }
                    }
                }
            }
        }
    }
}

async fn write_batch(
    conn: &mut SqliteConnection,
    event: &Event,
    rows: &[&ImportRow],
    as_bulk: bool,
    actor: &str,
) -> Result<(), sqlx::Error> {
    store::begin_immediate(conn).await?;
    for row in rows {
        if let Err(e) = write_row(conn, event, row, as_bulk, actor).await {
            store::rollback(conn).await;
            return Err(e);
        }
    }
    store::commit(conn).await
}

async fn write_row(
    conn: &mut SqliteConnection,
    event: &Event,
    row: &ImportRow,
    as_bulk: bool,
    actor: &str,
) -> Result<(), sqlx::Error> {
    let now = chrono::Utc::now();
    if as_bulk {
        ledger::upsert_bulk_sold(conn, event, row.number, &row.code, &row.qr_payload, actor, now)
            .await
    } else {
        ledger::insert_cashier_available(
            conn,
            event.id,
            row.number,
            &row.code,
            &row.qr_payload,
            now,
        )
        .await
    }
}
