//! Row operations on the events, tickets and sales tables.
//!
//! Every function takes `&mut SqliteConnection` so callers decide the
//! transaction boundary. The two status transitions are conditional
//! updates (`WHERE status = ...`): the affected-row count is the only
//! reliable signal of who won a race, and callers must check it. A naive
//! read-then-write here would reintroduce the double-sale race.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::models::{Buyer, Event, Sale, SaleType, Ticket, TicketStatus};

pub async fn insert_event(conn: &mut SqliteConnection, event: &Event) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO events (id, name, venue, starts_at, range_start, range_end, \
         bulk_range_start, bulk_range_end, bulk_buyer_name, bulk_buyer_email, bulk_buyer_phone, \
         created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(event.id)
    .bind(&event.name)
    .bind(&event.venue)
    .bind(event.starts_at)
    .bind(event.range_start)
    .bind(event.range_end)
    .bind(event.bulk_range_start)
    .bind(event.bulk_range_end)
    .bind(&event.bulk_buyer_name)
    .bind(&event.bulk_buyer_email)
    .bind(&event.bulk_buyer_phone)
    .bind(event.created_at)
    .bind(event.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_event(
    conn: &mut SqliteConnection,
    event_id: Uuid,
) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
        .bind(event_id)
        .fetch_optional(conn)
        .await
}

pub async fn set_event_range(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    range_start: i64,
    range_end: i64,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE events SET range_start = ?, range_end = ?, updated_at = ? WHERE id = ?")
        .bind(range_start)
        .bind(range_end)
        .bind(now)
        .bind(event_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn update_bulk_allocation(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    bulk_start: i64,
    bulk_end: i64,
    buyer_name: &str,
    buyer_email: Option<&str>,
    buyer_phone: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE events SET bulk_range_start = ?, bulk_range_end = ?, \
         bulk_buyer_name = ?, bulk_buyer_email = ?, bulk_buyer_phone = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(bulk_start)
    .bind(bulk_end)
    .bind(buyer_name)
    .bind(buyer_email)
    .bind(buyer_phone)
    .bind(now)
    .bind(event_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_ticket_by_id(
    conn: &mut SqliteConnection,
    ticket_id: Uuid,
) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = ?")
        .bind(ticket_id)
        .fetch_optional(conn)
        .await
}

pub async fn find_ticket_by_number(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    number: i64,
) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE event_id = ? AND number = ?")
        .bind(event_id)
        .bind(number)
        .fetch_optional(conn)
        .await
}

/// Gate lookup: the scanner may hand us either the QR payload or the
/// printed code, so both are tried, scoped to the event.
pub async fn find_ticket_by_identifier(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    identifier: &str,
) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>(
        "SELECT * FROM tickets WHERE event_id = ? AND (qr_payload = ? OR code = ?)",
    )
    .bind(event_id)
    .bind(identifier)
    .bind(identifier)
    .fetch_optional(conn)
    .await
}

/// Inserts a not-yet-sold cashier ticket. Fails on a duplicate number,
/// code or QR payload; ingestion reports that per row.
pub async fn insert_cashier_available(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    number: i64,
    code: &str,
    qr_payload: &str,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO tickets (id, event_id, number, code, qr_payload, sale_type, status, \
         created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4())
    .bind(event_id)
    .bind(number)
    .bind(code)
    .bind(qr_payload)
    .bind(SaleType::Cashier)
    .bind(TicketStatus::Available)
    .bind(now)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Creates a cashier ticket directly in the sold state, for numbers the
/// ledger has never seen (lazy creation on first individual sale).
#[allow(clippy::too_many_arguments)]
pub async fn insert_cashier_sold(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    number: i64,
    code: &str,
    qr_payload: &str,
    buyer: &Buyer,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO tickets (id, event_id, number, code, qr_payload, sale_type, status, \
         buyer_name, buyer_email, buyer_phone, sold_at, sold_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(event_id)
    .bind(number)
    .bind(code)
    .bind(qr_payload)
    .bind(SaleType::Cashier)
    .bind(TicketStatus::Sold)
    .bind(&buyer.name)
    .bind(&buyer.email)
    .bind(&buyer.phone)
    .bind(now)
    .bind(actor)
    .bind(now)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(id)
}

/// Writes a bulk-sold ticket keyed by `(event_id, number)`: claims the
/// existing row when there is one, inserts otherwise.
///
/// The update guard refuses to clobber a cashier ticket that is already
/// sold or used; ingestion pre-validates those into a `BulkCashierConflict`,
/// so a refused claim means a writer slipped in between validation and
/// write, and the fallthrough insert fails on the number constraint. Not an
/// `ON CONFLICT` upsert: a re-imported row carries its original code and QR
/// payload, which conflict on indexes outside the upsert target. The
/// caller's immediate transaction makes the two steps atomic.
pub async fn upsert_bulk_sold(
    conn: &mut SqliteConnection,
    event: &Event,
    number: i64,
    code: &str,
    qr_payload: &str,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let claimed = sqlx::query(
        "UPDATE tickets SET sale_type = ?, status = ?, \
         buyer_name = ?, buyer_email = ?, buyer_phone = ?, \
         sold_at = ?, sold_by = ?, updated_at = ? \
         WHERE event_id = ? AND number = ? \
           AND (sale_type = 'bulk' OR (sale_type = 'cashier' AND status = 'available'))",
    )
    .bind(SaleType::Bulk)
    .bind(TicketStatus::Sold)
    .bind(&event.bulk_buyer_name)
    .bind(&event.bulk_buyer_email)
    .bind(&event.bulk_buyer_phone)
    .bind(now)
    .bind(actor)
    .bind(now)
    .bind(event.id)
    .bind(number)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    if claimed > 0 {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO tickets (id, event_id, number, code, qr_payload, sale_type, status, \
         buyer_name, buyer_email, buyer_phone, sold_at, sold_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4())
    .bind(event.id)
    .bind(number)
    .bind(code)
    .bind(qr_payload)
    .bind(SaleType::Bulk)
    .bind(TicketStatus::Sold)
    .bind(&event.bulk_buyer_name)
    .bind(&event.bulk_buyer_email)
    .bind(&event.bulk_buyer_phone)
    .bind(now)
    .bind(actor)
    .bind(now)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Cashier ticket numbers in `[start, end]` that are already sold or used.
pub async fn cashier_sold_numbers_in(
    conn: &mut SqliteConnection,
    event_id: Uuid,
    start: i64,
    end: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT number FROM tickets WHERE event_id = ? AND number BETWEEN ? AND ? \
         AND sale_type = 'cashier' AND status IN ('sold', 'used') ORDER BY number",
    )
    .bind(event_id)
    .bind(start)
    .bind(end)
    .fetch_all(conn)
    .await
}

/// Conditional `available -> sold` transition. Returns the affected-row
/// count: zero means a concurrent sale won.
pub async fn mark_sold(
    conn: &mut SqliteConnection,
    ticket_id: Uuid,
    buyer: &Buyer,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE tickets SET status = ?, buyer_name = ?, buyer_email = ?, buyer_phone = ?, \
         sold_at = ?, sold_by = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(TicketStatus::Sold)
    .bind(&buyer.name)
    .bind(&buyer.email)
    .bind(&buyer.phone)
    .bind(now)
    .bind(actor)
    .bind(now)
    .bind(ticket_id)
    .bind(TicketStatus::Available)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Conditional `sold -> used` transition. Returns the affected-row count:
/// zero means another scan got there first.
pub async fn mark_used(
    conn: &mut SqliteConnection,
    ticket_id: Uuid,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE tickets SET status = ?, scanned_at = ?, scanned_by = ?, updated_at = ? \
         WHERE id = ? AND status = ?",
    )
    .bind(TicketStatus::Used)
    .bind(now)
    .bind(actor)
    .bind(now)
    .bind(ticket_id)
    .bind(TicketStatus::Sold)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO sales (id, ticket_id, cashier, amount_cents, payment_mode, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(sale.id)
    .bind(sale.ticket_id)
    .bind(&sale.cashier)
    .bind(sale.amount_cents)
    .bind(sale.payment_mode.as_str())
    .bind(sale.created_at)
    .execute(conn)
    .await?;
    Ok(())
}
