//! Gate-scan tests: verdicts, lookup by QR payload and printed code, and
//! the channel consistency checks against live bulk bounds.

mod common;

use chrono::Utc;
use turnstile_server::models::TicketStatus;
use turnstile_server::store::EventLocks;
use turnstile_server::ticketing::admission::{self, ScanVerdict};
use turnstile_server::ticketing::ingestion::{self, BulkDeclaration};
use turnstile_server::ticketing::sales::{self, SaleRequest};
use turnstile_server::ticketing::TicketingError;
use uuid::Uuid;

use common::{buyer, create_event, rows, test_db, ticket_by_number};

fn sale(number: i64) -> SaleRequest {
    SaleRequest {
        number,
        buyer: buyer("Jo"),
        amount_cents: 2500,
        payment_mode: "cash".to_string(),
        actor: "cashier-1".to_string(),
    }
}

#[tokio::test]
async fn unknown_identifier_is_invalid() {
    let db = test_db().await;
    let event = create_event(&db.pool, 1, 100).await;

    let outcome = admission::scan(&db.pool, event.id, "no-such-payload", "gate-1")
        .await
        .expect("scan completes");

    assert_eq!(outcome.verdict, ScanVerdict::Invalid);
    assert_eq!(outcome.reason.as_deref(), Some("not found"));
    assert!(outcome.ticket.is_none());
}

#[tokio::test]
async fn scan_for_an_unknown_event_fails() {
    let db = test_db().await;

    let err = admission::scan(&db.pool, Uuid::new_v4(), "anything", "gate-1")
        .await
        .unwrap_err();
    assert!(matches!(err, TicketingError::EventNotFound(_)));
}

#[tokio::test]
async fn unsold_tickets_are_not_admitted() {
    let db = test_db().await;
    let locks = EventLocks::new();
    let event = create_event(&db.pool, 1, 10).await;

    ingestion::ingest(&db.pool, &locks, event.id, rows(1, 10), None, "admin")
        .await
        .expect("import succeeds");
    let ticket = ticket_by_number(&db.pool, event.id, 5).await;

    let outcome = admission::scan(&db.pool, event.id, &ticket.qr_payload, "gate-1")
        .await
        .expect("scan completes");

    assert_eq!(outcome.verdict, ScanVerdict::Invalid);
    assert_eq!(outcome.reason.as_deref(), Some("not sold yet"));
}

#[tokio::test]
async fn sold_ticket_is_admitted_once_then_flagged_duplicate() {
    let db = test_db().await;
    let event = create_event(&db.pool, 1, 100).await;

    let ticket = sales::sell(&db.pool, event.id, sale(10))
        .await
        .expect("sale succeeds");

    let first = admission::scan(&db.pool, event.id, &ticket.qr_payload, "gate-1")
        .await
        .expect("scan completes");
    assert_eq!(first.verdict, ScanVerdict::Accepted);
    assert!(first.reason.is_none());

    let stored = ticket_by_number(&db.pool, event.id, 10).await;
    assert_eq!(stored.status, TicketStatus::Used);
    assert_eq!(stored.scanned_by.as_deref(), Some("gate-1"));
    assert!(stored.scanned_at.is_some());

    let second = admission::scan(&db.pool, event.id, &ticket.qr_payload, "gate-2")
        .await
        .expect("scan completes");
    assert_eq!(second.verdict, ScanVerdict::Duplicate);
    assert_eq!(second.reason.as_deref(), Some("already used"));
    assert_eq!(second.previously_scanned_at, stored.scanned_at);
}

#[tokio::test]
async fn lookup_by_printed_code_also_works() {
    let db = test_db().await;
    let locks = EventLocks::new();
    let event = create_event(&db.pool, 1, 10).await;

    ingestion::ingest(&db.pool, &locks, event.id, rows(1, 10), None, "admin")
        .await
        .expect("import succeeds");
    sales::sell(&db.pool, event.id, sale(5))
        .await
        .expect("sale succeeds");

    let outcome = admission::scan(&db.pool, event.id, "TCK-0005", "gate-1")
        .await
        .expect("scan completes");
    assert_eq!(outcome.verdict, ScanVerdict::Accepted);
    assert_eq!(outcome.ticket.expect("ticket echoed").number, 5);
}

#[tokio::test]
async fn bulk_ticket_inside_its_range_is_admitted() {
    let db = test_db().await;
    let locks = EventLocks::new();
    let event = create_event(&db.pool, 1, 100).await;

    ingestion::ingest(
        &db.pool,
        &locks,
        event.id,
        rows(1, 100),
        Some(BulkDeclaration {
            start: 1,
            end: 40,
            buyer: buyer("Acme Corp"),
        }),
        "admin",
    )
    .await
    .expect("import succeeds");

    let ticket = ticket_by_number(&db.pool, event.id, 20).await;
    let outcome = admission::scan(&db.pool, event.id, &ticket.qr_payload, "gate-1")
        .await
        .expect("scan completes");
    assert_eq!(outcome.verdict, ScanVerdict::Accepted);
}

#[tokio::test]
async fn ticket_number_outside_the_event_range_is_invalid() {
    let db = test_db().await;
    let event = create_event(&db.pool, 1, 100).await;

    // A sold ticket whose number the event's range no longer covers.
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO tickets (id, event_id, number, code, qr_payload, sale_type, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, 'cashier', 'sold', ?, ?)",
    )
    .bind(Uuid::new_v4())
    .bind(event.id)
    .bind(500i64)
    .bind("TCK-0500")
    .bind("qr-out-of-range-0500")
    .bind(now)
    .bind(now)
    .execute(&db.pool)
    .await
    .expect("insert crafted ticket");

    let outcome = admission::scan(&db.pool, event.id, "qr-out-of-range-0500", "gate-1")
        .await
        .expect("scan completes");
    assert_eq!(outcome.verdict, ScanVerdict::Invalid);
    assert_eq!(outcome.reason.as_deref(), Some("outside event range"));
}

#[tokio::test]
async fn bulk_ticket_stranded_outside_the_bulk_range_is_invalid() {
    let db = test_db().await;
    let locks = EventLocks::new();
    let event = create_event(&db.pool, 1, 100).await;

    ingestion::ingest(
        &db.pool,
        &locks,
        event.id,
        rows(1, 100),
        Some(BulkDeclaration {
            start: 1,
            end: 40,
            buyer: buyer("Acme Corp"),
        }),
        "admin",
    )
    .await
    .expect("import succeeds");

    // Shrink the bounds behind the allocator's back; ticket 30 is still
    // marked bulk but no longer covered.
    sqlx::query("UPDATE events SET bulk_range_end = 20 WHERE id = ?")
        .bind(event.id)
        .execute(&db.pool)
        .await
        .expect("shrink bulk bounds");

    let ticket = ticket_by_number(&db.pool, event.id, 30).await;
    let outcome = admission::scan(&db.pool, event.id, &ticket.qr_payload, "gate-1")
        .await
        .expect("scan completes");
    assert_eq!(outcome.verdict, ScanVerdict::Invalid);
    assert_eq!(
        outcome.reason.as_deref(),
        Some("bulk ticket outside bulk range")
    );
}

#[tokio::test]
async fn cashier_ticket_swallowed_by_the_bulk_range_is_invalid() {
    let db = test_db().await;
    let event = create_event(&db.pool, 1, 100).await;

    let ticket = sales::sell(&db.pool, event.id, sale(50))
        .await
        .expect("sale succeeds");

    // Bounds moved over a sold cashier ticket without the conflict check.
    sqlx::query("UPDATE events SET bulk_range_start = 40, bulk_range_end = 60 WHERE id = ?")
        .bind(event.id)
        .execute(&db.pool)
        .await
        .expect("set bulk bounds");

    let outcome = admission::scan(&db.pool, event.id, &ticket.qr_payload, "gate-1")
        .await
        .expect("scan completes");
    assert_eq!(outcome.verdict, ScanVerdict::Invalid);
    assert_eq!(
        outcome.reason.as_deref(),
        Some("cashier ticket inside bulk range — invalid")
    );

    // The rejected ticket was not consumed.
    let stored = ticket_by_number(&db.pool, event.id, 50).await;
    assert_eq!(stored.status, TicketStatus::Sold);
}
