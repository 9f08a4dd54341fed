#![allow(dead_code)]

use chrono::Utc;
use sqlx::SqlitePool;
use std::path::PathBuf;
use uuid::Uuid;

use turnstile_server::models::{Buyer, Event, Ticket};
use turnstile_server::store;
use turnstile_server::ticketing::ingestion::ImportRow;
use turnstile_server::ticketing::ledger;

/// A migrated SQLite database on a temp file. The directory is dropped
/// (and the file deleted) with the struct.
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: tempfile::TempDir,
}

pub async fn test_db() -> TestDb {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let path: PathBuf = dir.path().join("turnstile_test.db");
    let url = format!("sqlite://{}", path.display());

    let pool = store::connect(&url).await.expect("open test database");
    sqlx::migrate!().run(&pool).await.expect("run migrations");

    TestDb { pool, _dir: dir }
}

/// Inserts an event with the given range bounds; `(0, 0)` for the
/// awaiting-ingestion sentinel.
pub async fn create_event(pool: &SqlitePool, range_start: i64, range_end: i64) -> Event {
    let now = Utc::now();
    let event = Event {
        id: Uuid::new_v4(),
        name: "Test Event".to_string(),
        venue: Some("Main Hall".to_string()),
        starts_at: now,
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

    let mut conn = pool.acquire().await.expect("acquire connection");
    ledger::insert_event(&mut conn, &event)
        .await
        .expect("insert event");
    event
}

pub fn buyer(name: &str) -> Buyer {
    Buyer {
        name: name.to_string(),
        email: None,
        phone: None,
    }
}

/// Import rows for the inclusive number range, with unique codes and QR
/// payloads.
pub fn rows(from: i64, to: i64) -> Vec<ImportRow> {
    (from..=to)
        .map(|number| ImportRow {
            number,
            code: format!("TCK-{number:04}"),
            qr_payload: format!("qr-{number:04}-{}", Uuid::new_v4()),
        })
        .collect()
}

pub async fn fetch_event(pool: &SqlitePool, event_id: Uuid) -> Event {
    let mut conn = pool.acquire().await.expect("acquire connection");
    ledger::find_event(&mut conn, event_id)
        .await
        .expect("find event")
        .expect("event exists")
}

pub async fn ticket_by_number(pool: &SqlitePool, event_id: Uuid, number: i64) -> Ticket {
    let mut conn = pool.acquire().await.expect("acquire connection");
    ledger::find_ticket_by_number(&mut conn, event_id, number)
        .await
        .expect("find ticket")
        .expect("ticket exists")
}

pub async fn sale_count_for_ticket(pool: &SqlitePool, ticket_id: Uuid) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales WHERE ticket_id = ?")
        .bind(ticket_id)
        .fetch_one(pool)
        .await
        .expect("count sales")
}
