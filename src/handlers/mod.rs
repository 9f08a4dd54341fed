use std::sync::Arc;

use axum::response::Response;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::store::EventLocks;
use crate::utils::response::success;

pub mod admission;
pub mod events;
pub mod sales;
pub mod stats;
pub mod tickets;

/// Shared handler state: the connection pool and the per-event lock
/// registry that serializes bulk-range writes.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub locks: Arc<EventLocks>,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: Arc::new(EventLocks::new()),
        }
    }
}

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "turnstile-api",
    };

    success(payload, "Health check successful")
}
