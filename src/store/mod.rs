//! SQLite pool setup and the write-side primitives the ticketing core
//! relies on: explicit `BEGIN IMMEDIATE` transactions (a second writer
//! blocks on the busy timeout instead of failing on a stale snapshot)
//! and the per-event exclusive lock registry.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a pooled SQLite connection in WAL mode.
///
/// The busy timeout bounds every statement that has to wait on another
/// writer; the acquire timeout bounds waiting for a pool slot. Both
/// surface as retryable store errors rather than hanging the caller.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await
}

/// Starts a write transaction that takes the database write lock up front.
///
/// A deferred transaction that reads first and upgrades to a write can fail
/// with `SQLITE_BUSY_SNAPSHOT` under WAL; taking the lock at `BEGIN` keeps
/// read-validate-write sequences serializable.
pub async fn begin_immediate(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
    Ok(())
}

pub async fn commit(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("COMMIT").execute(&mut *conn).await?;
    Ok(())
}

/// Rolls back the current transaction, logging instead of propagating:
/// rollback runs on paths that already carry the original error.
pub async fn rollback(conn: &mut SqliteConnection) {
    if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
        tracing::warn!(error = ?e, "failed to roll back transaction");
    }
}

/// Registry of per-event exclusive locks.
///
/// Bulk-range writes (allocation proposals and whole ingestion calls) are
/// serialized per event so two concurrent proposals cannot both read stale
/// bounds and lose a merge. Sales and scans do not take this lock; they
/// rely on conditional updates instead. Entries are evicted when the last
/// holder's guard drops, so the map stays proportional to in-flight work
/// rather than to every event id ever locked.
#[derive(Debug, Default)]
pub struct EventLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl EventLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, event_id: Uuid) -> EventLockGuard<'_> {
        let lock = self
            .locks
            .entry(event_id)
            .or_default()
            .value()
            .clone();
        let guard = lock.lock_owned().await;
        EventLockGuard {
            registry: self,
            event_id,
            guard: Some(guard),
        }
    }
}

/// Holds one event's exclusive lock for its lifetime.
pub struct EventLockGuard<'a> {
    registry: &'a EventLocks,
    event_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EventLockGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex before the count check so this guard's own
        // Arc (held inside the owned guard) is gone.
        self.guard.take();
        // remove_if holds the shard lock, so no new clone can appear
        // between the count check and the removal. A waiter's clone keeps
        // the count above one and the entry alive.
        self.registry
            .locks
            .remove_if(&self.event_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
