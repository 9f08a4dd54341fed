use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A cashier-channel sale. Exactly one per cashier-sold ticket; bulk
/// purchases are tracked on the event, not per ticket.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sale {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub cashier: String,
    pub amount_cents: i64,
    pub payment_mode: String,
    pub created_at: DateTime<Utc>,
}
