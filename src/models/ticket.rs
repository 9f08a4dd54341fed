use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a ticket: `available -> sold -> used`. No transition
/// leaves `used` and none goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Available,
    Sold,
    Used,
}

/// Which sale channel a ticket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SaleType {
    Cashier,
    Bulk,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub number: i64,
    /// Printed ticket code, unique within the event.
    pub code: String,
    /// Scanner payload, unique across all events.
    pub qr_payload: String,
    pub sale_type: SaleType,
    pub status: TicketStatus,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub buyer_phone: Option<String>,
    pub sold_at: Option<DateTime<Utc>>,
    pub sold_by: Option<String>,
    pub scanned_at: Option<DateTime<Utc>>,
    pub scanned_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
