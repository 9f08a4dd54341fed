use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An event and the ticket-number space it owns.
///
/// `range_start..=range_end` are the inclusive bounds of all valid ticket
/// numbers; `(0, 0)` is a sentinel meaning the range is not known yet and
/// will be learned from the first ingestion. The bulk sub-range, when set,
/// is always a single contiguous interval inside the event range.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub venue: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub range_start: i64,
    pub range_end: i64,
    pub bulk_range_start: Option<i64>,
    pub bulk_range_end: Option<i64>,
    pub bulk_buyer_name: Option<String>,
    pub bulk_buyer_email: Option<String>,
    pub bulk_buyer_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Bulk bounds as a pair, present only when both ends are set.
    pub fn bulk_bounds(&self) -> Option<(i64, i64)> {
        match (self.bulk_range_start, self.bulk_range_end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Whether the event range has been established (not the `(0, 0)` sentinel).
    pub fn has_known_range(&self) -> bool {
        !(self.range_start == 0 && self.range_end == 0)
    }

    pub fn contains(&self, number: i64) -> bool {
        self.has_known_range() && number >= self.range_start && number <= self.range_end
    }
}

/// Buyer contact details supplied with a sale or a bulk allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Buyer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}
