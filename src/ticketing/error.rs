use thiserror::Error;
use uuid::Uuid;

/// Every failure mode of the ticketing core, independent of the web layer.
///
/// All variants except [`TicketingError::Store`] are terminal caller errors:
/// retrying the same input cannot succeed. Store errors are transient and
/// safe to retry wholesale, because every mutating statement in the core is
/// either conditional on prior state or keyed by a unique constraint.
#[derive(Debug, Error)]
pub enum TicketingError {
    #[error("event {0} not found")]
    EventNotFound(Uuid),

    #[error("interval [{start}, {end}] is inverted")]
    InvalidInterval { start: i64, end: i64 },

    #[error("interval [{start}, {end}] exceeds the event range [{range_start}, {range_end}]")]
    OutOfBounds {
        start: i64,
        end: i64,
        range_start: i64,
        range_end: i64,
    },

    /// The proposed bulk interval neither overlaps nor touches the current
    /// one; `gap` is the number of missing ticket numbers between them.
    #[error("proposed bulk range leaves a gap of {gap} ticket number(s) against the current allocation")]
    DiscontinuousRange { gap: i64 },

    #[error("no ticket rows to ingest")]
    EmptyInput,

    /// The bulk partition of an ingestion collides with cashier tickets
    /// that are already sold or used. Nothing is written.
    #[error("bulk range collides with {} cashier-sold ticket(s)", conflicting_numbers.len())]
    BulkCashierConflict { conflicting_numbers: Vec<i64> },

    #[error("ticket number {number} is outside the event range [{range_start}, {range_end}]")]
    OutOfEventRange {
        number: i64,
        range_start: i64,
        range_end: i64,
    },

    #[error("ticket number {number} belongs to the bulk allocation")]
    InBulkRange { number: i64 },

    #[error("no sellable ticket numbers remain for this event")]
    NoInventory,

    #[error("ticket {number} has already been sold")]
    AlreadySold { number: i64 },

    #[error("ticket {number} has already been used")]
    AlreadyUsed { number: i64 },

    #[error("ticket {number} is part of a bulk sale and cannot be sold individually")]
    BulkTicketNotIndividuallySellable { number: i64 },

    #[error("ticket {number} was sold by a concurrent request")]
    ConcurrentSaleConflict { number: i64 },

    #[error("database error")]
    Store(#[from] sqlx::Error),
}

impl TicketingError {
    /// Whether retrying the whole operation with the same input can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
