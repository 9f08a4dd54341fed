//! The ticket-range allocation and reconciliation engine.
//!
//! Everything with real invariants lives here: the bulk/cashier partition of
//! an event's ticket-number space ([`allocator`]), the ledger of ticket rows
//! and their conditional status transitions ([`ledger`]), batch ingestion
//! ([`ingestion`]), single cashier sales ([`sales`]), the gate-scan state
//! machine ([`admission`]) and read-only reporting ([`reporting`]). The HTTP
//! layer is a thin collaborator that feeds these operations structured
//! inputs and renders their results.

pub mod admission;
pub mod allocator;
pub mod error;
pub mod ingestion;
pub mod ledger;
pub mod reporting;
pub mod sales;

pub use error::TicketingError;
