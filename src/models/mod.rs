pub mod event;
pub mod sale;
pub mod ticket;

pub use event::{Buyer, Event};
pub use sale::Sale;
pub use ticket::{SaleType, Ticket, TicketStatus};
