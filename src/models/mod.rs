pub mod booking;
pub mod ticket;
pub mod transaction;
pub mod user;

pub use booking::{Booking, BookingStatus};
pub use ticket::{ModerationStatus, Ticket, TransportMode};
pub use transaction::{Transaction, TransactionStatus};
pub use user::{Role, User};
