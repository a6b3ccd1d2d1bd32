pub mod bookings;
pub mod moderation;
pub mod payments;
pub mod tickets;
pub mod users;
