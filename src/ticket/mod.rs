//! Locally issued session tickets.
//!
//! A ticket is the client-held credential created after a verified WLS
//! response. No server-side session table is kept.

pub mod issuer;
pub mod types;

pub use issuer::TicketIssuer;
pub use types::SessionTicket;
