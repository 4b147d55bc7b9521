//! Per-request Raven authentication flow.

pub mod authenticator;
pub mod exchange;

pub use authenticator::{AuthState, Authenticator};
pub use exchange::{Exchange, Interaction};
