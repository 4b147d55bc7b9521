//! Raven (Cambridge University Web Login Service) client for Zentinel.
//!
//! The crate implements the application side of the WLS protocol:
//!
//! - building `authenticate.html` requests ([`wls::AuthRequest`])
//! - parsing the `WLS-Response` payload ([`wls::AuthResponse`])
//! - RSA-SHA1 signature checks against a directory of WLS keys
//!   ([`keys::TrustStore`])
//! - sealed, client-held session tickets ([`ticket::TicketIssuer`])
//! - the login state machine tying these together ([`flow::Authenticator`])
//!
//! Request and response plumbing is left to the host through the
//! [`flow::Exchange`] trait.

pub mod config;
pub mod error;
pub mod flow;
pub mod keys;
pub mod ticket;
pub mod wls;

pub use config::{RavenConfig, RavenConfigJson};
pub use error::{AuthError, ErrorKind};
pub use flow::{AuthState, Authenticator, Exchange, Interaction};
pub use keys::TrustStore;
pub use ticket::{SessionTicket, TicketIssuer};
pub use wls::{AuthRequest, AuthResponse, StatusCode};
