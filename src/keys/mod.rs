//! WLS key management and response signature verification.

pub mod store;
pub mod verifier;

pub use store::{TrustStore, VerificationKey};
pub use verifier::verify_response;
