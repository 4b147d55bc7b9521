//! Error types for the Raven protocol engine.
//!
//! Every operation returns one of these explicitly. Only the
//! [`Authenticator`](crate::flow::Authenticator) turns an error into a
//! user-facing redirect.

use std::path::PathBuf;
use thiserror::Error;

use crate::wls::StatusCode;

/// A value did not match the `yyyyMMddTHHmmssZ` time format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid WLS time {0:?}")]
pub struct TimeFormatError(pub String);

/// The signature field could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// Not valid base64 once the WLS substitutions are undone.
    #[error("malformed signature encoding: {0}")]
    Malformed(String),

    /// Decoded to zero bytes.
    #[error("signature is empty")]
    Empty,
}

/// Structural problems with a `WLS-Response` payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Fewer fields than the response needs.
    #[error("response has too few fields ({found}, need {required})")]
    InsufficientFields { found: usize, required: usize },

    /// More fields than the schema for this version names.
    #[error("response has too many fields ({found}, schema has {max})")]
    TooManyFields { found: usize, max: usize },

    #[error("unrecognized protocol version {0:?}")]
    UnrecognizedVersion(String),

    #[error("unrecognized status code {0:?}")]
    UnrecognizedStatus(String),

    /// A field was not valid percent-encoded UTF-8.
    #[error("field {field} is not valid percent-encoded UTF-8")]
    InvalidFieldEncoding { field: &'static str },

    #[error("cannot parse issue time: {0}")]
    InvalidIssueTime(#[source] TimeFormatError),

    #[error("session lifetime missing or not a number")]
    MissingLifetime,

    #[error("invalid key identifier {0:?}")]
    InvalidKeyId(String),

    #[error("successful response carries no principal")]
    MissingPrincipal,

    #[error(transparent)]
    MalformedSignature(#[from] SignatureError),
}

/// Failure to build the trust store at startup.
#[derive(Debug, Error)]
pub enum TrustStoreError {
    #[error("cannot read certificate directory {path:?}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid certificate {path:?}: {reason}")]
    InvalidCertificate { path: PathBuf, reason: String },
}

/// Errors from signature verification that are not a plain mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// No key in the trust store under this identifier.
    #[error("no verification key named {0:?}")]
    UnknownKey(String),

    /// The response is not a signed (status OK) response.
    #[error("response with status {0} carries no signature")]
    Unsigned(u16),
}

/// Errors from sealing or opening a session ticket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketError {
    /// Tampered, truncated, or sealed under a different key.
    #[error("invalid session ticket")]
    InvalidTicket,

    #[error("invalid ticket key: {0}")]
    InvalidKey(String),

    #[error("cannot encode session ticket: {0}")]
    Encode(String),
}

/// Classification of [`AuthError`] for callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed payload. Never retried.
    Structural,
    /// Unknown key, bad signature encoding or mismatch. Possible forgery.
    Crypto,
    /// The identity provider returned a non-OK status.
    ProtocolStatus,
    /// Local setup problem (ticket key, certificates).
    Configuration,
    /// The request/response collaborator failed.
    Transport,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Structural => write!(f, "structural"),
            ErrorKind::Crypto => write!(f, "crypto"),
            ErrorKind::ProtocolStatus => write!(f, "protocol_status"),
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::Transport => write!(f, "transport"),
        }
    }
}

/// Terminal failure of one authentication interaction.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid WLS response: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("cannot verify WLS response: {0}")]
    Verification(#[from] VerificationError),

    #[error("WLS response signature does not match")]
    InvalidSignature,

    /// Non-OK status and no error page configured.
    #[error("authentication failed: {status} ({code})")]
    Status {
        status: StatusCode,
        code: u16,
        message: Option<String>,
    },

    #[error("WLS response issued at {issued} is outside the accepted window")]
    StaleResponse { issued: String },

    #[error(transparent)]
    Ticket(#[from] TicketError),

    #[error("exchange failed: {0}")]
    Exchange(#[source] anyhow::Error),
}

impl AuthError {
    /// Which part of the error taxonomy this belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Protocol(ProtocolError::MalformedSignature(_)) => ErrorKind::Crypto,
            AuthError::Protocol(ProtocolError::InvalidKeyId(_)) => ErrorKind::Crypto,
            AuthError::Protocol(_) => ErrorKind::Structural,
            AuthError::StaleResponse { .. } => ErrorKind::Structural,
            AuthError::Verification(_) | AuthError::InvalidSignature => ErrorKind::Crypto,
            AuthError::Status { .. } => ErrorKind::ProtocolStatus,
            AuthError::Ticket(TicketError::InvalidKey(_)) => ErrorKind::Configuration,
            AuthError::Ticket(_) => ErrorKind::Crypto,
            AuthError::Exchange(_) => ErrorKind::Transport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err = AuthError::from(ProtocolError::InsufficientFields {
            found: 1,
            required: 2,
        });
        assert_eq!(err.kind(), ErrorKind::Structural);

        let err = AuthError::from(ProtocolError::MalformedSignature(SignatureError::Empty));
        assert_eq!(err.kind(), ErrorKind::Crypto);

        let err = AuthError::from(VerificationError::UnknownKey("pubkey9".to_string()));
        assert_eq!(err.kind(), ErrorKind::Crypto);

        let err = AuthError::Status {
            status: StatusCode::Cancelled,
            code: 410,
            message: None,
        };
        assert_eq!(err.kind(), ErrorKind::ProtocolStatus);
        assert_eq!(err.kind().to_string(), "protocol_status");
    }
}
