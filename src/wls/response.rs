//! Parsing of the `WLS-Response` payload.
//!
//! The payload is a `!`-separated list of percent-encoded fields whose
//! meaning is fixed by position. Parsing is total: every malformed payload
//! becomes a [`ProtocolError`], never a panic.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

use super::signature::decode_signature;
use super::status::{ProtocolVersion, StatusCode};
use super::time::parse_time;
use crate::error::{ProtocolError, SignatureError};

/// Field separator. Field values never contain it.
pub const RESPONSE_SEP: char = '!';

/// Positional field names for protocol version 3.
pub const RESPONSE_FIELDS: [&str; 14] = [
    "ver", "status", "msg", "issue", "id", "url", "principal", "ptags", "auth", "sso", "life",
    "params", "kid", "sig",
];

/// Versions 1 and 2 predate `ptags`.
const RESPONSE_FIELDS_V1: [&str; 13] = [
    "ver", "status", "msg", "issue", "id", "url", "principal", "auth", "sso", "life", "params",
    "kid", "sig",
];

/// Longest key identifier the protocol allows.
const MAX_KID_LEN: usize = 8;

fn schema(version: ProtocolVersion) -> &'static [&'static str] {
    if version.has_ptags() {
        &RESPONSE_FIELDS
    } else {
        &RESPONSE_FIELDS_V1
    }
}

fn parse_digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// `kid` is 1-8 digits without a leading zero.
fn is_valid_kid(kid: &str) -> bool {
    !kid.is_empty()
        && kid.len() <= MAX_KID_LEN
        && kid.bytes().all(|b| b.is_ascii_digit())
        && !kid.starts_with('0')
}

/// Everything before the second-to-last separator: the fields covered by
/// the signature, without `kid` and `sig`.
fn signed_range(raw: &str) -> &str {
    match raw.rmatch_indices(RESPONSE_SEP).nth(1) {
        Some((idx, _)) => &raw[..idx],
        None => "",
    }
}

/// A parsed, immutable WLS response.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    raw: String,
    version: ProtocolVersion,
    status: StatusCode,
    status_code: u16,
    fields: HashMap<&'static str, String>,
    issued: DateTime<Utc>,
    expires: Option<DateTime<Utc>>,
    signature: Option<Vec<u8>>,
}

impl AuthResponse {
    /// Parse a raw `WLS-Response` value.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let parts: Vec<&str> = raw.split(RESPONSE_SEP).collect();

        if parts.len() < 2 {
            return Err(ProtocolError::InsufficientFields {
                found: parts.len(),
                required: 2,
            });
        }

        let version = parse_digits::<u32>(parts[0])
            .and_then(ProtocolVersion::from_number)
            .ok_or_else(|| ProtocolError::UnrecognizedVersion(parts[0].to_string()))?;

        let status_code = parse_digits::<u16>(parts[1])
            .ok_or_else(|| ProtocolError::UnrecognizedStatus(parts[1].to_string()))?;
        let status = StatusCode::from_code(status_code);

        let names = schema(version);
        if parts.len() > names.len() {
            return Err(ProtocolError::TooManyFields {
                found: parts.len(),
                max: names.len(),
            });
        }
        // kid and sig must be the last two fields for the signed range to line up
        if status.is_ok() && parts.len() < names.len() {
            return Err(ProtocolError::InsufficientFields {
                found: parts.len(),
                required: names.len(),
            });
        }

        let mut fields = HashMap::with_capacity(parts.len());
        for (&name, part) in names.iter().zip(parts.iter()) {
            let value = urlencoding::decode(part)
                .map_err(|_| ProtocolError::InvalidFieldEncoding { field: name })?;
            fields.insert(name, value.into_owned());
        }

        let issue = fields.get("issue").map(String::as_str).unwrap_or("");
        let issued = parse_time(issue).map_err(ProtocolError::InvalidIssueTime)?;

        let mut response = Self {
            raw: raw.to_string(),
            version,
            status,
            status_code,
            fields,
            issued,
            expires: None,
            signature: None,
        };

        if status.is_ok() {
            let life = parse_digits::<i64>(response.field("life").unwrap_or(""))
                .ok_or(ProtocolError::MissingLifetime)?;
            let lifetime =
                Duration::try_seconds(life).ok_or(ProtocolError::MissingLifetime)?;
            response.expires = Some(
                issued
                    .checked_add_signed(lifetime)
                    .ok_or(ProtocolError::MissingLifetime)?,
            );

            if response.principal().is_none() {
                return Err(ProtocolError::MissingPrincipal);
            }

            let kid = response.field("kid").unwrap_or("");
            if !is_valid_kid(kid) {
                return Err(ProtocolError::InvalidKeyId(kid.to_string()));
            }

            let sig = response
                .field("sig")
                .ok_or(ProtocolError::MalformedSignature(SignatureError::Empty))?;
            response.signature = Some(decode_signature(sig)?);
        }

        debug!(
            version = version.number(),
            status = status_code,
            fields = response.fields.len(),
            "Parsed WLS response"
        );

        Ok(response)
    }

    /// The undecoded payload.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The numeric status as sent, including codes mapped to `Unknown`.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// A decoded field by schema name. Absent if the payload was short.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &HashMap<&'static str, String> {
        &self.fields
    }

    fn non_empty(&self, name: &str) -> Option<&str> {
        self.field(name).filter(|v| !v.is_empty())
    }

    pub fn message(&self) -> Option<&str> {
        self.non_empty("msg")
    }

    pub fn id(&self) -> Option<&str> {
        self.non_empty("id")
    }

    /// Return URL echoed by the WLS.
    pub fn url(&self) -> Option<&str> {
        self.non_empty("url")
    }

    /// Asserted identity. Only trustworthy after signature verification.
    pub fn principal(&self) -> Option<&str> {
        self.non_empty("principal")
    }

    /// Comma-separated principal tags (version 3 only).
    pub fn ptags(&self) -> Vec<&str> {
        self.non_empty("ptags")
            .map(|v| v.split(',').collect())
            .unwrap_or_default()
    }

    /// Authentication type used for this login, if any.
    pub fn auth(&self) -> Option<&str> {
        self.non_empty("auth")
    }

    /// Authentication types previously used in the WLS session.
    pub fn sso(&self) -> Vec<&str> {
        self.non_empty("sso")
            .map(|v| v.split(',').collect())
            .unwrap_or_default()
    }

    pub fn params(&self) -> Option<&str> {
        self.non_empty("params")
    }

    pub fn key_id(&self) -> Option<&str> {
        self.non_empty("kid")
    }

    pub fn issued(&self) -> DateTime<Utc> {
        self.issued
    }

    /// `issued + life`. Only set for status OK.
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    /// Decoded signature. Only set for status OK.
    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    /// The exact bytes the WLS signed.
    pub fn signature_data(&self) -> &str {
        signed_range(&self.raw)
    }
}
