//! WLS signature encoding.
//!
//! Standard base64 with `+`, `/` and `=` replaced by `-`, `.` and `_` so the
//! value survives inside a `!`-separated query parameter.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::SignatureError;

fn from_wls(c: char) -> char {
    match c {
        '-' => '+',
        '.' => '/',
        '_' => '=',
        other => other,
    }
}

fn to_wls(c: char) -> char {
    match c {
        '+' => '-',
        '/' => '.',
        '=' => '_',
        other => other,
    }
}

/// Decode a `sig` field into raw signature bytes.
pub fn decode_signature(s: &str) -> Result<Vec<u8>, SignatureError> {
    let standard: String = s.chars().map(from_wls).collect();
    let bytes = BASE64
        .decode(standard.as_bytes())
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;
    if bytes.is_empty() {
        return Err(SignatureError::Empty);
    }
    Ok(bytes)
}

/// Encode raw bytes the way the WLS does.
pub fn encode_signature(bytes: &[u8]) -> String {
    BASE64.encode(bytes).chars().map(to_wls).collect()
}
