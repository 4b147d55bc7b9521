//! Signature verification of WLS responses.

use tracing::{debug, warn};

use super::store::{TrustStore, KEY_FILE_PREFIX};
use crate::error::VerificationError;
use crate::wls::AuthResponse;

/// Check the response signature against the trust store.
///
/// `Ok(false)` means the signature does not match the signed range; errors
/// are reserved for responses that cannot be checked at all.
pub fn verify_response(
    response: &AuthResponse,
    store: &TrustStore,
) -> Result<bool, VerificationError> {
    let (Some(kid), Some(signature)) = (response.key_id(), response.signature()) else {
        return Err(VerificationError::Unsigned(response.status_code()));
    };

    let name = format!("{}{}", KEY_FILE_PREFIX, kid);
    let key = store.lookup(&name).ok_or_else(|| {
        warn!(key = %name, "WLS response signed with unknown key");
        VerificationError::UnknownKey(name.clone())
    })?;

    // The WLS signs the ASCII wire form; anything else cannot match
    let data = response.signature_data();
    let valid = data.is_ascii() && key.verify(data.as_bytes(), signature);
    debug!(key = %name, valid, "Verified WLS response signature");
    Ok(valid)
}
