//! Sealing and opening of session tickets.
//!
//! Tickets are AES-256-GCM sealed JSON, so the holder can neither read nor
//! alter the principal or expiry. Wire form (URL-safe base64, no padding):
//! `version (1) || nonce (12) || ciphertext+tag`.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use tracing::debug;

use super::types::SessionTicket;
use crate::error::TicketError;

/// Ticket key length in bytes.
pub const TICKET_KEY_LEN: usize = 32;

const TICKET_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const TICKET_AAD: &[u8] = b"zentinel-raven-ticket";

/// Issues and opens session tickets under one symmetric key.
pub struct TicketIssuer {
    cipher: Aes256Gcm,
}

impl TicketIssuer {
    /// Create an issuer from a 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self, TicketError> {
        if key.len() != TICKET_KEY_LEN {
            return Err(TicketError::InvalidKey(format!(
                "expected {} bytes, got {}",
                TICKET_KEY_LEN,
                key.len()
            )));
        }
        Ok(Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        })
    }

    /// Create an issuer from a hex-encoded key.
    pub fn from_hex(hex_key: &str) -> Result<Self, TicketError> {
        let key = hex::decode(hex_key.trim())
            .map_err(|e| TicketError::InvalidKey(format!("not hex: {}", e)))?;
        Self::new(&key)
    }

    /// Create an issuer with a random key. Tickets die with the process.
    pub fn ephemeral() -> Self {
        let key: [u8; TICKET_KEY_LEN] = rand::random();
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        }
    }

    /// Seal a ticket into an opaque token.
    pub fn issue(&self, ticket: &SessionTicket) -> Result<String, TicketError> {
        let plaintext =
            serde_json::to_vec(ticket).map_err(|e| TicketError::Encode(e.to_string()))?;

        let nonce: [u8; NONCE_LEN] = rand::random();
        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &plaintext,
                    aad: TICKET_AAD,
                },
            )
            .map_err(|_| TicketError::Encode("encryption failed".to_string()))?;

        let mut sealed = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        sealed.push(TICKET_VERSION);
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);

        debug!(
            principal = %ticket.principal,
            expires_at = %ticket.expires_at,
            "Issued session ticket"
        );

        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Open a token produced by [`issue`](Self::issue).
    pub fn load(&self, token: &str) -> Result<SessionTicket, TicketError> {
        let sealed = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| TicketError::InvalidTicket)?;

        if sealed.len() <= 1 + NONCE_LEN || sealed[0] != TICKET_VERSION {
            return Err(TicketError::InvalidTicket);
        }

        let (nonce, ciphertext) = sealed[1..].split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: TICKET_AAD,
                },
            )
            .map_err(|_| TicketError::InvalidTicket)?;

        serde_json::from_slice(&plaintext).map_err(|_| TicketError::InvalidTicket)
    }
}

impl std::fmt::Debug for TicketIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketIssuer").finish_non_exhaustive()
    }
}
