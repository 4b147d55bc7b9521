//! Session ticket contents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Plaintext of a session ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTicket {
    /// Identity verified by the WLS.
    pub principal: String,

    /// Time the WLS issued the authenticating response.
    pub issued_at: DateTime<Utc>,

    /// End of the WLS-granted session lifetime.
    pub expires_at: DateTime<Utc>,

    /// Whether the transport should keep the ticket across browser restarts.
    pub persistent: bool,
}

impl SessionTicket {
    pub fn new(
        principal: String,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        persistent: bool,
    ) -> Self {
        Self {
            principal,
            issued_at,
            expires_at,
            persistent,
        }
    }

    /// Check if the ticket is expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Seconds of validity left, zero once expired.
    pub fn remaining_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}
