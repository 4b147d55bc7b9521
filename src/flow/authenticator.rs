//! Raven authentication state machine.
//!
//! Each interaction starts without a session unless it presents a valid
//! ticket. From there it either redirects to the WLS, or consumes the
//! `WLS-Response` the browser brought back:
//!
//! ```text
//! NoSession --(no response)--> AwaitingResponse
//! NoSession --(status OK, signature valid)--> Authenticated
//! NoSession --(status != OK)--> Failed
//! NoSession --(malformed, unverifiable)--> Err(AuthError)
//! (valid ticket) --> Authenticated
//! ```
//!
//! Nothing is kept between interactions.

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::exchange::Exchange;
use crate::config::RavenConfig;
use crate::error::{AuthError, ProtocolError};
use crate::keys::{verify_response, TrustStore};
use crate::ticket::{SessionTicket, TicketIssuer};
use crate::wls::{format_time, AuthRequest, AuthResponse, StatusCode};

/// Where an interaction ended up.
///
/// `Failed` only covers statuses the WLS reported itself. A response that
/// cannot be parsed or fails signature verification (unknown key, bad
/// signature, stale issue time) ends the interaction as
/// `Err(AuthError)` from [`Authenticator::authenticate`] instead, and is
/// never turned into an error-page redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No valid ticket yet. Only seen before the interaction is advanced.
    NoSession,

    /// The browser was sent to the WLS.
    AwaitingResponse { redirect: String },

    /// A valid ticket exists. `redirect` is set when the ticket was just
    /// issued and the browser was sent back to its original URL.
    Authenticated {
        ticket: SessionTicket,
        redirect: Option<String>,
    },

    /// The WLS reported a non-OK status and the browser was sent to the
    /// error page.
    Failed {
        status: StatusCode,
        code: u16,
        redirect: String,
    },
}

/// Runs the Raven flow for one interaction at a time.
#[derive(Debug)]
pub struct Authenticator {
    config: RavenConfig,
    trust_store: Arc<TrustStore>,
    issuer: TicketIssuer,
}

impl Authenticator {
    /// Create an authenticator from already-loaded parts.
    pub fn new(
        config: RavenConfig,
        trust_store: Arc<TrustStore>,
        issuer: TicketIssuer,
    ) -> anyhow::Result<Self> {
        config.validate().map_err(|e| anyhow!(e))?;

        Ok(Self {
            config,
            trust_store,
            issuer,
        })
    }

    /// Load keys and the ticket key as the configuration describes.
    pub fn from_config(config: RavenConfig) -> anyhow::Result<Self> {
        config.validate().map_err(|e| anyhow!(e))?;

        let trust_store = TrustStore::load_with_extension(
            &config.certificate_path,
            &config.certificate_extension,
        )
        .context("Failed to load Raven certificates")?;

        if trust_store.is_empty() {
            warn!(
                path = %config.certificate_path.display(),
                "No Raven certificates found, every login will fail verification"
            );
        }

        let issuer = match config.ticket_key {
            Some(ref key) => TicketIssuer::from_hex(key).context("Invalid ticket key")?,
            None => {
                warn!("No ticket key configured, using an ephemeral key");
                TicketIssuer::ephemeral()
            }
        };

        Self::new(config, Arc::new(trust_store), issuer)
    }

    pub fn config(&self) -> &RavenConfig {
        &self.config
    }

    pub fn trust_store(&self) -> &TrustStore {
        &self.trust_store
    }

    /// Advance one interaction as far as it can go.
    ///
    /// An error is a terminal failure that was not turned into a redirect.
    pub fn authenticate<E: Exchange>(&self, exchange: &mut E) -> Result<AuthState, AuthError> {
        let state = self.resume(exchange);
        if state != AuthState::NoSession {
            return Ok(state);
        }

        let payload = {
            let interaction = exchange.interaction();
            if interaction.is_post() {
                None
            } else {
                interaction.wls_response().map(str::to_string)
            }
        };

        let result = match payload {
            Some(payload) => self.complete(&payload, exchange),
            None => self.start_login(exchange),
        };

        if let Err(ref e) = result {
            warn!(kind = %e.kind(), error = %e, "Raven authentication failed");
        }
        result
    }

    /// URL that starts a WLS login returning to `return_url`.
    pub fn login_url(&self, return_url: &str) -> String {
        self.login_url_at(return_url, Utc::now())
    }

    pub fn login_url_at(&self, return_url: &str, now: DateTime<Utc>) -> String {
        let extra = self.config.request_params();
        let request = AuthRequest::build(
            now,
            return_url,
            extra.iter().map(|(k, v)| (*k, v.as_str())),
        );
        request.to_url(
            &self.config.authenticate_url(),
            self.config.parameter_encoding(),
        )
    }

    /// Check a status-OK response: signature first, then freshness.
    pub fn verify(&self, response: &AuthResponse) -> Result<(), AuthError> {
        if !verify_response(response, &self.trust_store)? {
            warn!(
                principal = ?response.principal(),
                kid = ?response.key_id(),
                "WLS response signature mismatch"
            );
            return Err(AuthError::InvalidSignature);
        }
        self.check_freshness(response, Utc::now())
    }

    /// Ticket for a verified response.
    pub fn ticket_for(&self, response: &AuthResponse) -> Result<SessionTicket, AuthError> {
        let principal = response
            .principal()
            .ok_or(ProtocolError::MissingPrincipal)?;
        let expires = response.expires().ok_or(ProtocolError::MissingLifetime)?;

        Ok(SessionTicket::new(
            principal.to_string(),
            response.issued(),
            expires,
            self.config.persistent_tickets,
        ))
    }

    /// Existing ticket, if valid.
    fn resume<E: Exchange>(&self, exchange: &E) -> AuthState {
        let Some(token) = exchange.read_ticket() else {
            return AuthState::NoSession;
        };

        match self.issuer.load(&token) {
            Ok(ticket) if !ticket.is_expired() => {
                debug!(principal = %ticket.principal, "Resumed session from ticket");
                AuthState::Authenticated {
                    ticket,
                    redirect: None,
                }
            }
            Ok(ticket) => {
                debug!(
                    principal = %ticket.principal,
                    expires_at = %ticket.expires_at,
                    "Session ticket expired"
                );
                AuthState::NoSession
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable session ticket");
                AuthState::NoSession
            }
        }
    }

    fn start_login<E: Exchange>(&self, exchange: &mut E) -> Result<AuthState, AuthError> {
        let url = self.login_url(&exchange.interaction().url);
        exchange.redirect(&url).map_err(AuthError::Exchange)?;

        debug!(redirect = %url, "Redirecting to WLS");
        Ok(AuthState::AwaitingResponse { redirect: url })
    }

    fn complete<E: Exchange>(
        &self,
        payload: &str,
        exchange: &mut E,
    ) -> Result<AuthState, AuthError> {
        let response = AuthResponse::parse(payload)?;

        if !response.status().is_ok() {
            return self.fail(&response, exchange);
        }

        self.verify(&response)?;

        let ticket = self.ticket_for(&response)?;
        let token = self.issuer.issue(&ticket)?;
        exchange
            .write_ticket(&token, &ticket)
            .map_err(AuthError::Exchange)?;

        let redirect = response.url().map(str::to_string);
        if let Some(ref url) = redirect {
            exchange.redirect(url).map_err(AuthError::Exchange)?;
        }

        info!(
            principal = %ticket.principal,
            auth = ?response.auth(),
            expires_at = %ticket.expires_at,
            "Raven authentication successful"
        );

        Ok(AuthState::Authenticated { ticket, redirect })
    }

    fn fail<E: Exchange>(
        &self,
        response: &AuthResponse,
        exchange: &mut E,
    ) -> Result<AuthState, AuthError> {
        let status = response.status();
        let code = response.status_code();

        let Some(ref error_url) = self.config.error_url else {
            return Err(AuthError::Status {
                status,
                code,
                message: response.message().map(str::to_string),
            });
        };

        let url = format!("{}{}", error_url, code);
        exchange.redirect(&url).map_err(AuthError::Exchange)?;

        info!(
            status = %status,
            code,
            message = ?response.message(),
            "WLS reported failure, redirecting to error page"
        );
        Ok(AuthState::Failed {
            status,
            code,
            redirect: url,
        })
    }

    fn check_freshness(
        &self,
        response: &AuthResponse,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let Some(max_age) = self.config.max_response_age_secs else {
            return Ok(());
        };

        let skew = self.config.clock_skew_secs;
        let limit = i64::try_from(max_age)
            .unwrap_or(i64::MAX)
            .saturating_add(skew);
        let age = (now - response.issued()).num_seconds();

        if age > limit || age < -skew {
            return Err(AuthError::StaleResponse {
                issued: format_time(response.issued()),
            });
        }
        Ok(())
    }
}
