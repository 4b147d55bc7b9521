//! Boundary between the authenticator and the hosting web stack.

use std::collections::HashMap;

use crate::ticket::SessionTicket;
use crate::wls::WLS_RESPONSE_PARAM;

/// The parts of an inbound request the authenticator reads.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    /// HTTP method.
    pub method: String,
    /// Absolute URL of the request, used as the WLS return URL.
    pub url: String,
    /// Decoded query parameters.
    pub query: HashMap<String, String>,
}

impl Interaction {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            query: HashMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn is_post(&self) -> bool {
        self.method.eq_ignore_ascii_case("POST")
    }

    /// The `WLS-Response` parameter, if present and not blank.
    pub fn wls_response(&self) -> Option<&str> {
        self.query
            .get(WLS_RESPONSE_PARAM)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Request/response plumbing implemented by the hosting framework.
///
/// Ticket transport (typically a cookie) is entirely the implementor's
/// concern; the authenticator only hands over and receives opaque tokens.
pub trait Exchange {
    /// The inbound request.
    fn interaction(&self) -> &Interaction;

    /// Send the browser to `url`.
    fn redirect(&mut self, url: &str) -> anyhow::Result<()>;

    /// The ticket token presented with the request, if any.
    fn read_ticket(&self) -> Option<String>;

    /// Hand a freshly issued ticket token to the client.
    fn write_ticket(&mut self, token: &str, ticket: &SessionTicket) -> anyhow::Result<()>;
}
