//! WLS status codes and protocol versions.

/// Status code carried in the second field of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// Any code this client does not know.
    Unknown,
    /// Authenticated. The only signed status.
    Ok,
    /// The user cancelled at the login page.
    Cancelled,
    /// None of the requested `aauth` types is supported.
    AuthTypeUnsupported,
    /// The WLS does not speak the requested protocol version.
    UnsupportedProtocolVersion,
    /// The request had a parameter problem not covered elsewhere.
    RequestParameterError,
    /// `iact=no` was requested but interaction is needed.
    InteractionRequired,
    /// This site is not authorised to use the WLS.
    WaaNotAuthorised,
    /// The WLS declined to authenticate this time.
    AuthenticationDeclined,
}

impl StatusCode {
    /// Map a numeric status. Codes outside the table become `Unknown`.
    pub fn from_code(code: u16) -> Self {
        match code {
            200 => StatusCode::Ok,
            410 => StatusCode::Cancelled,
            510 => StatusCode::AuthTypeUnsupported,
            520 => StatusCode::UnsupportedProtocolVersion,
            530 => StatusCode::RequestParameterError,
            540 => StatusCode::InteractionRequired,
            560 => StatusCode::WaaNotAuthorised,
            570 => StatusCode::AuthenticationDeclined,
            _ => StatusCode::Unknown,
        }
    }

    /// Numeric value of a known status; `Unknown` is 0.
    pub fn code(&self) -> u16 {
        match self {
            StatusCode::Unknown => 0,
            StatusCode::Ok => 200,
            StatusCode::Cancelled => 410,
            StatusCode::AuthTypeUnsupported => 510,
            StatusCode::UnsupportedProtocolVersion => 520,
            StatusCode::RequestParameterError => 530,
            StatusCode::InteractionRequired => 540,
            StatusCode::WaaNotAuthorised => 560,
            StatusCode::AuthenticationDeclined => 570,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, StatusCode::Ok)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusCode::Unknown => write!(f, "unknown"),
            StatusCode::Ok => write!(f, "ok"),
            StatusCode::Cancelled => write!(f, "cancelled"),
            StatusCode::AuthTypeUnsupported => write!(f, "auth_type_unsupported"),
            StatusCode::UnsupportedProtocolVersion => write!(f, "unsupported_protocol_version"),
            StatusCode::RequestParameterError => write!(f, "request_parameter_error"),
            StatusCode::InteractionRequired => write!(f, "interaction_required"),
            StatusCode::WaaNotAuthorised => write!(f, "waa_not_authorised"),
            StatusCode::AuthenticationDeclined => write!(f, "authentication_declined"),
        }
    }
}

/// WLS protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProtocolVersion {
    V1,
    V2,
    V3,
}

impl ProtocolVersion {
    /// Highest version this client understands; also the one it requests.
    pub const LATEST: ProtocolVersion = ProtocolVersion::V3;

    pub fn from_number(n: u32) -> Option<Self> {
        match n {
            1 => Some(ProtocolVersion::V1),
            2 => Some(ProtocolVersion::V2),
            3 => Some(ProtocolVersion::V3),
            _ => None,
        }
    }

    pub fn number(&self) -> u32 {
        match self {
            ProtocolVersion::V1 => 1,
            ProtocolVersion::V2 => 2,
            ProtocolVersion::V3 => 3,
        }
    }

    /// `ptags` only exists from version 3 on.
    pub fn has_ptags(&self) -> bool {
        *self >= ProtocolVersion::V3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        for code in [200, 410, 510, 520, 530, 540, 560, 570] {
            let status = StatusCode::from_code(code);
            assert_ne!(status, StatusCode::Unknown);
            assert_eq!(status.code(), code);
        }
        assert_eq!(StatusCode::from_code(0), StatusCode::Unknown);
        assert_eq!(StatusCode::from_code(404), StatusCode::Unknown);
        assert!(StatusCode::Ok.is_ok());
        assert!(!StatusCode::Cancelled.is_ok());
    }

    #[test]
    fn test_versions() {
        assert_eq!(ProtocolVersion::from_number(3), Some(ProtocolVersion::LATEST));
        assert_eq!(ProtocolVersion::from_number(0), None);
        assert_eq!(ProtocolVersion::from_number(4), None);
        assert!(ProtocolVersion::V3.has_ptags());
        assert!(!ProtocolVersion::V2.has_ptags());
    }
}
