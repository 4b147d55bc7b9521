//! Raven WLS protocol codecs.
//!
//! Builds authentication requests and parses the signed `WLS-Response`
//! payload the identity provider sends back.

pub mod request;
pub mod response;
pub mod signature;
pub mod status;
pub mod time;

pub use request::{AuthRequest, ParameterEncoding};
pub use response::AuthResponse;
pub use signature::{decode_signature, encode_signature};
pub use status::{ProtocolVersion, StatusCode};
pub use time::{format_time, parse_time};

/// Query parameter carrying the response on the return leg.
pub const WLS_RESPONSE_PARAM: &str = "WLS-Response";

/// Authentication page, relative to the WLS base URL.
pub const AUTHENTICATE_PAGE: &str = "authenticate.html";

/// Logout page, relative to the WLS base URL.
pub const LOGOUT_PAGE: &str = "logout.html";

/// Default WLS base URL.
pub const DEFAULT_BASE_URL: &str = "https://raven.cam.ac.uk/auth/";
