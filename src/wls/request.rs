//! Outbound authentication requests.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::status::ProtocolVersion;
use super::time::format_time;

/// Optional parameters a caller may add to a request.
pub const OPTIONAL_PARAMS: &[&str] = &["desc", "aauth", "iact", "msg", "params", "fail"];

/// How parameter values are written into the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterEncoding {
    /// Percent-encode every value.
    #[default]
    Percent,
    /// Insert values as-is, byte for byte compatible with legacy deployments.
    Verbatim,
}

/// An authentication request, parameters kept in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    params: Vec<(String, String)>,
}

impl AuthRequest {
    /// Start a request dated now.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Start a request with an explicit `date`.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            params: vec![
                ("ver".to_string(), ProtocolVersion::LATEST.number().to_string()),
                ("date".to_string(), format_time(now)),
            ],
        }
    }

    /// Build a request returning to `return_url`, adding recognized extras
    /// in the order given. Reserved or unknown names are skipped.
    pub fn build<'a, I>(now: DateTime<Utc>, return_url: &str, extra: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut request = Self::at(now);
        request.set("url", return_url);

        for (key, value) in extra {
            if OPTIONAL_PARAMS.contains(&key) {
                request.set(key, value);
            } else {
                warn!(param = %key, "Skipping unsupported WLS request parameter");
            }
        }

        request
    }

    /// Set a parameter. An existing key keeps its position.
    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.params.push((key.to_string(), value.to_string())),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize as `?k1=v1&k2=v2...`.
    pub fn to_query_string(&self, encoding: ParameterEncoding) -> String {
        let mut query = String::new();

        for (i, (key, value)) in self.params.iter().enumerate() {
            query.push(if i == 0 { '?' } else { '&' });
            query.push_str(key);
            query.push('=');
            match encoding {
                ParameterEncoding::Percent => query.push_str(&urlencoding::encode(value)),
                ParameterEncoding::Verbatim => query.push_str(value),
            }
        }

        query
    }

    /// Full redirect URL for a WLS authentication page.
    pub fn to_url(&self, authenticate_url: &str, encoding: ParameterEncoding) -> String {
        let url = format!("{}{}", authenticate_url, self.to_query_string(encoding));
        debug!(url = %url, "Created WLS authentication request");
        url
    }
}

impl Default for AuthRequest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_base_params() {
        let request = AuthRequest::at(fixed_now());
        assert_eq!(request.get("ver"), Some("3"));
        assert_eq!(request.get("date"), Some("20240115T093000Z"));
        assert_eq!(
            request.to_query_string(ParameterEncoding::Verbatim),
            "?ver=3&date=20240115T093000Z"
        );
    }

    #[test]
    fn test_build_keeps_insertion_order() {
        let request = AuthRequest::build(
            fixed_now(),
            "https://example.org/return",
            [("desc", "Example site"), ("aauth", "pwd")],
        );
        assert_eq!(
            request.to_query_string(ParameterEncoding::Verbatim),
            "?ver=3&date=20240115T093000Z&url=https://example.org/return&desc=Example site&aauth=pwd"
        );
    }

    #[test]
    fn test_percent_encoding() {
        let request = AuthRequest::build(
            fixed_now(),
            "https://example.org/return?a=1&b=2",
            [("desc", "Example site")],
        );
        assert_eq!(
            request.to_query_string(ParameterEncoding::Percent),
            "?ver=3&date=20240115T093000Z&url=https%3A%2F%2Fexample.org%2Freturn%3Fa%3D1%26b%3D2&desc=Example%20site"
        );
    }

    #[test]
    fn test_reserved_and_unknown_extras_skipped() {
        let request = AuthRequest::build(
            fixed_now(),
            "https://example.org/",
            [("ver", "1"), ("url", "https://evil.example/"), ("bogus", "x")],
        );
        assert_eq!(request.get("ver"), Some("3"));
        assert_eq!(request.get("url"), Some("https://example.org/"));
        assert_eq!(request.get("bogus"), None);
        assert_eq!(request.params().count(), 3);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut request = AuthRequest::at(fixed_now());
        request.set("url", "https://a.example/").set("desc", "d");
        request.set("url", "https://b.example/");
        let keys: Vec<&str> = request.params().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["ver", "date", "url", "desc"]);
        assert_eq!(request.get("url"), Some("https://b.example/"));
    }

    #[test]
    fn test_to_url() {
        let request = AuthRequest::build(fixed_now(), "https://example.org/", []);
        let url = request.to_url(
            "https://raven.cam.ac.uk/auth/authenticate.html",
            ParameterEncoding::Verbatim,
        );
        assert_eq!(
            url,
            "https://raven.cam.ac.uk/auth/authenticate.html?ver=3&date=20240115T093000Z&url=https://example.org/"
        );
    }
}
