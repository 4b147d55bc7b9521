//! Raven client configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::keys::store::DEFAULT_CERT_EXTENSION;
use crate::ticket::issuer::TICKET_KEY_LEN;
use crate::wls::{ParameterEncoding, AUTHENTICATE_PAGE, DEFAULT_BASE_URL, LOGOUT_PAGE};

/// Raven WLS client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RavenConfig {
    /// WLS base URL, ending in `/`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Directory holding `pubkey<id>.<ext>` certificates.
    #[serde(default = "default_certificate_path")]
    pub certificate_path: PathBuf,

    /// Extension of certificate files.
    #[serde(default = "default_certificate_extension")]
    pub certificate_extension: String,

    /// Base URL for failed logins; the numeric status is appended.
    #[serde(default)]
    pub error_url: Option<String>,

    /// Site description shown on the login page (`desc`).
    #[serde(default)]
    pub description: Option<String>,

    /// Acceptable authentication types (`aauth`), e.g. "pwd".
    #[serde(default)]
    pub aauth: Option<String>,

    /// Whether the WLS may interact with the user (`iact`).
    #[serde(default)]
    pub interact: Option<bool>,

    /// Ask the WLS to handle failures itself (`fail=yes`).
    #[serde(default)]
    pub fail_at_wls: bool,

    /// Percent-encode request parameter values.
    #[serde(default = "default_true")]
    pub encode_request_values: bool,

    /// Hex-encoded 32-byte ticket key. Random per process when unset.
    #[serde(default)]
    pub ticket_key: Option<String>,

    /// Mark issued tickets persistent.
    #[serde(default)]
    pub persistent_tickets: bool,

    /// Reject responses issued longer ago than this.
    #[serde(default)]
    pub max_response_age_secs: Option<u64>,

    /// Clock skew tolerance in seconds.
    #[serde(default = "default_clock_skew")]
    pub clock_skew_secs: i64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_certificate_path() -> PathBuf {
    PathBuf::from("/etc/zentinel-auth/raven")
}

fn default_certificate_extension() -> String {
    DEFAULT_CERT_EXTENSION.to_string()
}

fn default_true() -> bool {
    true
}

fn default_clock_skew() -> i64 {
    60
}

impl Default for RavenConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            certificate_path: default_certificate_path(),
            certificate_extension: default_certificate_extension(),
            error_url: None,
            description: None,
            aauth: None,
            interact: None,
            fail_at_wls: false,
            encode_request_values: true,
            ticket_key: None,
            persistent_tickets: false,
            max_response_age_secs: None,
            clock_skew_secs: default_clock_skew(),
        }
    }
}

impl RavenConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err("Raven base_url must be an http(s) URL".to_string());
        }

        if !self.base_url.ends_with('/') {
            return Err("Raven base_url must end with '/'".to_string());
        }

        if self.certificate_extension.is_empty() {
            return Err("Raven certificate_extension must not be empty".to_string());
        }

        if matches!(self.error_url.as_deref(), Some(url) if url.trim().is_empty()) {
            return Err("Raven error_url must not be empty when set".to_string());
        }

        if let Some(ref key) = self.ticket_key {
            let key = key.trim();
            if key.len() != TICKET_KEY_LEN * 2 || !key.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(format!(
                    "Raven ticket_key must be {} hex characters",
                    TICKET_KEY_LEN * 2
                ));
            }
        }

        if self.clock_skew_secs < 0 {
            return Err("Raven clock_skew_secs must not be negative".to_string());
        }

        Ok(())
    }

    /// URL of the WLS authentication page.
    pub fn authenticate_url(&self) -> String {
        format!("{}{}", self.base_url, AUTHENTICATE_PAGE)
    }

    /// URL of the WLS logout page.
    pub fn logout_url(&self) -> String {
        format!("{}{}", self.base_url, LOGOUT_PAGE)
    }

    pub fn parameter_encoding(&self) -> ParameterEncoding {
        if self.encode_request_values {
            ParameterEncoding::Percent
        } else {
            ParameterEncoding::Verbatim
        }
    }

    /// Optional request parameters implied by this configuration.
    pub fn request_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref desc) = self.description {
            params.push(("desc", desc.clone()));
        }
        if let Some(ref aauth) = self.aauth {
            params.push(("aauth", aauth.clone()));
        }
        if let Some(interact) = self.interact {
            params.push(("iact", if interact { "yes" } else { "no" }.to_string()));
        }
        if self.fail_at_wls {
            params.push(("fail", "yes".to_string()));
        }
        params
    }
}

/// JSON configuration overlay, e.g. from a config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RavenConfigJson {
    pub base_url: Option<String>,
    pub certificate_path: Option<PathBuf>,
    pub certificate_extension: Option<String>,
    pub error_url: Option<String>,
    pub description: Option<String>,
    pub aauth: Option<String>,
    pub interact: Option<bool>,
    pub fail_at_wls: Option<bool>,
    pub encode_request_values: Option<bool>,
    pub ticket_key: Option<String>,
    pub persistent_tickets: Option<bool>,
    pub max_response_age_secs: Option<u64>,
    pub clock_skew_secs: Option<i64>,
}

impl RavenConfigJson {
    /// Read an overlay from a JSON file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        serde_json::from_str(&data).with_context(|| format!("Failed to parse config: {:?}", path))
    }

    /// Merge JSON config into existing config.
    pub fn apply_to(&self, config: &mut RavenConfig) {
        if let Some(ref url) = self.base_url {
            config.base_url = url.clone();
        }
        if let Some(ref path) = self.certificate_path {
            config.certificate_path = path.clone();
        }
        if let Some(ref ext) = self.certificate_extension {
            config.certificate_extension = ext.clone();
        }
        if let Some(ref url) = self.error_url {
            config.error_url = Some(url.clone());
        }
        if let Some(ref desc) = self.description {
            config.description = Some(desc.clone());
        }
        if let Some(ref aauth) = self.aauth {
            config.aauth = Some(aauth.clone());
        }
        if let Some(interact) = self.interact {
            config.interact = Some(interact);
        }
        if let Some(fail) = self.fail_at_wls {
            config.fail_at_wls = fail;
        }
        if let Some(encode) = self.encode_request_values {
            config.encode_request_values = encode;
        }
        if let Some(ref key) = self.ticket_key {
            config.ticket_key = Some(key.clone());
        }
        if let Some(persistent) = self.persistent_tickets {
            config.persistent_tickets = persistent;
        }
        if let Some(age) = self.max_response_age_secs {
            config.max_response_age_secs = Some(age);
        }
        if let Some(skew) = self.clock_skew_secs {
            config.clock_skew_secs = skew;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RavenConfig::default();
        assert_eq!(config.base_url, "https://raven.cam.ac.uk/auth/");
        assert_eq!(config.certificate_extension, "crt");
        assert!(config.error_url.is_none());
        assert!(config.encode_request_values);
        assert!(!config.persistent_tickets);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_derived_urls() {
        let config = RavenConfig::default();
        assert_eq!(
            config.authenticate_url(),
            "https://raven.cam.ac.uk/auth/authenticate.html"
        );
        assert_eq!(config.logout_url(), "https://raven.cam.ac.uk/auth/logout.html");
    }

    #[test]
    fn test_validation() {
        let mut config = RavenConfig::default();

        config.base_url = "raven.cam.ac.uk/auth/".to_string();
        assert!(config.validate().is_err());

        config.base_url = "https://raven.cam.ac.uk/auth".to_string();
        assert!(config.validate().is_err());

        config.base_url = "https://demo.raven.cam.ac.uk/auth/".to_string();
        assert!(config.validate().is_ok());

        config.error_url = Some("  ".to_string());
        assert!(config.validate().is_err());
        config.error_url = Some("https://example.org/error?status=".to_string());
        assert!(config.validate().is_ok());

        config.ticket_key = Some("abcd".to_string());
        assert!(config.validate().is_err());
        config.ticket_key = Some("ab".repeat(32));
        assert!(config.validate().is_ok());

        config.clock_skew_secs = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_request_params() {
        let config = RavenConfig {
            description: Some("Example".to_string()),
            aauth: Some("pwd".to_string()),
            interact: Some(false),
            fail_at_wls: true,
            ..Default::default()
        };
        assert_eq!(
            config.request_params(),
            vec![
                ("desc", "Example".to_string()),
                ("aauth", "pwd".to_string()),
                ("iact", "no".to_string()),
                ("fail", "yes".to_string()),
            ]
        );
        assert!(RavenConfig::default().request_params().is_empty());
    }

    #[test]
    fn test_parameter_encoding() {
        let mut config = RavenConfig::default();
        assert_eq!(config.parameter_encoding(), ParameterEncoding::Percent);
        config.encode_request_values = false;
        assert_eq!(config.parameter_encoding(), ParameterEncoding::Verbatim);
    }

    #[test]
    fn test_json_overlay() {
        let json: RavenConfigJson = serde_json::from_str(
            r#"{
                "base-url": "https://demo.raven.cam.ac.uk/auth/",
                "error-url": "https://example.org/error/",
                "encode-request-values": false,
                "max-response-age-secs": 300
            }"#,
        )
        .unwrap();

        let mut config = RavenConfig::default();
        json.apply_to(&mut config);

        assert_eq!(config.base_url, "https://demo.raven.cam.ac.uk/auth/");
        assert_eq!(config.error_url.as_deref(), Some("https://example.org/error/"));
        assert!(!config.encode_request_values);
        assert_eq!(config.max_response_age_secs, Some(300));
        assert_eq!(config.certificate_extension, "crt");
    }

    #[test]
    fn test_json_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raven.json");
        std::fs::write(&path, r#"{"certificate-path": "/tmp/keys", "persistent-tickets": true}"#)
            .unwrap();

        let json = RavenConfigJson::from_file(&path).unwrap();
        let mut config = RavenConfig::default();
        json.apply_to(&mut config);
        assert_eq!(config.certificate_path, PathBuf::from("/tmp/keys"));
        assert!(config.persistent_tickets);

        assert!(RavenConfigJson::from_file(&dir.path().join("missing.json")).is_err());
    }
}
