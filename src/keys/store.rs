//! Trust store of WLS verification keys.
//!
//! Loaded once from a directory of `pubkey<id>.<ext>` certificates and
//! read-only afterwards, so it can be shared across threads without locking.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ring::signature::{RsaPublicKeyComponents, RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

use crate::error::TrustStoreError;

/// File name prefix of WLS key certificates.
pub const KEY_FILE_PREFIX: &str = "pubkey";

/// Default certificate file extension.
pub const DEFAULT_CERT_EXTENSION: &str = "crt";

const MIN_RSA_BITS: usize = 1024;
const MAX_RSA_BITS: usize = 8192;

/// An RSA public key taken from a WLS certificate.
#[derive(Debug, Clone)]
pub struct VerificationKey {
    /// Modulus, big-endian, no leading zeros.
    n: Vec<u8>,
    /// Public exponent, big-endian, no leading zeros.
    e: Vec<u8>,
    bits: usize,
    subject_dn: String,
    /// Not valid after (Unix timestamp).
    not_after: i64,
}

impl VerificationKey {
    /// Parse a PEM or DER X.509 certificate holding an RSA key.
    pub fn from_certificate(data: &[u8]) -> Result<Self, String> {
        let der = decode_cert_data(data)?;

        let (_, cert) = X509Certificate::from_der(&der)
            .map_err(|e| format!("failed to parse X.509 certificate: {:?}", e))?;

        let rsa = match cert.public_key().parsed() {
            Ok(PublicKey::RSA(rsa)) => rsa,
            Ok(_) => return Err("certificate does not hold an RSA key".to_string()),
            Err(e) => return Err(format!("failed to parse public key: {:?}", e)),
        };

        let bits = rsa.key_size();
        if !(MIN_RSA_BITS..=MAX_RSA_BITS).contains(&bits) {
            return Err(format!("unsupported RSA key size {} bits", bits));
        }

        Ok(Self {
            n: strip_leading_zeros(rsa.modulus).to_vec(),
            e: strip_leading_zeros(rsa.exponent).to_vec(),
            bits,
            subject_dn: cert.subject().to_string(),
            not_after: cert.validity().not_after.timestamp(),
        })
    }

    /// RSASSA-PKCS1-v1_5 with SHA-1 over `message`. A mismatch is `false`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let key = RsaPublicKeyComponents {
            n: &self.n,
            e: &self.e,
        };
        key.verify(&RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY, message, signature)
            .is_ok()
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    pub fn subject_dn(&self) -> &str {
        &self.subject_dn
    }

    pub fn not_after(&self) -> i64 {
        self.not_after
    }
}

/// Immutable map from key name (e.g. `pubkey2`) to verification key.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    keys: HashMap<String, VerificationKey>,
}

impl TrustStore {
    /// A store with no keys. Every verification against it fails with
    /// an unknown-key error.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load every `pubkey*.crt` file in `dir`.
    pub fn load(dir: &Path) -> Result<Self, TrustStoreError> {
        Self::load_with_extension(dir, DEFAULT_CERT_EXTENSION)
    }

    /// Load every `pubkey*.<extension>` file in `dir`, keyed by file stem.
    pub fn load_with_extension(dir: &Path, extension: &str) -> Result<Self, TrustStoreError> {
        let unreadable = |source| TrustStoreError::Unreadable {
            path: dir.to_path_buf(),
            source,
        };

        let mut keys = HashMap::new();
        for entry in std::fs::read_dir(dir).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();
            let Some(name) = key_name(&path, extension) else {
                continue;
            };

            let data = std::fs::read(&path).map_err(|source| TrustStoreError::Unreadable {
                path: path.clone(),
                source,
            })?;
            let key = VerificationKey::from_certificate(&data).map_err(|reason| {
                TrustStoreError::InvalidCertificate {
                    path: path.clone(),
                    reason,
                }
            })?;

            debug!(
                key = %name,
                subject_dn = %key.subject_dn,
                bits = key.bits,
                "Loaded WLS verification key"
            );
            keys.insert(name, key);
        }

        info!(dir = %dir.display(), keys = keys.len(), "WLS trust store loaded");
        Ok(Self { keys })
    }

    /// Build a store from in-memory certificates.
    pub fn from_certificates<I, K, D>(certs: I) -> Result<Self, TrustStoreError>
    where
        I: IntoIterator<Item = (K, D)>,
        K: Into<String>,
        D: AsRef<[u8]>,
    {
        let mut keys = HashMap::new();
        for (name, data) in certs {
            let name = name.into();
            let key = VerificationKey::from_certificate(data.as_ref()).map_err(|reason| {
                TrustStoreError::InvalidCertificate {
                    path: PathBuf::from(&name),
                    reason,
                }
            })?;
            keys.insert(name, key);
        }
        Ok(Self { keys })
    }

    pub fn lookup(&self, name: &str) -> Option<&VerificationKey> {
        self.keys.get(name)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Loaded key names, sorted.
    pub fn key_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Store key for a certificate path, if it follows the naming convention.
fn key_name(path: &Path, extension: &str) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    let ext = path.extension()?.to_str()?;
    if !ext.eq_ignore_ascii_case(extension) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.starts_with(KEY_FILE_PREFIX).then(|| stem.to_string())
}

/// Certificate bytes as DER, accepting PEM.
fn decode_cert_data(data: &[u8]) -> Result<Vec<u8>, String> {
    const START_MARKER: &str = "-----BEGIN CERTIFICATE-----";
    const END_MARKER: &str = "-----END CERTIFICATE-----";

    let text = match std::str::from_utf8(data) {
        Ok(text) if text.contains(START_MARKER) => text,
        _ => return Ok(data.to_vec()),
    };

    let start = text
        .find(START_MARKER)
        .ok_or_else(|| "invalid PEM: missing BEGIN marker".to_string())?;
    let end = text
        .find(END_MARKER)
        .filter(|&end| end > start)
        .ok_or_else(|| "invalid PEM: missing END marker".to_string())?;

    let base64_content: String = text[start + START_MARKER.len()..end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    BASE64
        .decode(&base64_content)
        .map_err(|e| format!("failed to decode PEM base64 content: {}", e))
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBKEY2_PEM: &[u8] = include_bytes!("../../tests/fixtures/pubkey2.crt");
    const PUBKEY3_DER: &[u8] = include_bytes!("../../tests/fixtures/pubkey3.crt");

    #[test]
    fn test_parse_pem_certificate() {
        let key = VerificationKey::from_certificate(PUBKEY2_PEM).unwrap();
        assert_eq!(key.bits(), 2048);
        assert!(key.subject_dn().contains("Test WLS Key 2"));
        assert!(key.not_after() > 0);
        assert_ne!(key.n[0], 0);
    }

    #[test]
    fn test_parse_der_certificate() {
        let der = VerificationKey::from_certificate(PUBKEY3_DER).unwrap();
        let pem = VerificationKey::from_certificate(PUBKEY2_PEM).unwrap();
        assert_eq!(der.n, pem.n);
        assert_eq!(der.e, pem.e);
    }

    #[test]
    fn test_reject_garbage() {
        assert!(VerificationKey::from_certificate(b"not a certificate").is_err());
        assert!(VerificationKey::from_certificate(
            b"-----BEGIN CERTIFICATE-----\n!!!!\n-----END CERTIFICATE-----"
        )
        .is_err());
        assert!(VerificationKey::from_certificate(b"-----BEGIN CERTIFICATE-----\nAAAA").is_err());
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pubkey2.crt"), PUBKEY2_PEM).unwrap();
        std::fs::write(dir.path().join("pubkey3.crt"), PUBKEY3_DER).unwrap();
        // Ignored: wrong prefix, wrong extension
        std::fs::write(dir.path().join("other.crt"), b"junk").unwrap();
        std::fs::write(dir.path().join("pubkey4.txt"), b"junk").unwrap();

        let store = TrustStore::load(dir.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.key_names(), vec!["pubkey2", "pubkey3"]);
        assert!(store.lookup("pubkey2").is_some());
        assert!(store.lookup("pubkey4").is_none());
    }

    #[test]
    fn test_load_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = TrustStore::load(dir.path()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_custom_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pubkey2.pem"), PUBKEY2_PEM).unwrap();
        std::fs::write(dir.path().join("pubkey3.crt"), PUBKEY3_DER).unwrap();

        let store = TrustStore::load_with_extension(dir.path(), "pem").unwrap();
        assert_eq!(store.key_names(), vec!["pubkey2"]);
    }

    #[test]
    fn test_load_invalid_certificate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pubkey9.crt"), b"junk").unwrap();

        let err = TrustStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, TrustStoreError::InvalidCertificate { .. }));
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = TrustStore::load(&missing).unwrap_err();
        assert!(matches!(err, TrustStoreError::Unreadable { .. }));
    }

    #[test]
    fn test_from_certificates() {
        let store = TrustStore::from_certificates([("pubkey2", PUBKEY2_PEM)]).unwrap();
        assert_eq!(store.len(), 1);
        assert!(TrustStore::from_certificates([("pubkey2", &b"junk"[..])]).is_err());
    }

    #[test]
    fn test_strip_leading_zeros() {
        assert_eq!(strip_leading_zeros(&[0, 0, 1, 0]), &[1, 0]);
        assert_eq!(strip_leading_zeros(&[1]), &[1]);
        assert_eq!(strip_leading_zeros(&[0]), &[] as &[u8]);
    }
}
