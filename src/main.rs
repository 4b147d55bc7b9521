//! Zentinel Raven Agent
//!
//! Command line front end to the Raven WLS client: prints login and logout
//! URLs, checks `WLS-Response` payloads against the configured keys and
//! lists the keys that were loaded.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use zentinel_agent_raven::wls::format_time;
use zentinel_agent_raven::{
    AuthResponse, Authenticator, RavenConfig, RavenConfigJson, TicketIssuer, TrustStore,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "zentinel-raven-agent")]
#[command(about = "Raven (Cambridge WLS) client for Zentinel")]
struct Args {
    /// JSON configuration file
    #[arg(long, env = "RAVEN_CONFIG")]
    config: Option<PathBuf>,

    /// WLS base URL
    #[arg(long, env = "RAVEN_BASE_URL")]
    base_url: Option<String>,

    /// Directory holding pubkey<id>.crt certificates
    #[arg(long, env = "RAVEN_CERTIFICATE_PATH")]
    certificate_path: Option<PathBuf>,

    /// Error page base URL; the WLS status code is appended
    #[arg(long, env = "RAVEN_ERROR_URL")]
    error_url: Option<String>,

    /// Hex-encoded 32-byte session ticket key
    #[arg(long, env = "RAVEN_TICKET_KEY", hide_env_values = true)]
    ticket_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, env = "RAVEN_VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the WLS login URL for a return URL
    LoginUrl {
        #[arg(long)]
        return_url: String,
    },

    /// Print the WLS logout URL
    LogoutUrl,

    /// Parse and verify a WLS-Response payload
    Verify {
        #[arg(long)]
        response: String,
    },

    /// List loaded verification keys
    Keys,
}

/// JSON summary printed by `verify`.
#[derive(Debug, Serialize)]
struct VerifySummary {
    version: u32,
    status: u16,
    status_text: String,
    issued: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    principal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sso: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ptags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_id: Option<String>,
    verified: bool,
}

impl VerifySummary {
    fn new(response: &AuthResponse, verified: bool) -> Self {
        let owned = |v: Option<&str>| v.map(str::to_string);
        Self {
            version: response.version().number(),
            status: response.status_code(),
            status_text: response.status().to_string(),
            issued: format_time(response.issued()),
            message: owned(response.message()),
            principal: owned(response.principal()),
            auth: owned(response.auth()),
            sso: response.sso().into_iter().map(str::to_string).collect(),
            ptags: response.ptags().into_iter().map(str::to_string).collect(),
            url: owned(response.url()),
            params: owned(response.params()),
            expires: response.expires().map(format_time),
            key_id: owned(response.key_id()),
            verified,
        }
    }
}

impl Args {
    /// Defaults, then the config file, then explicit flags.
    fn build_config(&self) -> Result<RavenConfig> {
        let mut config = RavenConfig::default();

        if let Some(ref path) = self.config {
            RavenConfigJson::from_file(path)?.apply_to(&mut config);
            debug!(path = %path.display(), "Applied config file");
        }

        if let Some(ref url) = self.base_url {
            config.base_url = url.clone();
        }
        if let Some(ref path) = self.certificate_path {
            config.certificate_path = path.clone();
        }
        if let Some(ref url) = self.error_url {
            config.error_url = Some(url.clone());
        }
        if let Some(ref key) = self.ticket_key {
            config.ticket_key = Some(key.clone());
        }

        config.validate().map_err(|e| anyhow!(e))?;
        Ok(config)
    }
}

/// Library target whose events the binary must also let through.
const LIBRARY_TARGET: &str = "zentinel_agent_raven";

fn log_filter(verbose: bool) -> String {
    let log_level = if verbose { "debug" } else { "info" };
    format!(
        "{}={},{}={}",
        env!("CARGO_CRATE_NAME"),
        log_level,
        LIBRARY_TARGET,
        log_level
    )
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.verbose))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = args.build_config()?;

    match args.command {
        Command::LoginUrl { ref return_url } => {
            // URL building needs neither keys nor a ticket key
            let authenticator = Authenticator::new(
                config,
                Arc::new(TrustStore::empty()),
                TicketIssuer::ephemeral(),
            )?;
            println!("{}", authenticator.login_url(return_url));
        }
        Command::LogoutUrl => {
            println!("{}", config.logout_url());
        }
        Command::Verify { ref response } => {
            let authenticator = Authenticator::from_config(config)?;
            verify(&authenticator, response)?;
        }
        Command::Keys => {
            let authenticator = Authenticator::from_config(config)?;
            let store = authenticator.trust_store();
            for name in store.key_names() {
                if let Some(key) = store.lookup(name) {
                    println!("{}\t{} bits\t{}", name, key.bits(), key.subject_dn());
                }
            }
            info!(keys = store.len(), "Listed verification keys");
        }
    }

    Ok(())
}

fn verify(authenticator: &Authenticator, payload: &str) -> Result<()> {
    let response = AuthResponse::parse(payload.trim()).context("Invalid WLS-Response")?;

    if !response.status().is_ok() {
        print_summary(&VerifySummary::new(&response, false))?;
        bail!(
            "WLS reported {} ({})",
            response.status(),
            response.status_code()
        );
    }

    let result = authenticator.verify(&response);
    print_summary(&VerifySummary::new(&response, result.is_ok()))?;
    result.context("WLS-Response failed verification")?;

    Ok(())
}

fn print_summary(summary: &VerifySummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to encode summary")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::EnvFilter;

    #[test]
    fn test_log_filter_covers_library() {
        let filter = log_filter(false);
        assert!(filter.contains("zentinel_raven_agent=info"));
        assert!(filter.contains("zentinel_agent_raven=info"));
        assert!(EnvFilter::try_new(&filter).is_ok());

        let verbose = log_filter(true);
        assert!(verbose.contains("zentinel_raven_agent=debug"));
        assert!(verbose.contains("zentinel_agent_raven=debug"));
    }

    #[test]
    fn test_library_target_matches_crate() {
        // Events are filtered by module path, which starts with the crate name
        assert!(module_path!().starts_with(env!("CARGO_CRATE_NAME")));
        assert_eq!(
            std::any::type_name::<AuthResponse>().split("::").next(),
            Some(LIBRARY_TARGET)
        );
    }
}
