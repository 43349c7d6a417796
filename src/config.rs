//! Runtime configuration read from the environment at startup.
//!
//! The token-signing secret is provisioned externally and injected into the
//! verifier at construction; there is no compiled-in default for it.

use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Session handles and bearer credentials both live for 7 days.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    /// Shared secret for signing/verifying bearer credentials.
    pub token_secret: String,
    pub session_ttl: Duration,
    pub token_ttl: Duration,
}

impl Config {
    /// Build configuration from `PROJEKTOR_*` environment variables.
    /// `PROJEKTOR_TOKEN_SECRET` is mandatory; the port defaults to 3000.
    pub fn from_env() -> Result<Self> {
        let http_port = match std::env::var("PROJEKTOR_HTTP_PORT") {
            Ok(v) => v.parse::<u16>().with_context(|| format!("invalid PROJEKTOR_HTTP_PORT: {}", v))?,
            Err(_) => 3000,
        };
        let token_secret = match std::env::var("PROJEKTOR_TOKEN_SECRET") {
            Ok(v) if !v.trim().is_empty() => v,
            _ => bail!("PROJEKTOR_TOKEN_SECRET must be set to a non-empty value"),
        };
        Ok(Self { http_port, token_secret, session_ttl: DEFAULT_TTL, token_ttl: DEFAULT_TTL })
    }
}
