//! Ticketgate configuration.
//!
//! Everything the core needs from the outside world (secrets, gateway
//! environment, public URLs) lives in [`TicketgateConfig`]. Components get it
//! injected; nothing below the service binary reads the process environment.

use crate::TicketgateError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default identity token validity window.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Default listen address for the service binary.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// A secret string whose `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the secret. Never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the secret is empty (i.e. unavailable).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Payment gateway environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatewayEnvironment {
    /// Sandbox, no real money moves.
    #[default]
    Sandbox,
    /// Production.
    Production,
}

impl GatewayEnvironment {
    /// Base URL of the Snap payment-session API for this environment.
    pub fn snap_base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://app.sandbox.midtrans.com",
            Self::Production => "https://app.midtrans.com",
        }
    }

    fn parse(value: &str) -> Result<Self, TicketgateError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "development" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            other => Err(TicketgateError::ConfigError(format!(
                "MIDTRANS_ENV must be sandbox or production, got {other}"
            ))),
        }
    }
}

/// Configuration for the access-control and settlement core.
#[derive(Debug, Clone)]
pub struct TicketgateConfig {
    /// HMAC key for identity tokens.
    pub token_secret: Secret,

    /// `iss` claim written into and required from identity tokens.
    pub token_issuer: String,

    /// Validity window of an identity token.
    pub token_ttl: Duration,

    /// Payment gateway server key. Used for webhook signatures and
    /// outbound API authentication.
    pub gateway_server_key: Secret,

    /// Which gateway environment to talk to.
    pub gateway_environment: GatewayEnvironment,

    /// Public base URL used to build artifact links (no trailing slash needed).
    pub public_base_url: String,

    /// Directory rendered artifacts are written to.
    pub artifact_dir: PathBuf,

    /// Listen address for the service binary.
    pub bind_addr: String,
}

impl TicketgateConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, TicketgateError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Required: `JWT_SECRET`, `JWT_ISSUER`, `MIDTRANS_SERVER_KEY`, `PUBLIC_BASE_URL`.
    /// Optional: `TOKEN_TTL_SECS`, `MIDTRANS_ENV`, `ARTIFACT_DIR`, `BIND_ADDR`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TicketgateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| TicketgateError::ConfigError(format!("{key} is not set")))
        };

        let token_ttl = match lookup("TOKEN_TTL_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse().map_err(|e| {
                TicketgateError::ConfigError(format!("TOKEN_TTL_SECS is not a number: {e}"))
            })?),
            None => DEFAULT_TOKEN_TTL,
        };

        let gateway_environment = match lookup("MIDTRANS_ENV") {
            Some(raw) => GatewayEnvironment::parse(&raw)?,
            None => GatewayEnvironment::default(),
        };

        let artifact_dir = match lookup("ARTIFACT_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_artifact_dir()?,
        };

        let config = Self {
            token_secret: Secret::new(required("JWT_SECRET")?),
            token_issuer: required("JWT_ISSUER")?,
            token_ttl,
            gateway_server_key: Secret::new(required("MIDTRANS_SERVER_KEY")?),
            gateway_environment,
            public_base_url: required("PUBLIC_BASE_URL")?,
            artifact_dir,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), TicketgateError> {
        if self.token_secret.is_empty() {
            return Err(TicketgateError::ConfigError(
                "token secret cannot be empty".to_string(),
            ));
        }
        if self.token_issuer.is_empty() {
            return Err(TicketgateError::ConfigError(
                "token issuer cannot be empty".to_string(),
            ));
        }
        if self.token_ttl.is_zero() {
            return Err(TicketgateError::ConfigError(
                "token ttl must be positive".to_string(),
            ));
        }
        if self.gateway_server_key.is_empty() {
            return Err(TicketgateError::ConfigError(
                "gateway server key cannot be empty".to_string(),
            ));
        }
        if !(self.public_base_url.starts_with("http://")
            || self.public_base_url.starts_with("https://"))
        {
            return Err(TicketgateError::ConfigError(format!(
                "public base url must be http(s), got {}",
                self.public_base_url
            )));
        }
        Ok(())
    }
}

/// `dirs::data_dir()/ticketgate/artifacts`.
fn default_artifact_dir() -> Result<PathBuf, TicketgateError> {
    dirs::data_dir()
        .map(|base| base.join("ticketgate").join("artifacts"))
        .ok_or_else(|| {
            TicketgateError::ConfigError("Could not find data directory for artifacts".to_string())
        })
}
