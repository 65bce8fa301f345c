//! Configuration loading and validation for the stash service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any variable is missing or invalid.

use std::fmt;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::keys::KeyDerivation;

/// Validated service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Request header carrying the authenticated user id.
    #[serde(default = "default_user_header")]
    pub user_header_name: String,

    /// Field key derivation mode: `keyed` or `legacy`.
    #[serde(default)]
    pub key_derivation: KeyDerivation,

    /// Server-side secret mixed into keyed derivation. **Required** when
    /// `KEY_DERIVATION=keyed`.
    #[serde(default)]
    pub key_derivation_secret: Option<String>,

    /// OTLP endpoint for span export. Logs only when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8080
}
fn default_user_header() -> String {
    "X-User-Id".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.listen_port == 0 {
            anyhow::bail!("LISTEN_PORT must be > 0");
        }
        if self.user_header_name.trim().is_empty() {
            anyhow::bail!("USER_HEADER_NAME must not be empty");
        }
        if axum::http::HeaderName::from_bytes(self.user_header_name.as_bytes()).is_err() {
            anyhow::bail!("USER_HEADER_NAME is not a valid HTTP header name");
        }
        if self.key_derivation == KeyDerivation::Keyed
            && self
                .key_derivation_secret
                .as_deref()
                .map_or(true, |s| s.trim().is_empty())
        {
            anyhow::bail!("KEY_DERIVATION_SECRET is required when KEY_DERIVATION=keyed");
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("listen_port", &self.listen_port)
            .field("user_header_name", &self.user_header_name)
            .field("key_derivation", &self.key_derivation)
            .field(
                "key_derivation_secret",
                &self.key_derivation_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("log_level", &self.log_level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            listen_port: default_listen_port(),
            user_header_name: default_user_header(),
            key_derivation: KeyDerivation::Keyed,
            key_derivation_secret: Some("server-secret".into()),
            otel_exporter_otlp_endpoint: None,
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_listen_port(), 8080);
        assert_eq!(default_user_header(), "X-User-Id");
        assert_eq!(default_log_level(), "info");
        assert_eq!(KeyDerivation::default(), KeyDerivation::Keyed);
    }

    #[test]
    fn validate_accepts_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validate_rejects_keyed_without_secret() {
        let mut cfg = valid();
        cfg.key_derivation_secret = None;
        assert!(cfg.validate().is_err());
        cfg.key_derivation_secret = Some("   ".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn legacy_needs_no_secret() {
        let mut cfg = valid();
        cfg.key_derivation = KeyDerivation::Legacy;
        cfg.key_derivation_secret = None;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_header_name() {
        let mut cfg = valid();
        cfg.user_header_name = "X User Id".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let dbg = format!("{:?}", valid());
        assert!(!dbg.contains("server-secret"));
        assert!(dbg.contains("REDACTED"));
    }
}
