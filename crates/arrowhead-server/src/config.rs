//! Engine configuration.
//!
//! Configuration is built in code with [`EngineConfig::builder`] or read
//! from TOML with [`EngineConfig::from_toml_str`]; absent keys take their
//! defaults.
//!
//! # Example
//!
//! ```rust
//! use arrowhead_server::EngineConfig;
//! use std::time::Duration;
//!
//! let config = EngineConfig::builder()
//!     .http_addr("127.0.0.1:8443")
//!     .max_body_size(Some(64 * 1024))
//!     .shutdown_timeout(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(config.http_addr(), "127.0.0.1:8443");
//!
//! let parsed = EngineConfig::from_toml_str(
//!     r#"
//!     provider_name = "warehouse"
//!     max_body_size = 1024
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(parsed.max_body_size(), Some(1024));
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default name the engine presents to access policies.
pub const DEFAULT_PROVIDER_NAME: &str = "arrowhead";

/// Default request body limit (2 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document does not parse or has mistyped values.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not usable.
    #[error("invalid configuration value `{key}`: {reason}")]
    Invalid {
        /// The offending key.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Engine and transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Name of this provider system, as seen by access policies.
    provider_name: String,

    /// HTTP bind address.
    http_addr: String,

    /// How long to wait for in-flight connections on shutdown.
    shutdown_timeout_secs: u64,

    /// Largest accepted request body; `None` for no limit.
    ///
    /// In TOML, `max_body_size = 0` lifts the limit.
    #[serde(deserialize_with = "body_limit")]
    max_body_size: Option<usize>,

    /// Whether fallback responses for internal failures carry the failure
    /// message instead of a generic one.
    expose_failure_messages: bool,

    /// Body of not-found responses; empty when unset.
    not_found_message: Option<String>,
}

impl EngineConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents and
    /// [`ConfigError::Invalid`] for unusable values.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values the type system cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "provider_name",
                reason: "must not be empty".to_string(),
            });
        }
        if let Err(e) = self.socket_addr() {
            return Err(ConfigError::Invalid {
                key: "http_addr",
                reason: e.to_string(),
            });
        }
        if self.max_body_size == Some(0) {
            return Err(ConfigError::Invalid {
                key: "max_body_size",
                reason: "must be positive; use `None` for no limit".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the provider name.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Returns the HTTP bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the HTTP bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Returns the request body limit.
    #[must_use]
    pub const fn max_body_size(&self) -> Option<usize> {
        self.max_body_size
    }

    /// Returns whether internal failure messages reach consumers.
    #[must_use]
    pub const fn expose_failure_messages(&self) -> bool {
        self.expose_failure_messages
    }

    /// Returns the not-found body, if configured.
    #[must_use]
    pub fn not_found_message(&self) -> Option<&str> {
        self.not_found_message.as_deref()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider_name: DEFAULT_PROVIDER_NAME.to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            max_body_size: Some(DEFAULT_MAX_BODY_SIZE),
            expose_failure_messages: false,
            not_found_message: None,
        }
    }
}

fn body_limit<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    let limit = usize::deserialize(deserializer)?;
    Ok((limit > 0).then_some(limit))
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Sets the provider name.
    #[must_use]
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    /// Sets the HTTP bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.http_addr = addr.into();
        self
    }

    /// Sets the graceful shutdown timeout, truncated to whole seconds.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the request body limit; `None` accepts bodies of any size.
    #[must_use]
    pub fn max_body_size(mut self, limit: Option<usize>) -> Self {
        self.config.max_body_size = limit;
        self
    }

    /// Sets whether internal failure messages reach consumers.
    #[must_use]
    pub fn expose_failure_messages(mut self, expose: bool) -> Self {
        self.config.expose_failure_messages = expose;
        self
    }

    /// Sets the not-found body.
    #[must_use]
    pub fn not_found_message(mut self, message: impl Into<String>) -> Self {
        self.config.not_found_message = Some(message.into());
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> EngineConfig {
        self.config
    }
}
