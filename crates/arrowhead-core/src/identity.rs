//! Consumer identities.
//!
//! The transport establishes who is calling (for example from a verified
//! client certificate) before the request reaches the engine. Certificate
//! parsing happens outside this crate; only its result is modelled here.

use serde::{Deserialize, Serialize};

/// The identity of the system calling a service.
///
/// # Example
///
/// ```rust
/// use arrowhead_core::ConsumerIdentity;
///
/// let identity = ConsumerIdentity::system("billing");
/// assert_eq!(identity.log_id(), "system:billing");
/// assert_eq!(identity.name(), Some("billing"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsumerIdentity {
    /// A system authenticated by its certificate.
    System {
        /// The system name taken from the certificate.
        name: String,
        /// The full distinguished name, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        distinguished_name: Option<String>,
    },
    /// An unauthenticated consumer.
    #[default]
    Anonymous,
}

impl ConsumerIdentity {
    /// Creates a system identity.
    #[must_use]
    pub fn system(name: impl Into<String>) -> Self {
        Self::System {
            name: name.into(),
            distinguished_name: None,
        }
    }

    /// Creates a system identity carrying its distinguished name.
    #[must_use]
    pub fn system_with_dn(name: impl Into<String>, distinguished_name: impl Into<String>) -> Self {
        Self::System {
            name: name.into(),
            distinguished_name: Some(distinguished_name.into()),
        }
    }

    /// Creates an anonymous identity.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self::Anonymous
    }

    /// Returns the system name, if authenticated.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::System { name, .. } => Some(name),
            Self::Anonymous => None,
        }
    }

    /// Returns `true` for an anonymous consumer.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Returns a string identifier suitable for logging.
    ///
    /// Never includes the distinguished name.
    #[must_use]
    pub fn log_id(&self) -> String {
        match self {
            Self::System { name, .. } => format!("system:{name}"),
            Self::Anonymous => "anonymous".to_string(),
        }
    }
}
