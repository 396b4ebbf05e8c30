//! Access policies.
//!
//! The engine asks its [`AccessPolicy`] whether a consumer may use a service
//! before any route runs. Policy decision logic lives outside this crate;
//! [`Unrestricted`] and [`AllowList`] are the reference implementations.

use std::collections::HashSet;

use arrowhead_core::{ConsumerIdentity, ServiceDescriptor};
use arrowhead_future::Future;

/// Decides whether a consumer may use a provided service.
pub trait AccessPolicy: Send + Sync + 'static {
    /// Resolves to `true` if `consumer` may call `service`, which `provider`
    /// offers. `token` is the bearer credential presented with the request,
    /// if any.
    ///
    /// A failed future denies access with the failure as the reason.
    fn is_authorized(
        &self,
        consumer: &ConsumerIdentity,
        provider: &str,
        service: &ServiceDescriptor,
        token: Option<&str>,
    ) -> Future<bool>;
}

/// Allows every consumer, including anonymous ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

impl AccessPolicy for Unrestricted {
    fn is_authorized(
        &self,
        _consumer: &ConsumerIdentity,
        _provider: &str,
        _service: &ServiceDescriptor,
        _token: Option<&str>,
    ) -> Future<bool> {
        Future::success(true)
    }
}

/// Allows authenticated systems whose names are listed.
///
/// Anonymous consumers are always denied.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    systems: HashSet<String>,
}

impl AllowList {
    /// Creates an empty list that denies everyone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a system name.
    #[must_use]
    pub fn allow(mut self, system: impl Into<String>) -> Self {
        self.systems.insert(system.into());
        self
    }

    /// Returns `true` if `consumer` is listed.
    #[must_use]
    pub fn contains(&self, consumer: &ConsumerIdentity) -> bool {
        consumer
            .name()
            .is_some_and(|name| self.systems.contains(name))
    }
}

impl<S: Into<String>> FromIterator<S> for AllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            systems: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl AccessPolicy for AllowList {
    fn is_authorized(
        &self,
        consumer: &ConsumerIdentity,
        _provider: &str,
        _service: &ServiceDescriptor,
        _token: Option<&str>,
    ) -> Future<bool> {
        Future::success(self.contains(consumer))
    }
}
