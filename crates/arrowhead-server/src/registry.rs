//! Service registry hooks.
//!
//! The engine reports every service it starts or stops providing so a
//! registry client can announce or withdraw it. Talking to an actual
//! registry is up to the implementation.

use arrowhead_core::ServiceDescriptor;

/// Receives service lifecycle notifications.
pub trait ServiceRegistry: Send + Sync + 'static {
    /// Called after `descriptor` was mounted.
    fn on_provide(&self, descriptor: &ServiceDescriptor);

    /// Called after `descriptor` was unmounted.
    fn on_dismiss(&self, descriptor: &ServiceDescriptor);
}

/// Ignores all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRegistry;

impl ServiceRegistry for NoopRegistry {
    fn on_provide(&self, _descriptor: &ServiceDescriptor) {}

    fn on_dismiss(&self, _descriptor: &ServiceDescriptor) {}
}
