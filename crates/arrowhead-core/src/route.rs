//! Routes, validators and catchers.
//!
//! All three are [`Routable`]: they apply to the requests accepted by an
//! optional method and an optional pattern, matched against the path
//! relative to the service's base path. Each holds its handler behind an
//! `Arc`, so cloning one into several route sequences is cheap.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use arrowhead_future::class::ErrorClass;
use arrowhead_future::Failure;
use arrowhead_router::{compare_routables, HttpPattern, Routable};
use http::Method;

use crate::handler::{CatcherHandler, RouteHandler, ValidatorHandler};

/// A handler bound to a method and pattern.
#[derive(Clone)]
pub struct Route {
    method: Option<Method>,
    pattern: Option<HttpPattern>,
    handler: Arc<dyn RouteHandler>,
}

impl Route {
    /// Creates a route.
    pub fn new(
        method: Option<Method>,
        pattern: Option<HttpPattern>,
        handler: impl RouteHandler,
    ) -> Self {
        Self {
            method,
            pattern,
            handler: Arc::new(handler),
        }
    }

    /// Returns the route handler.
    #[must_use]
    pub fn handler(&self) -> &dyn RouteHandler {
        self.handler.as_ref()
    }
}

impl Routable for Route {
    fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    fn pattern(&self) -> Option<&HttpPattern> {
        self.pattern.as_ref()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_ref().map(ToString::to_string))
            .finish_non_exhaustive()
    }
}

/// A request check that runs before the route handler.
#[derive(Clone)]
pub struct Validator {
    method: Option<Method>,
    pattern: Option<HttpPattern>,
    ordinal: usize,
    handler: Arc<dyn ValidatorHandler>,
}

impl Validator {
    /// Creates a validator; `ordinal` is its registration position.
    pub fn new(
        method: Option<Method>,
        pattern: Option<HttpPattern>,
        ordinal: usize,
        handler: impl ValidatorHandler,
    ) -> Self {
        Self {
            method,
            pattern,
            ordinal,
            handler: Arc::new(handler),
        }
    }

    /// Returns the registration position.
    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Returns the validator handler.
    #[must_use]
    pub fn handler(&self) -> &dyn ValidatorHandler {
        self.handler.as_ref()
    }

    /// Specialization order: routable order, then registration order.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        compare_routables(self, other).then_with(|| self.ordinal.cmp(&other.ordinal))
    }
}

impl Routable for Validator {
    fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    fn pattern(&self) -> Option<&HttpPattern> {
        self.pattern.as_ref()
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_ref().map(ToString::to_string))
            .field("ordinal", &self.ordinal)
            .finish_non_exhaustive()
    }
}

/// A failure handler for one error class and its subclasses.
#[derive(Clone)]
pub struct Catcher {
    method: Option<Method>,
    pattern: Option<HttpPattern>,
    class: &'static ErrorClass,
    ordinal: usize,
    handler: Arc<dyn CatcherHandler>,
}

impl Catcher {
    /// Creates a catcher for failures of `class`; `ordinal` is its
    /// registration position.
    pub fn new(
        method: Option<Method>,
        pattern: Option<HttpPattern>,
        class: &'static ErrorClass,
        ordinal: usize,
        handler: impl CatcherHandler,
    ) -> Self {
        Self {
            method,
            pattern,
            class,
            ordinal,
            handler: Arc::new(handler),
        }
    }

    /// Returns the caught error class.
    #[must_use]
    pub const fn class(&self) -> &'static ErrorClass {
        self.class
    }

    /// Returns the registration position.
    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Returns the catcher handler.
    #[must_use]
    pub fn handler(&self) -> &dyn CatcherHandler {
        self.handler.as_ref()
    }

    /// Returns `true` if this catcher is offered `failure`.
    #[must_use]
    pub fn catches(&self, failure: &Failure) -> bool {
        failure.is(self.class)
    }

    /// Specialization order: routable order, then the narrower error class,
    /// then registration order.
    ///
    /// Classes on different branches of the class tree are unordered, so
    /// this relation is not transitive; sort with
    /// [`sort_by_specialization`](arrowhead_router::sort_by_specialization).
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        compare_routables(self, other)
            .then_with(|| {
                if self.class.is_strict_subclass_of(other.class) {
                    Ordering::Less
                } else if other.class.is_strict_subclass_of(self.class) {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| self.ordinal.cmp(&other.ordinal))
    }
}

impl Routable for Catcher {
    fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    fn pattern(&self) -> Option<&HttpPattern> {
        self.pattern.as_ref()
    }
}

impl fmt::Debug for Catcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catcher")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_ref().map(ToString::to_string))
            .field("class", &self.class.name())
            .field("ordinal", &self.ordinal)
            .finish_non_exhaustive()
    }
}
