//! HTTP services.
//!
//! An [`HttpService`] is a named set of routes mounted at a base path,
//! together with the validators and catchers that guard them. Services are
//! assembled with [`HttpServiceBuilder`]; building compiles every pattern,
//! rejects conflicting routes and prepares one route sequence per route.
//!
//! ## Example
//!
//! ```rust
//! use arrowhead_core::{Handling, HttpService, RequestHead, ServiceRequest, ServiceResponse};
//! use arrowhead_future::{Failure, Future};
//! use http::StatusCode;
//!
//! let service = HttpService::builder("inventory")
//!     .base_path("/inventory")
//!     .encoding("json")
//!     .get("/items/#id", |request: ServiceRequest, response: ServiceResponse| {
//!         let id = request.param("id").unwrap_or_default().to_string();
//!         Future::success(response.with_status(StatusCode::OK).with_body(id))
//!     })
//!     .catch(
//!         &arrowhead_future::class::ERROR,
//!         |_: &Failure, _: &RequestHead, response: ServiceResponse| {
//!             Future::success(Handling::Handled(response.with_status(StatusCode::BAD_GATEWAY)))
//!         },
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(service.base_path(), "/inventory");
//! assert_eq!(service.sequences().len(), 1);
//! ```

use std::sync::Arc;

use arrowhead_future::class::ErrorClass;
use arrowhead_future::Future;
use arrowhead_router::{is_duplicate, HttpPattern, Routable};
use http::Method;

use crate::encoding::{Encoding, EncodingRegistry};
use crate::error::ServiceError;
use crate::factory::RouteSequenceFactory;
use crate::handler::{CatcherHandler, RouteHandler, ValidatorHandler};
use crate::route::{Catcher, Route, Validator};
use crate::sequence::{Dispatch, RouteSequence, RouteTask};

/// Identity of a service as announced to registries and access policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    name: String,
    base_path: String,
    encodings: Vec<Encoding>,
}

impl ServiceDescriptor {
    /// Returns the service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the normalized base path.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Returns the declared request body encodings.
    #[must_use]
    pub fn encodings(&self) -> &[Encoding] {
        &self.encodings
    }
}

/// A built service: its descriptor and its route sequences in dispatch
/// order.
#[derive(Debug, Clone)]
pub struct HttpService {
    descriptor: ServiceDescriptor,
    sequences: Arc<[RouteSequence]>,
}

impl HttpService {
    /// Starts building a service called `name`.
    pub fn builder(name: impl Into<String>) -> HttpServiceBuilder {
        HttpServiceBuilder::new(name)
    }

    /// Returns the descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// Returns the service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Returns the normalized base path.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.descriptor.base_path
    }

    /// Returns the route sequences, most specialized first.
    #[must_use]
    pub fn sequences(&self) -> &[RouteSequence] {
        &self.sequences
    }

    /// Returns `true` if request bodies in `encoding` are accepted.
    ///
    /// A service without declared encodings accepts any.
    #[must_use]
    pub fn accepts_encoding(&self, encoding: &Encoding) -> bool {
        self.descriptor.encodings.is_empty() || self.descriptor.encodings.contains(encoding)
    }

    /// Offers `task` to each route sequence in order.
    ///
    /// The first sequence whose route matches takes the task; resolves to
    /// [`Dispatch::Unhandled`] if no route matches.
    pub fn dispatch(&self, task: RouteTask) -> Future<Dispatch> {
        match self.sequences.iter().find(|sequence| sequence.matches(&task)) {
            Some(sequence) => sequence.try_handle(task),
            None => {
                tracing::debug!(
                    service = %self.descriptor.name,
                    path = task.request().path(),
                    "no route matched"
                );
                Future::success(Dispatch::Unhandled(task))
            }
        }
    }
}

/// Builder for [`HttpService`].
///
/// Registration methods never fail; the first problem is reported by
/// [`build`](Self::build).
#[must_use = "builders do nothing unless built"]
pub struct HttpServiceBuilder {
    name: String,
    base_path: String,
    encodings: Vec<Encoding>,
    routes: Vec<Route>,
    validators: Vec<Validator>,
    catchers: Vec<Catcher>,
    error: Option<ServiceError>,
}

impl HttpServiceBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_path: "/".to_string(),
            encodings: Vec::new(),
            routes: Vec::new(),
            validators: Vec::new(),
            catchers: Vec::new(),
            error: None,
        }
    }

    /// Sets the base path the service is mounted at. Defaults to `/`.
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Declares an accepted request body encoding, such as `json`.
    pub fn encoding(mut self, name: &str) -> Self {
        let encoding = EncodingRegistry::global().intern(name);
        if !self.encodings.contains(&encoding) {
            self.encodings.push(encoding);
        }
        self
    }

    /// Registers a route for `method` and `pattern`.
    pub fn route(mut self, method: Method, pattern: &str, handler: impl RouteHandler) -> Self {
        if let Some(pattern) = self.compile(pattern) {
            self.routes.push(Route::new(Some(method), Some(pattern), handler));
        }
        self
    }

    /// Registers a route for `pattern` accepting any method.
    pub fn route_any_method(mut self, pattern: &str, handler: impl RouteHandler) -> Self {
        if let Some(pattern) = self.compile(pattern) {
            self.routes.push(Route::new(None, Some(pattern), handler));
        }
        self
    }

    /// Registers a `GET` route.
    pub fn get(self, pattern: &str, handler: impl RouteHandler) -> Self {
        self.route(Method::GET, pattern, handler)
    }

    /// Registers a `POST` route.
    pub fn post(self, pattern: &str, handler: impl RouteHandler) -> Self {
        self.route(Method::POST, pattern, handler)
    }

    /// Registers a `PUT` route.
    pub fn put(self, pattern: &str, handler: impl RouteHandler) -> Self {
        self.route(Method::PUT, pattern, handler)
    }

    /// Registers a `DELETE` route.
    pub fn delete(self, pattern: &str, handler: impl RouteHandler) -> Self {
        self.route(Method::DELETE, pattern, handler)
    }

    /// Registers a `PATCH` route.
    pub fn patch(self, pattern: &str, handler: impl RouteHandler) -> Self {
        self.route(Method::PATCH, pattern, handler)
    }

    /// Registers a validator for every request to the service.
    pub fn validate(mut self, handler: impl ValidatorHandler) -> Self {
        let ordinal = self.validators.len();
        self.validators.push(Validator::new(None, None, ordinal, handler));
        self
    }

    /// Registers a validator restricted to `method` (if any) and `pattern`.
    pub fn validate_on(
        mut self,
        method: Option<Method>,
        pattern: &str,
        handler: impl ValidatorHandler,
    ) -> Self {
        if let Some(pattern) = self.compile(pattern) {
            let ordinal = self.validators.len();
            self.validators
                .push(Validator::new(method, Some(pattern), ordinal, handler));
        }
        self
    }

    /// Registers a catcher for failures of `class` on every route.
    pub fn catch(mut self, class: &'static ErrorClass, handler: impl CatcherHandler) -> Self {
        let ordinal = self.catchers.len();
        self.catchers
            .push(Catcher::new(None, None, class, ordinal, handler));
        self
    }

    /// Registers a catcher restricted to `method` (if any) and `pattern`.
    pub fn catch_on(
        mut self,
        method: Option<Method>,
        pattern: &str,
        class: &'static ErrorClass,
        handler: impl CatcherHandler,
    ) -> Self {
        if let Some(pattern) = self.compile(pattern) {
            let ordinal = self.catchers.len();
            self.catchers
                .push(Catcher::new(method, Some(pattern), class, ordinal, handler));
        }
        self
    }

    /// Builds the service.
    ///
    /// # Errors
    ///
    /// Returns the first [`ServiceError`]: an empty name, a pattern that does
    /// not compile, a base path that is not a literal path, or two routes
    /// accepting exactly the same requests.
    pub fn build(self) -> Result<HttpService, ServiceError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.name.trim().is_empty() {
            return Err(ServiceError::MissingName);
        }
        let base_path = normalize_base_path(&self.base_path)?;
        check_duplicates(&self.name, &self.routes)?;

        let factory = RouteSequenceFactory::new(self.validators, self.catchers);
        let sequences = factory.create_all(self.routes);
        tracing::debug!(
            service = %self.name,
            base_path = %base_path,
            routes = sequences.len(),
            "service built"
        );

        Ok(HttpService {
            descriptor: ServiceDescriptor {
                name: self.name,
                base_path,
                encodings: self.encodings,
            },
            sequences: sequences.into(),
        })
    }

    /// Compiles `pattern`, remembering the first failure.
    fn compile(&mut self, pattern: &str) -> Option<HttpPattern> {
        match HttpPattern::parse(pattern) {
            Ok(pattern) => Some(pattern),
            Err(error) => {
                self.error.get_or_insert(ServiceError::InvalidPattern(error));
                None
            }
        }
    }
}

impl std::fmt::Debug for HttpServiceBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServiceBuilder")
            .field("name", &self.name)
            .field("base_path", &self.base_path)
            .field("routes", &self.routes.len())
            .field("validators", &self.validators.len())
            .field("catchers", &self.catchers.len())
            .finish_non_exhaustive()
    }
}

/// Validates a base path and renders it canonically (`/`, or no trailing
/// slash).
fn normalize_base_path(base_path: &str) -> Result<String, ServiceError> {
    let invalid = |reason: &str| ServiceError::InvalidBasePath {
        base_path: base_path.to_string(),
        reason: reason.to_string(),
    };
    let pattern = HttpPattern::parse(base_path).map_err(|error| invalid(&error.to_string()))?;
    if !pattern.is_literal() {
        return Err(invalid("base paths cannot contain parameters or prefix markers"));
    }
    Ok(pattern.to_string())
}

fn check_duplicates(service: &str, routes: &[Route]) -> Result<(), ServiceError> {
    for (index, route) in routes.iter().enumerate() {
        if routes[..index].iter().any(|earlier| is_duplicate(earlier, route)) {
            return Err(ServiceError::DuplicateRoute {
                service: service.to_string(),
                method: route.method().map_or_else(|| "*".to_string(), ToString::to_string),
                pattern: route
                    .pattern()
                    .map_or_else(|| "*".to_string(), ToString::to_string),
            });
        }
    }
    Ok(())
}
