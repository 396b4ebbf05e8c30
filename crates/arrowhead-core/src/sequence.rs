//! Route sequences: one route with the validators and catchers that apply
//! to it.
//!
//! A [`RouteSequence`] runs a matching request through three stages:
//!
//! 1. validators, in specialization order; the first one that handles the
//!    request ends the sequence and the route handler never runs
//! 2. the route handler, with the path parameters of the route pattern bound
//! 3. on a failure of either stage, catchers in specialization order; the
//!    first one that handles the failure supplies the response, and if none
//!    does the failure propagates
//!
//! The response leaving the sequence must carry a status. A response
//! without one fails with
//! [`ROUTE_CONFIGURATION`](crate::error::ROUTE_CONFIGURATION); that failure
//! is never offered to catchers.
//!
//! Validators and catchers are pre-filtered to those that can apply to the
//! route at all (see [`RouteSequenceFactory`](crate::RouteSequenceFactory)),
//! and are then matched against each request individually.

use std::sync::Arc;

use arrowhead_future::{Failure, Future, Promise};
use arrowhead_router::{Params, Routable};

use crate::handler::Handling;
use crate::message::{missing_status, HasStatus, RequestHead, ServiceRequest, ServiceResponse};
use crate::route::{Catcher, Route, Validator};

/// A request on its way through a service.
#[derive(Debug)]
pub struct RouteTask {
    base_path: String,
    request: ServiceRequest,
    response: ServiceResponse,
}

impl RouteTask {
    /// Creates a task for a service mounted at `base_path`.
    pub fn new(base_path: impl Into<String>, request: ServiceRequest, response: ServiceResponse) -> Self {
        Self {
            base_path: base_path.into(),
            request,
            response,
        }
    }

    /// Returns the base path of the service handling the task.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Returns the request.
    #[must_use]
    pub const fn request(&self) -> &ServiceRequest {
        &self.request
    }

    /// Returns the response built so far.
    #[must_use]
    pub const fn response(&self) -> &ServiceResponse {
        &self.response
    }

    /// Returns the request path relative to the base path, or `None` if the
    /// request is not below the base path.
    #[must_use]
    pub fn relative_path(&self) -> Option<&str> {
        relative_path(&self.base_path, self.request.path())
    }

    /// Splits the task into its request and response.
    #[must_use]
    pub fn into_parts(self) -> (ServiceRequest, ServiceResponse) {
        (self.request, self.response)
    }
}

/// The result of offering a task to a route sequence.
#[derive(Debug)]
pub enum Dispatch {
    /// The sequence produced the response.
    Handled(ServiceResponse),
    /// The route did not match; the task is handed back untouched.
    Unhandled(RouteTask),
}

impl Dispatch {
    /// Returns `true` for [`Dispatch::Handled`].
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        matches!(self, Self::Handled(_))
    }
}

/// Strips `base_path` from `path` on a segment boundary.
///
/// ```rust
/// use arrowhead_core::relative_path;
///
/// assert_eq!(relative_path("/shop", "/shop/items/3"), Some("/items/3"));
/// assert_eq!(relative_path("/shop", "/shop"), Some("/"));
/// assert_eq!(relative_path("/shop", "/shopping"), None);
/// assert_eq!(relative_path("/", "/shopping"), Some("/shopping"));
/// ```
#[must_use]
pub fn relative_path<'a>(base_path: &str, path: &'a str) -> Option<&'a str> {
    let base = base_path.trim_end_matches('/');
    if base.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(base)?;
    if rest.is_empty() {
        Some("/")
    } else if rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Outcome of the validator stage.
enum Validated {
    Handled(ServiceResponse),
    Passed(ServiceRequest, ServiceResponse),
}

struct Inner {
    route: Route,
    validators: Vec<Validator>,
    catchers: Vec<Catcher>,
}

/// One route with its applicable validators and catchers, in order.
///
/// Sequences are immutable and cheap to clone; one instance serves every
/// request to its route concurrently.
#[derive(Clone)]
pub struct RouteSequence {
    inner: Arc<Inner>,
}

impl RouteSequence {
    /// Creates a sequence from already sorted validators and catchers.
    #[must_use]
    pub fn new(route: Route, validators: Vec<Validator>, catchers: Vec<Catcher>) -> Self {
        Self {
            inner: Arc::new(Inner {
                route,
                validators,
                catchers,
            }),
        }
    }

    /// Returns the route.
    #[must_use]
    pub fn route(&self) -> &Route {
        &self.inner.route
    }

    /// Returns the validators in the order they run.
    #[must_use]
    pub fn validators(&self) -> &[Validator] {
        &self.inner.validators
    }

    /// Returns the catchers in the order they are offered failures.
    #[must_use]
    pub fn catchers(&self) -> &[Catcher] {
        &self.inner.catchers
    }

    /// Returns `true` if the route accepts the task's request.
    #[must_use]
    pub fn matches(&self, task: &RouteTask) -> bool {
        self.match_task(task).is_some()
    }

    /// Runs the task through the sequence.
    ///
    /// Resolves to [`Dispatch::Unhandled`] with the untouched task when the
    /// route does not match; nothing runs in that case. Otherwise resolves to
    /// the final response, or fails with the failure no catcher handled.
    pub fn try_handle(&self, task: RouteTask) -> Future<Dispatch> {
        let Some(params) = self.match_task(&task) else {
            return Future::success(Dispatch::Unhandled(task));
        };
        let relative: Arc<str> = task.relative_path().unwrap_or("/").into();
        let RouteTask {
            mut request,
            response,
            ..
        } = task;
        request.set_params(params);
        let head = request.shared_head();

        let sequence = self.clone();
        let handled = self
            .validate_from(0, request, response, Arc::clone(&relative))
            .flat_map(move |validated| match validated {
                Validated::Handled(response) => Future::success(response),
                Validated::Passed(request, response) => {
                    sequence.inner.route.handler().handle(request, response)
                }
            });

        let sequence = self.clone();
        handled
            .flat_recover(move |failure| sequence.catch_from(0, failure, head, relative))
            .try_map(|response| {
                if response.status().is_some() {
                    Ok(Dispatch::Handled(response))
                } else {
                    Err(missing_status())
                }
            })
    }

    fn match_task(&self, task: &RouteTask) -> Option<Params> {
        let relative = task.relative_path()?;
        self.inner
            .route
            .match_request(task.request.method(), relative)
    }

    /// Offers the request to the validators from `index` on.
    fn validate_from(
        &self,
        index: usize,
        request: ServiceRequest,
        response: ServiceResponse,
        relative: Arc<str>,
    ) -> Future<Validated> {
        let next = self.inner.validators[index..]
            .iter()
            .position(|validator| {
                validator
                    .match_request(request.method(), &relative)
                    .is_some()
            })
            .map(|offset| index + offset);
        let Some(position) = next else {
            return Future::success(Validated::Passed(request, response));
        };

        let verdict = self.inner.validators[position]
            .handler()
            .validate(&request, response);
        let sequence = self.clone();
        verdict.flat_map(move |handling| match handling {
            Handling::Handled(response) => {
                tracing::debug!(
                    path = request.path(),
                    validator = position,
                    "request handled by validator"
                );
                Future::success(Validated::Handled(response))
            }
            Handling::Declined(response) => {
                sequence.validate_from(position + 1, request, response, relative)
            }
        })
    }

    /// Offers `failure` to the catchers from `index` on.
    ///
    /// Each catcher gets a fresh response. A catcher that fails itself ends
    /// the chain with its own failure, the original attached as suppressed.
    fn catch_from(
        &self,
        index: usize,
        failure: Failure,
        head: Arc<RequestHead>,
        relative: Arc<str>,
    ) -> Future<ServiceResponse> {
        let next = self.inner.catchers[index..]
            .iter()
            .position(|catcher| {
                catcher.catches(&failure)
                    && catcher.match_request(head.method(), &relative).is_some()
            })
            .map(|offset| index + offset);
        let Some(position) = next else {
            return Future::failure(failure);
        };

        let verdict = self.inner.catchers[position]
            .handler()
            .catch(&failure, &head, ServiceResponse::new());
        let promise = Promise::new();
        let caught = promise.future();
        let sequence = self.clone();
        verdict.on_completion(move |outcome| match outcome {
            Ok(Handling::Handled(response)) => {
                tracing::debug!(
                    path = head.path(),
                    class = failure.class().name(),
                    catcher = position,
                    "failure handled by catcher"
                );
                promise.try_complete(Ok(response));
            }
            Ok(Handling::Declined(_)) => sequence
                .catch_from(position + 1, failure, head, relative)
                .on_completion(move |outcome| {
                    promise.try_complete(outcome);
                }),
            Err(own) => {
                promise.try_complete(Err(own.with_suppressed(failure)));
            }
        });
        caught
    }
}

impl std::fmt::Debug for RouteSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteSequence")
            .field("route", &self.inner.route)
            .field("validators", &self.inner.validators.len())
            .field("catchers", &self.inner.catchers.len())
            .finish()
    }
}
