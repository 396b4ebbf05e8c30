//! Handler traits for routes, validators and catchers.
//!
//! Every handler answers with a [`Future`]; a handler that already knows its
//! answer returns an already completed one. Closures with matching
//! signatures implement the traits directly:
//!
//! ```rust
//! use arrowhead_core::{Handling, ServiceRequest, ServiceResponse, ValidatorHandler};
//! use arrowhead_future::Future;
//! use http::StatusCode;
//!
//! fn require_identity() -> impl ValidatorHandler {
//!     |request: &ServiceRequest, response: ServiceResponse| {
//!         if request.identity().is_anonymous() {
//!             Future::success(Handling::Handled(response.with_status(StatusCode::UNAUTHORIZED)))
//!         } else {
//!             Future::success(Handling::Declined(response))
//!         }
//!     }
//! }
//! ```

use arrowhead_future::{Failure, Future};

use crate::message::{RequestHead, ServiceRequest, ServiceResponse};

/// The verdict of a validator or catcher.
///
/// Both variants hand the response back so the next step continues with
/// whatever the declining step left in it.
#[derive(Debug)]
pub enum Handling {
    /// The request was fully handled; nothing after this step runs.
    Handled(ServiceResponse),
    /// The step passes; the sequence continues.
    Declined(ServiceResponse),
}

impl Handling {
    /// Returns `true` for [`Handling::Handled`].
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        matches!(self, Self::Handled(_))
    }

    /// Returns the response carried by either variant.
    #[must_use]
    pub fn into_response(self) -> ServiceResponse {
        match self {
            Self::Handled(response) | Self::Declined(response) => response,
        }
    }
}

/// Produces the response of a route.
pub trait RouteHandler: Send + Sync + 'static {
    /// Handles `request`, with its path parameters bound, by filling in
    /// `response`.
    ///
    /// The returned response must carry a status.
    fn handle(&self, request: ServiceRequest, response: ServiceResponse) -> Future<ServiceResponse>;
}

impl<F> RouteHandler for F
where
    F: Fn(ServiceRequest, ServiceResponse) -> Future<ServiceResponse> + Send + Sync + 'static,
{
    fn handle(&self, request: ServiceRequest, response: ServiceResponse) -> Future<ServiceResponse> {
        self(request, response)
    }
}

/// Inspects a request before its route handler runs.
pub trait ValidatorHandler: Send + Sync + 'static {
    /// Either handles the request itself (for example by rejecting it) or
    /// declines so the sequence continues.
    fn validate(&self, request: &ServiceRequest, response: ServiceResponse) -> Future<Handling>;
}

impl<F> ValidatorHandler for F
where
    F: Fn(&ServiceRequest, ServiceResponse) -> Future<Handling> + Send + Sync + 'static,
{
    fn validate(&self, request: &ServiceRequest, response: ServiceResponse) -> Future<Handling> {
        self(request, response)
    }
}

/// Turns a failure raised by a validator or route handler into a response.
pub trait CatcherHandler: Send + Sync + 'static {
    /// Either handles `failure` or declines so the next catcher is tried.
    ///
    /// `response` is a fresh response; whatever the failing step wrote is
    /// discarded.
    fn catch(&self, failure: &Failure, head: &RequestHead, response: ServiceResponse)
        -> Future<Handling>;
}

impl<F> CatcherHandler for F
where
    F: Fn(&Failure, &RequestHead, ServiceResponse) -> Future<Handling> + Send + Sync + 'static,
{
    fn catch(
        &self,
        failure: &Failure,
        head: &RequestHead,
        response: ServiceResponse,
    ) -> Future<Handling> {
        self(failure, head, response)
    }
}
