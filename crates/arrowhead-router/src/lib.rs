//! Path patterns and specialization ordering for Arrowhead routes.
//!
//! This crate decides which routes, validators and catchers apply to a
//! request and in which order they are tried:
//!
//! - [`HttpPattern`] compiles path patterns such as `/users/#id` or
//!   `/files/>` and matches request paths against them
//! - [`Params`] holds the captured path parameters
//! - [`Routable`] and [`compare_routables`] rank anything restricted by a
//!   method and a pattern, so a literal route is never shadowed by a
//!   parameterized one
//! - [`intersects`] tells whether two routables can see the same request
//!
//! # Example
//!
//! ```rust
//! use arrowhead_router::{compare_routables, sort_by_specialization, HttpPattern, Routable};
//! use http::Method;
//!
//! struct Route(Method, HttpPattern);
//!
//! impl Routable for Route {
//!     fn method(&self) -> Option<&Method> {
//!         Some(&self.0)
//!     }
//!     fn pattern(&self) -> Option<&HttpPattern> {
//!         Some(&self.1)
//!     }
//! }
//!
//! let mut routes = vec![
//!     Route(Method::GET, "/users/#id".parse().unwrap()),
//!     Route(Method::GET, "/users/active".parse().unwrap()),
//! ];
//! sort_by_specialization(&mut routes, compare_routables);
//!
//! let first = routes.iter().find_map(|r| r.match_request(&Method::GET, "/users/active"));
//! assert!(first.unwrap().is_empty());
//! ```

mod method;
mod params;
mod pattern;
mod specialization;

pub use method::{accepts_method, compare_method_filters, compare_methods, method_rank};
pub use params::Params;
pub use pattern::{HttpPattern, PatternError, Segment, PARAM_MARKER, PREFIX_MARKER};
pub use specialization::{
    compare_routables, intersects, is_duplicate, sort_by_specialization, Routable,
};
