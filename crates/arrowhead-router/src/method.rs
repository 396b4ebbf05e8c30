//! Fixed ordering of HTTP methods.
//!
//! When two routables have equally specific patterns, the one with an
//! explicit method outranks one accepting any method, and explicit methods
//! are ranked by [`compare_methods`].

use std::cmp::Ordering;

use http::Method;

/// Standard methods in ranking order.
const STANDARD: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
    Method::CONNECT,
];

/// Returns the rank of a standard method, or `None` for extension methods.
///
/// # Example
///
/// ```rust
/// use arrowhead_router::method_rank;
/// use http::Method;
///
/// assert_eq!(method_rank(&Method::GET), Some(0));
/// assert_eq!(method_rank(&Method::CONNECT), Some(8));
/// assert_eq!(method_rank(&Method::from_bytes(b"PURGE").unwrap()), None);
/// ```
#[must_use]
pub fn method_rank(method: &Method) -> Option<usize> {
    STANDARD.iter().position(|standard| standard == method)
}

/// Compares two explicit methods.
///
/// Standard methods come first, in the order GET, POST, PUT, DELETE, PATCH,
/// HEAD, OPTIONS, TRACE, CONNECT. Extension methods follow, ordered by name.
#[must_use]
pub fn compare_methods(a: &Method, b: &Method) -> Ordering {
    match (method_rank(a), method_rank(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.as_str().cmp(b.as_str()),
    }
}

/// Compares two optional methods; an explicit method precedes `None` (any).
#[must_use]
pub fn compare_method_filters(a: Option<&Method>, b: Option<&Method>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare_methods(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Returns `true` if a routable restricted to `filter` accepts `method`.
#[must_use]
pub fn accepts_method(filter: Option<&Method>, method: &Method) -> bool {
    filter.map_or(true, |expected| expected == method)
}
