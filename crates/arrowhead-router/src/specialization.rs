//! Specialization ordering of routables.
//!
//! Every route, validator and catcher restricts the requests it applies to
//! by an optional method and an optional path pattern; absence means "any".
//! The more a routable narrows that space, the more specialized it is and
//! the earlier it is tried.

use std::cmp::Ordering;

use http::Method;

use crate::method::{accepts_method, compare_method_filters};
use crate::params::Params;
use crate::pattern::HttpPattern;

/// Anything ranked by the specialization ordering.
pub trait Routable {
    /// The accepted method, or `None` for any method.
    fn method(&self) -> Option<&Method>;

    /// The accepted path pattern, or `None` for any path.
    fn pattern(&self) -> Option<&HttpPattern>;

    /// Matches a request, returning the captured path parameters.
    ///
    /// A routable without a pattern accepts every path and captures nothing.
    fn match_request(&self, method: &Method, path: &str) -> Option<Params> {
        if !accepts_method(self.method(), method) {
            return None;
        }
        match self.pattern() {
            Some(pattern) => pattern.match_path(path),
            None => Some(Params::new()),
        }
    }
}

/// Ranks two routables; `Less` means `a` is more specialized.
///
/// A routable with a pattern outranks one without, and two patterns compare
/// by [`HttpPattern::cmp_specificity`]. On a tie an explicit method outranks
/// any method, and explicit methods follow the fixed method order.
pub fn compare_routables<A, B>(a: &A, b: &B) -> Ordering
where
    A: Routable + ?Sized,
    B: Routable + ?Sized,
{
    let patterns = match (a.pattern(), b.pattern()) {
        (Some(a), Some(b)) => a.cmp_specificity(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    patterns.then_with(|| compare_method_filters(a.method(), b.method()))
}

/// Returns `true` if some request is accepted by both routables.
///
/// An absent method or pattern accepts everything, so it intersects any
/// counterpart.
pub fn intersects<A, B>(a: &A, b: &B) -> bool
where
    A: Routable + ?Sized,
    B: Routable + ?Sized,
{
    let methods = match (a.method(), b.method()) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    };
    methods
        && match (a.pattern(), b.pattern()) {
            (Some(a), Some(b)) => a.intersects(b),
            _ => true,
        }
}

/// Returns `true` if both routables accept exactly the same requests.
pub fn is_duplicate<A, B>(a: &A, b: &B) -> bool
where
    A: Routable + ?Sized,
    B: Routable + ?Sized,
{
    a.method() == b.method()
        && match (a.pattern(), b.pattern()) {
            (Some(a), Some(b)) => a.is_equivalent(b),
            (None, None) => true,
            _ => false,
        }
}

/// Stable sort tolerating comparators that are not total orders.
///
/// Catcher ordering is not transitive across unrelated error classes, and
/// `slice::sort_by` may panic on such comparators. Only adjacent elements the
/// comparator reports as inverted are swapped.
pub fn sort_by_specialization<T, F>(items: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    for index in 1..items.len() {
        let mut cursor = index;
        while cursor > 0 && compare(&items[cursor - 1], &items[cursor]).is_gt() {
            items.swap(cursor - 1, cursor);
            cursor -= 1;
        }
    }
}
