//! Assembly of route sequences.

use arrowhead_router::{compare_routables, intersects, sort_by_specialization};

use crate::route::{Catcher, Route, Validator};
use crate::sequence::RouteSequence;

/// Builds one [`RouteSequence`] per route from a service's validators and
/// catchers.
///
/// The pools are sorted once, when the factory is created. Each sequence
/// receives the validators and catchers that intersect its route, in pool
/// order. Building is pure: the same inputs always yield the same
/// sequences.
#[derive(Debug, Clone, Default)]
pub struct RouteSequenceFactory {
    validators: Vec<Validator>,
    catchers: Vec<Catcher>,
}

impl RouteSequenceFactory {
    /// Creates a factory, sorting both pools by specialization.
    #[must_use]
    pub fn new(mut validators: Vec<Validator>, mut catchers: Vec<Catcher>) -> Self {
        sort_by_specialization(&mut validators, Validator::compare);
        sort_by_specialization(&mut catchers, Catcher::compare);
        Self {
            validators,
            catchers,
        }
    }

    /// Returns the sorted validator pool.
    #[must_use]
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Returns the sorted catcher pool.
    #[must_use]
    pub fn catchers(&self) -> &[Catcher] {
        &self.catchers
    }

    /// Builds the sequence of `route`.
    #[must_use]
    pub fn create(&self, route: Route) -> RouteSequence {
        let validators = self
            .validators
            .iter()
            .filter(|validator| intersects(*validator, &route))
            .cloned()
            .collect();
        let catchers = self
            .catchers
            .iter()
            .filter(|catcher| intersects(*catcher, &route))
            .cloned()
            .collect();
        RouteSequence::new(route, validators, catchers)
    }

    /// Builds the sequences of all `routes`, most specialized route first.
    #[must_use]
    pub fn create_all(&self, routes: impl IntoIterator<Item = Route>) -> Vec<RouteSequence> {
        let mut routes: Vec<Route> = routes.into_iter().collect();
        sort_by_specialization(&mut routes, compare_routables);
        let sequences: Vec<RouteSequence> = routes.into_iter().map(|route| self.create(route)).collect();
        tracing::debug!(
            routes = sequences.len(),
            validators = self.validators.len(),
            catchers = self.catchers.len(),
            "route sequences built"
        );
        sequences
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handling;
    use crate::message::{RequestHead, ServiceRequest, ServiceResponse};
    use arrowhead_future::class::{self, ErrorClass};
    use arrowhead_future::{Failure, Future};
    use arrowhead_router::{HttpPattern, Routable};
    use http::Method;

    fn pattern(text: &str) -> Option<HttpPattern> {
        Some(HttpPattern::parse(text).unwrap())
    }

    fn route(method: Option<Method>, text: &str) -> Route {
        Route::new(
            method,
            pattern(text),
            |_: ServiceRequest, response: ServiceResponse| Future::success(response),
        )
    }

    fn validator(method: Option<Method>, text: Option<&str>, ordinal: usize) -> Validator {
        Validator::new(
            method,
            text.and_then(pattern),
            ordinal,
            |_: &ServiceRequest, response: ServiceResponse| {
                Future::success(Handling::Declined(response))
            },
        )
    }

    fn catcher(class: &'static ErrorClass, text: Option<&str>, ordinal: usize) -> Catcher {
        Catcher::new(
            None,
            text.and_then(pattern),
            class,
            ordinal,
            |_: &Failure, _: &RequestHead, response: ServiceResponse| {
                Future::success(Handling::Declined(response))
            },
        )
    }

    #[test]
    fn test_pools_are_sorted_once() {
        let factory = RouteSequenceFactory::new(
            vec![
                validator(None, None, 0),
                validator(None, Some("/orders/>"), 1),
                validator(Some(Method::GET), Some("/orders/>"), 2),
            ],
            vec![
                catcher(&class::ERROR, None, 0),
                catcher(&class::IO, None, 1),
                catcher(&class::FILE_NOT_FOUND, None, 2),
            ],
        );
        let validators: Vec<usize> = factory.validators().iter().map(Validator::ordinal).collect();
        assert_eq!(validators, vec![2, 1, 0]);
        let catchers: Vec<usize> = factory.catchers().iter().map(Catcher::ordinal).collect();
        assert_eq!(catchers, vec![2, 1, 0]);
    }

    #[test]
    fn test_sequence_keeps_intersecting_only() {
        let factory = RouteSequenceFactory::new(
            vec![
                validator(None, Some("/orders/>"), 0),
                validator(None, Some("/users/>"), 1),
                validator(Some(Method::DELETE), None, 2),
                validator(None, None, 3),
            ],
            vec![
                catcher(&class::ERROR, Some("/users/#id"), 0),
                catcher(&class::IO, Some("/orders/#id"), 1),
            ],
        );
        let sequence = factory.create(route(Some(Method::GET), "/orders/#id"));

        let validators: Vec<usize> = sequence.validators().iter().map(Validator::ordinal).collect();
        assert_eq!(validators, vec![0, 3]);
        let catchers: Vec<usize> = sequence.catchers().iter().map(Catcher::ordinal).collect();
        assert_eq!(catchers, vec![1]);
    }

    #[test]
    fn test_create_all_orders_routes() {
        let factory = RouteSequenceFactory::default();
        let sequences = factory.create_all(vec![
            route(None, "/#id"),
            route(Some(Method::GET), "/#id"),
            route(Some(Method::GET), "/status"),
        ]);
        let order: Vec<String> = sequences
            .iter()
            .map(|sequence| {
                let route = sequence.route();
                format!(
                    "{} {}",
                    route.method().map_or("*", Method::as_str),
                    route.pattern().map(ToString::to_string).unwrap_or_default()
                )
            })
            .collect();
        assert_eq!(order, vec!["GET /status", "GET /#id", "* /#id"]);
    }

    #[test]
    fn test_build_is_idempotent() {
        let factory = RouteSequenceFactory::new(
            vec![validator(None, None, 1), validator(None, None, 0)],
            vec![catcher(&class::IO, None, 0)],
        );
        let first = factory.create(route(None, "/a"));
        let second = factory.create(route(None, "/a"));
        let ordinals = |sequence: &RouteSequence| -> Vec<usize> {
            sequence.validators().iter().map(Validator::ordinal).collect()
        };
        assert_eq!(ordinals(&first), ordinals(&second));
        assert_eq!(ordinals(&first), vec![0, 1]);
    }
}
