//! Pattern matching and ordering properties.

use arrowhead_router::{
    compare_routables, intersects, sort_by_specialization, HttpPattern, Routable,
};
use http::Method;
use proptest::prelude::*;

struct Route {
    method: Option<Method>,
    pattern: HttpPattern,
    name: &'static str,
}

impl Routable for Route {
    fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    fn pattern(&self) -> Option<&HttpPattern> {
        Some(&self.pattern)
    }
}

fn route(name: &'static str, method: Option<Method>, pattern: &str) -> Route {
    Route {
        method,
        pattern: pattern.parse().unwrap(),
        name,
    }
}

fn resolve<'a>(routes: &'a [Route], method: &Method, path: &str) -> Option<&'a str> {
    routes
        .iter()
        .find(|r| r.match_request(method, path).is_some())
        .map(|r| r.name)
}

#[test]
fn test_most_specialized_route_wins() {
    let mut routes = vec![
        route("catch-all", None, "/>"),
        route("user", Some(Method::GET), "/users/#id"),
        route("files", None, "/users/#id/files/>"),
        route("active", Some(Method::GET), "/users/active"),
        route("users", Some(Method::GET), "/users"),
    ];
    sort_by_specialization(&mut routes, compare_routables);

    assert_eq!(resolve(&routes, &Method::GET, "/users/active"), Some("active"));
    assert_eq!(resolve(&routes, &Method::GET, "/users/42"), Some("user"));
    assert_eq!(resolve(&routes, &Method::GET, "/users/"), Some("users"));
    assert_eq!(resolve(&routes, &Method::PUT, "/users/42/files/a"), Some("files"));
    assert_eq!(resolve(&routes, &Method::POST, "/users/42"), Some("catch-all"));
}

#[test]
fn test_multiple_params_in_order() {
    let pattern: HttpPattern = "/orgs/#org/users/#user".parse().unwrap();
    let params = pattern.match_path("/orgs/acme/users/123").unwrap();
    assert_eq!(params.values().collect::<Vec<_>>(), vec!["acme", "123"]);
    assert_eq!(params.get("user"), Some("123"));
}

#[test]
fn test_intersection_is_symmetric_for_examples() {
    let routes = [
        route("a", Some(Method::GET), "/users/#id"),
        route("b", None, "/users/>"),
        route("c", Some(Method::POST), "/orders"),
    ];
    for left in &routes {
        for right in &routes {
            assert_eq!(intersects(left, right), intersects(right, left));
        }
    }
}

fn literal() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,6}"
}

proptest! {
    #[test]
    fn prop_literal_pattern_matches_itself(segments in proptest::collection::vec(literal(), 0..6)) {
        let path = format!("/{}", segments.join("/"));
        let pattern = HttpPattern::parse(&path).unwrap();
        prop_assert!(pattern.matches(&path));
        let with_slash = format!("{path}/");
        prop_assert!(pattern.matches(&with_slash));
    }

    #[test]
    fn prop_params_capture_every_segment(segments in proptest::collection::vec(literal(), 1..6)) {
        let pattern_text: String = (0..segments.len()).map(|i| format!("/#p{i}")).collect();
        let pattern = HttpPattern::parse(&pattern_text).unwrap();
        let path = format!("/{}", segments.join("/"));
        let params = pattern.match_path(&path).unwrap();
        prop_assert_eq!(params.values().collect::<Vec<_>>(), segments.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn prop_prefix_matches_any_extension(
        prefix in proptest::collection::vec(literal(), 0..4),
        rest in proptest::collection::vec(literal(), 0..4),
    ) {
        let pattern = HttpPattern::parse(&format!("/{}/>", prefix.join("/")).replace("//", "/")).unwrap();
        let all: Vec<String> = prefix.iter().chain(&rest).cloned().collect();
        let path = format!("/{}", all.join("/"));
        prop_assert!(pattern.matches(&path));
    }

    #[test]
    fn prop_display_round_trips(segments in proptest::collection::vec(literal(), 0..5), prefix in any::<bool>()) {
        let mut text = format!("/{}", segments.join("/"));
        if prefix {
            text = format!("{}/>", text.trim_end_matches('/'));
        }
        let pattern = HttpPattern::parse(&text).unwrap();
        prop_assert_eq!(HttpPattern::parse(&pattern.to_string()).unwrap(), pattern);
    }
}
