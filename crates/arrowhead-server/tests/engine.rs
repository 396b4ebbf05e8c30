//! Exchanges driven through the engine the way a transport drives them.

use std::sync::Arc;

use arrowhead_core::error::failures;
use arrowhead_core::{
    ConsumerIdentity, HasBody, HttpService, RequestHead, ServiceDescriptor, ServiceRequest,
    ServiceResponse,
};
use arrowhead_future::{Failure, Future, Outcome};
use arrowhead_server::config::DEFAULT_MAX_BODY_SIZE;
use arrowhead_server::{
    AccessPolicy, AllowList, EngineConfig, Exchange, HttpEngine, ServiceRegistry,
};
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Method, Response, StatusCode, Uri};
use parking_lot::Mutex;

fn completed<T: Send + 'static>(future: Future<T>) -> Option<Outcome<T>> {
    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    future.on_completion(move |outcome| *sink.lock() = Some(outcome));
    let outcome = slot.lock().take();
    outcome
}

fn respond(exchange: Exchange) -> Response<Bytes> {
    exchange.body.finish();
    completed(exchange.response)
        .expect("response completed")
        .expect("response future never fails")
}

fn get(engine: &HttpEngine, path: &'static str) -> Response<Bytes> {
    let head = RequestHead::new(Method::GET, Uri::from_static(path));
    respond(engine.accept(head, ConsumerIdentity::anonymous()))
}

fn json(response: &Response<Bytes>) -> serde_json::Value {
    serde_json::from_slice(response.body()).unwrap()
}

fn orders() -> HttpService {
    HttpService::builder("orders")
        .base_path("/orders")
        .encoding("json")
        .get("/#id", |request: ServiceRequest, response: ServiceResponse| {
            match request.param("id") {
                Some("0") => Future::failure(failures::bad_request("order ids start at 1")),
                Some("crash") => Future::failure(Failure::error("ledger offline")),
                Some(id) => {
                    let body = format!("order {id}");
                    Future::success(response.with_status(StatusCode::OK).with_body(body))
                }
                None => Future::failure(Failure::no_such_element()),
            }
        })
        .post("/", |request: ServiceRequest, response: ServiceResponse| {
            request.body().text().map(move |text| {
                response
                    .with_status(StatusCode::CREATED)
                    .with_body(format!("stored {text}"))
            })
        })
        .build()
        .unwrap()
}

#[test]
fn test_unrouted_request_is_bare_404() {
    let engine = HttpEngine::new(EngineConfig::default());
    engine.provide(orders()).unwrap();
    let response = get(&engine, "/invoices/7");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().is_empty());
    assert!(response.body().is_empty());
}

#[test]
fn test_unmatched_route_uses_configured_message() {
    let config = EngineConfig::builder().not_found_message("no such thing").build();
    let engine = HttpEngine::new(config);
    engine.provide(orders()).unwrap();
    let response = get(&engine, "/orders/7/lines");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body().as_ref(), b"no such thing");
}

#[test]
fn test_handled_request() {
    let engine = HttpEngine::new(EngineConfig::default());
    engine.provide(orders()).unwrap();
    let response = get(&engine, "/orders/42");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), b"order 42");
}

#[test]
fn test_internal_failure_hides_message() {
    let engine = HttpEngine::new(EngineConfig::default());
    engine.provide(orders()).unwrap();
    let response = get(&engine, "/orders/crash");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    assert_eq!(json(&response)["error"]["message"], "internal server error");
}

#[test]
fn test_internal_failure_message_can_be_exposed() {
    let config = EngineConfig::builder().expose_failure_messages(true).build();
    let engine = HttpEngine::new(config);
    engine.provide(orders()).unwrap();
    let response = get(&engine, "/orders/crash");
    assert_eq!(json(&response)["error"]["message"], "ledger offline");
}

#[test]
fn test_client_failure_keeps_message() {
    let engine = HttpEngine::new(EngineConfig::default());
    engine.provide(orders()).unwrap();
    let response = get(&engine, "/orders/0");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(&response);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(body["error"]["message"], "order ids start at 1");
}

#[test]
fn test_body_delivered_after_accept() {
    let engine = HttpEngine::new(EngineConfig::default());
    engine.provide(orders()).unwrap();
    let head = RequestHead::new(Method::POST, Uri::from_static("/orders"))
        .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let exchange = engine.accept(head, ConsumerIdentity::anonymous());

    exchange.body.append("[1,");
    let Exchange { body, response } = exchange;
    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    response.on_completion(move |outcome| *sink.lock() = Some(outcome));
    assert!(slot.lock().is_none());

    body.append("2]");
    body.finish();
    assert!(body.is_committed());
    let response = slot.lock().take().unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.body().as_ref(), b"stored [1,2]");
}

#[test]
fn test_oversized_body_is_413() {
    let config = EngineConfig::builder().max_body_size(Some(4)).build();
    let engine = HttpEngine::new(config);
    engine.provide(orders()).unwrap();
    let head = RequestHead::new(Method::POST, Uri::from_static("/orders"));
    let exchange = engine.accept(head, ConsumerIdentity::anonymous());
    exchange.body.append("too long");
    let response = respond(exchange);
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[test]
fn test_default_config_limits_body_size() {
    let engine = HttpEngine::new(EngineConfig::default());
    engine.provide(orders()).unwrap();
    let head = RequestHead::new(Method::POST, Uri::from_static("/orders"));
    let exchange = engine.accept(head, ConsumerIdentity::anonymous());
    let chunk = Bytes::from(vec![b'x'; 64 * 1024]);
    for _ in 0..=DEFAULT_MAX_BODY_SIZE / chunk.len() {
        exchange.body.append(chunk.clone());
    }
    let response = respond(exchange);
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[test]
fn test_lifted_body_limit_accepts_large_body() {
    let engine = HttpEngine::new(EngineConfig::builder().max_body_size(None).build());
    engine.provide(orders()).unwrap();
    let head = RequestHead::new(Method::POST, Uri::from_static("/orders"));
    let exchange = engine.accept(head, ConsumerIdentity::anonymous());
    let chunk = Bytes::from(vec![b'x'; 64 * 1024]);
    for _ in 0..=DEFAULT_MAX_BODY_SIZE / chunk.len() {
        exchange.body.append(chunk.clone());
    }
    let response = respond(exchange);
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[test]
fn test_unaccepted_encoding_is_415() {
    let engine = HttpEngine::new(EngineConfig::default());
    engine.provide(orders()).unwrap();
    let head = RequestHead::new(Method::POST, Uri::from_static("/orders"))
        .with_header(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
    let response = respond(engine.accept(head, ConsumerIdentity::anonymous()));
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(json(&response)["error"]["category"], "unsupported_media_type");
}

#[test]
fn test_policy_denial_is_403() {
    let engine =
        HttpEngine::new(EngineConfig::default()).with_policy(AllowList::new().allow("billing"));
    engine.provide(orders()).unwrap();

    let head = RequestHead::new(Method::GET, Uri::from_static("/orders/1"));
    let denied = respond(engine.accept(head, ConsumerIdentity::system("marketing")));
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let head = RequestHead::new(Method::GET, Uri::from_static("/orders/1"));
    let allowed = respond(engine.accept(head, ConsumerIdentity::system("billing")));
    assert_eq!(allowed.status(), StatusCode::OK);
}

struct TokenPolicy {
    seen: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl AccessPolicy for TokenPolicy {
    fn is_authorized(
        &self,
        _consumer: &ConsumerIdentity,
        provider: &str,
        _service: &ServiceDescriptor,
        token: Option<&str>,
    ) -> Future<bool> {
        self.seen
            .lock()
            .push((provider.to_string(), token.map(ToString::to_string)));
        Future::success(token == Some("let-me-in"))
    }
}

#[test]
fn test_policy_receives_bearer_token() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let config = EngineConfig::builder().provider_name("warehouse").build();
    let engine = HttpEngine::new(config).with_policy(TokenPolicy {
        seen: Arc::clone(&seen),
    });
    engine.provide(orders()).unwrap();

    let head = RequestHead::new(Method::GET, Uri::from_static("/orders/3"))
        .with_header(AUTHORIZATION, HeaderValue::from_static("Bearer let-me-in"));
    assert_eq!(
        respond(engine.accept(head, ConsumerIdentity::anonymous())).status(),
        StatusCode::OK
    );
    assert_eq!(get(&engine, "/orders/3").status(), StatusCode::FORBIDDEN);

    let seen = seen.lock();
    assert_eq!(seen[0], ("warehouse".to_string(), Some("let-me-in".to_string())));
    assert_eq!(seen[1], ("warehouse".to_string(), None));
}

struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl ServiceRegistry for Recorder {
    fn on_provide(&self, descriptor: &ServiceDescriptor) {
        self.events.lock().push(format!("+{}", descriptor.name()));
    }

    fn on_dismiss(&self, descriptor: &ServiceDescriptor) {
        self.events.lock().push(format!("-{}", descriptor.name()));
    }
}

#[test]
fn test_registry_sees_lifecycle() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let engine = HttpEngine::new(EngineConfig::default()).with_registry(Recorder {
        events: Arc::clone(&events),
    });
    engine.provide(orders()).unwrap();
    assert!(engine.provide(orders()).is_err());
    engine
        .provide(HttpService::builder("root").build().unwrap())
        .unwrap();
    engine.dismiss("/orders");
    engine.dismiss_all();
    assert_eq!(*events.lock(), vec!["+orders", "+root", "-orders", "-root"]);
}

#[test]
fn test_abort_after_commit_asks_to_close_connection() {
    let engine = HttpEngine::new(EngineConfig::default());
    engine.provide(orders()).unwrap();
    let head = RequestHead::new(Method::GET, Uri::from_static("/orders/5"));
    let Exchange { body, response } = engine.accept(head, ConsumerIdentity::anonymous());
    let response = completed(response).unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body.is_committed());
    assert!(body.abort(Failure::error("connection reset")));
}

#[test]
fn test_abort_before_commit_reaches_route() {
    let engine = HttpEngine::new(EngineConfig::default());
    engine.provide(orders()).unwrap();
    let head = RequestHead::new(Method::POST, Uri::from_static("/orders"));
    let Exchange { body, response } = engine.accept(head, ConsumerIdentity::anonymous());
    body.append("[1,");
    assert!(!body.is_committed());
    assert!(!body.abort(failures::bad_request("truncated upload")));
    let response = completed(response).unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
