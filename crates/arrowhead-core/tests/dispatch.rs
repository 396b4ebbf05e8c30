//! End-to-end dispatch through built services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arrowhead_core::body;
use arrowhead_core::error::{failures, ROUTE_CONFIGURATION};
use arrowhead_core::{
    ConsumerIdentity, Dispatch, Handling, HasBody, HasStatus, HttpService, IncomingBody,
    RequestHead, RouteTask, ServiceRequest, ServiceResponse,
};
use arrowhead_future::class;
use arrowhead_future::{Failure, Future, Outcome};
use http::{Method, StatusCode, Uri};
use parking_lot::Mutex;

fn request(method: Method, path: &'static str) -> ServiceRequest {
    ServiceRequest::new(
        RequestHead::new(method, Uri::from_static(path)),
        IncomingBody::empty(),
    )
}

fn run(service: &HttpService, request: ServiceRequest) -> Outcome<Dispatch> {
    let task = RouteTask::new(service.base_path(), request, ServiceResponse::new());
    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    service
        .dispatch(task)
        .on_completion(move |outcome| *sink.lock() = Some(outcome));
    let outcome = slot.lock().take();
    outcome.expect("dispatch completed synchronously")
}

fn response(outcome: Outcome<Dispatch>) -> ServiceResponse {
    match outcome.unwrap() {
        Dispatch::Handled(response) => response,
        Dispatch::Unhandled(_) => panic!("request was not handled"),
    }
}

fn text(response: &ServiceResponse) -> &str {
    std::str::from_utf8(response.body()).unwrap()
}

fn ok(body: &'static str) -> impl Fn(ServiceRequest, ServiceResponse) -> Future<ServiceResponse> {
    move |_: ServiceRequest, response: ServiceResponse| {
        Future::success(response.with_status(StatusCode::OK).with_body(body))
    }
}

#[test]
fn test_resolution_prefers_specialized_routes() {
    let service = HttpService::builder("catalog")
        .base_path("/catalog")
        .route_any_method("/>", ok("anything"))
        .get("/#category/#item", ok("item"))
        .get("/featured/#item", ok("featured item"))
        .get("/featured/today", ok("today"))
        .build()
        .unwrap();

    let cases = [
        (Method::GET, "/catalog/featured/today", "today"),
        (Method::GET, "/catalog/featured/lamp", "featured item"),
        (Method::GET, "/catalog/tools/hammer", "item"),
        (Method::POST, "/catalog/tools/hammer", "anything"),
        (Method::GET, "/catalog", "anything"),
    ];
    for (method, path, expected) in cases {
        let reply = response(run(&service, request(method, path)));
        assert_eq!(text(&reply), expected, "{path}");
    }
}

#[test]
fn test_rejecting_validator_stops_everything() {
    let handler_calls = Arc::new(AtomicUsize::new(0));
    let catcher_calls = Arc::new(AtomicUsize::new(0));
    let handler_counter = Arc::clone(&handler_calls);
    let catcher_counter = Arc::clone(&catcher_calls);

    let service = HttpService::builder("vault")
        .validate(|request: &ServiceRequest, response: ServiceResponse| {
            if request.identity().is_anonymous() {
                Future::success(Handling::Handled(
                    response.with_status(StatusCode::UNAUTHORIZED),
                ))
            } else {
                Future::success(Handling::Declined(response))
            }
        })
        .get("/secret", move |_: ServiceRequest, response: ServiceResponse| {
            handler_counter.fetch_add(1, Ordering::SeqCst);
            Future::success(response.with_status(StatusCode::OK))
        })
        .catch(
            &class::ERROR,
            move |_: &Failure, _: &RequestHead, response: ServiceResponse| {
                catcher_counter.fetch_add(1, Ordering::SeqCst);
                Future::success(Handling::Handled(response.with_status(StatusCode::OK)))
            },
        )
        .build()
        .unwrap();

    let rejected = response(run(&service, request(Method::GET, "/secret")));
    assert_eq!(rejected.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
    assert_eq!(catcher_calls.load(Ordering::SeqCst), 0);

    let head = RequestHead::new(Method::GET, Uri::from_static("/secret"))
        .with_identity(ConsumerIdentity::system("auditor"));
    let admitted = response(run(&service, ServiceRequest::new(head, IncomingBody::empty())));
    assert_eq!(admitted.status(), Some(StatusCode::OK));
    assert_eq!(handler_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_narrowest_catcher_wins_regardless_of_registration() {
    let service = HttpService::builder("files")
        .get("/#name", |request: ServiceRequest, _: ServiceResponse| {
            let name = request.param("name").unwrap_or_default().to_string();
            Future::failure(Failure::new(&class::FILE_NOT_FOUND, name))
        })
        .catch(
            &class::IO,
            |_: &Failure, _: &RequestHead, response: ServiceResponse| {
                Future::success(Handling::Handled(
                    response.with_status(StatusCode::SERVICE_UNAVAILABLE),
                ))
            },
        )
        .catch(
            &class::FILE_NOT_FOUND,
            |failure: &Failure, _: &RequestHead, response: ServiceResponse| {
                let response = response
                    .with_status(StatusCode::NOT_FOUND)
                    .with_body(format!("no file {}", failure.message()));
                Future::success(Handling::Handled(response))
            },
        )
        .build()
        .unwrap();

    let reply = response(run(&service, request(Method::GET, "/report.pdf")));
    assert_eq!(reply.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(text(&reply), "no file report.pdf");
}

#[test]
fn test_catcher_response_starts_fresh() {
    let service = HttpService::builder("drafts")
        .get("/draft", |_: ServiceRequest, _: ServiceResponse| {
            Future::failure(failures::forbidden("drafts are private"))
        })
        .catch(
            &arrowhead_core::error::FORBIDDEN,
            |_: &Failure, _: &RequestHead, response: ServiceResponse| {
                assert!(response.status().is_none());
                assert!(response.body().is_empty());
                Future::success(Handling::Handled(response.with_status(StatusCode::FORBIDDEN)))
            },
        )
        .build()
        .unwrap();
    let reply = response(run(&service, request(Method::GET, "/draft")));
    assert_eq!(reply.status(), Some(StatusCode::FORBIDDEN));
}

#[test]
fn test_route_without_status_is_a_failure() {
    let service = HttpService::builder("sloppy")
        .get("/", |_: ServiceRequest, response: ServiceResponse| {
            Future::success(response.with_body("forgot the status"))
        })
        .build()
        .unwrap();
    let failure = run(&service, request(Method::GET, "/")).unwrap_err();
    assert!(failure.is(&ROUTE_CONFIGURATION));
}

#[test]
fn test_unclaimed_failure_propagates() {
    let service = HttpService::builder("flaky")
        .get("/", |_: ServiceRequest, _: ServiceResponse| {
            Future::failure(Failure::error("database unreachable"))
        })
        .catch(
            &class::IO,
            |_: &Failure, _: &RequestHead, response: ServiceResponse| {
                Future::success(Handling::Handled(response.with_status(StatusCode::OK)))
            },
        )
        .build()
        .unwrap();
    let failure = run(&service, request(Method::GET, "/")).unwrap_err();
    assert_eq!(failure.message(), "database unreachable");
}

#[test]
fn test_no_matching_route_returns_task() {
    let service = HttpService::builder("empty")
        .base_path("/empty")
        .get("/only", ok("only"))
        .build()
        .unwrap();
    match run(&service, request(Method::GET, "/empty/other")).unwrap() {
        Dispatch::Unhandled(task) => {
            let (request, response) = task.into_parts();
            assert_eq!(request.path(), "/empty/other");
            assert!(response.status().is_none());
        }
        Dispatch::Handled(_) => panic!("unexpected match"),
    }
}

#[test]
fn test_handler_reads_body_delivered_after_dispatch() {
    let service = HttpService::builder("echo")
        .post("/echo", |request: ServiceRequest, response: ServiceResponse| {
            request.body().text().map(move |text| {
                response
                    .with_status(StatusCode::OK)
                    .with_body(text.to_uppercase())
            })
        })
        .build()
        .unwrap();

    let (sender, incoming) = body::channel(None);
    sender.append("hello ");
    let head = RequestHead::new(Method::POST, Uri::from_static("/echo"));
    let task = RouteTask::new(
        service.base_path(),
        ServiceRequest::new(head, incoming),
        ServiceResponse::new(),
    );

    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    service
        .dispatch(task)
        .on_completion(move |outcome| *sink.lock() = Some(outcome));
    assert!(slot.lock().is_none());

    sender.append("world");
    sender.finish();
    let outcome = slot.lock().take().unwrap();
    let reply = response(outcome);
    assert_eq!(text(&reply), "HELLO WORLD");
}

#[test]
fn test_dispatch_can_be_awaited() {
    let service = HttpService::builder("await")
        .get("/ping", ok("pong"))
        .build()
        .unwrap();
    let task = RouteTask::new(
        service.base_path(),
        request(Method::GET, "/ping"),
        ServiceResponse::new(),
    );
    let outcome = tokio_test::block_on(async { service.dispatch(task).await });
    tokio_test::assert_ok!(&outcome);
    let reply = response(outcome);
    assert_eq!(text(&reply), "pong");
}
