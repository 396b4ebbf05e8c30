//! The HTTP engine.
//!
//! [`HttpEngine`] owns the provided services and turns each request head the
//! transport hands it into an [`Exchange`]: a body sink the transport feeds
//! as chunks arrive, and a future of the response to write back.
//!
//! Per exchange the engine
//!
//! 1. picks the service with the longest base path matching the request path,
//!    answering an empty 404 when there is none;
//! 2. rejects request bodies in an encoding the service does not accept (415);
//! 3. asks the [`AccessPolicy`] whether the consumer may use the service;
//! 4. dispatches to the service's route sequences, answering 404 if no route
//!    matches.
//!
//! Any failure left over is answered by the fallback: a JSON
//! [`ErrorEnvelope`] whose status follows the failure's
//! [`ErrorCategory`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arrowhead_core::error::failures;
use arrowhead_core::{
    relative_path, BodySender, ConsumerIdentity, Dispatch, ErrorCategory, ErrorEnvelope,
    HasHeaders, HttpService, IncomingBody, RequestHead, RouteTask, ServiceDescriptor,
    ServiceError, ServiceRequest, ServiceResponse,
};
use arrowhead_future::{Failure, Future};
use arrowhead_telemetry::metrics::{self, InFlightGuard, UNROUTED};
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Response, StatusCode};
use parking_lot::RwLock;

use crate::config::EngineConfig;
use crate::policy::{AccessPolicy, Unrestricted};
use crate::registry::{NoopRegistry, ServiceRegistry};

/// Routes requests to provided services.
pub struct HttpEngine {
    config: EngineConfig,
    services: RwLock<Vec<HttpService>>,
    policy: Arc<dyn AccessPolicy>,
    registry: Arc<dyn ServiceRegistry>,
}

impl HttpEngine {
    /// Creates an engine that allows every consumer and reports to no
    /// registry.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            services: RwLock::new(Vec::new()),
            policy: Arc::new(Unrestricted),
            registry: Arc::new(NoopRegistry),
        }
    }

    /// Replaces the access policy.
    #[must_use]
    pub fn with_policy(mut self, policy: impl AccessPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Replaces the service registry.
    #[must_use]
    pub fn with_registry(mut self, registry: impl ServiceRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Starts providing `service`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::DuplicateService`] if a service is already
    /// mounted at the same base path.
    pub fn provide(&self, service: HttpService) -> Result<(), ServiceError> {
        {
            let mut services = self.services.write();
            if services.iter().any(|s| s.base_path() == service.base_path()) {
                return Err(ServiceError::DuplicateService {
                    base_path: service.base_path().to_string(),
                });
            }
            services.push(service.clone());
        }
        tracing::info!(
            service = service.name(),
            base_path = service.base_path(),
            routes = service.sequences().len(),
            "service provided"
        );
        self.registry.on_provide(service.descriptor());
        Ok(())
    }

    /// Stops providing the service mounted at `base_path`.
    ///
    /// Exchanges already dispatched to it run to completion.
    pub fn dismiss(&self, base_path: &str) -> Option<ServiceDescriptor> {
        let wanted = canonical_base_path(base_path);
        let removed = {
            let mut services = self.services.write();
            let index = services.iter().position(|s| s.base_path() == wanted)?;
            services.remove(index)
        };
        self.announce_dismissal(&removed);
        Some(removed.descriptor().clone())
    }

    /// Stops providing every service.
    pub fn dismiss_all(&self) {
        let removed = std::mem::take(&mut *self.services.write());
        for service in &removed {
            self.announce_dismissal(service);
        }
    }

    fn announce_dismissal(&self, service: &HttpService) {
        tracing::info!(service = service.name(), "service dismissed");
        self.registry.on_dismiss(service.descriptor());
    }

    /// Returns the descriptors of all provided services.
    #[must_use]
    pub fn services(&self) -> Vec<ServiceDescriptor> {
        self.services
            .read()
            .iter()
            .map(|s| s.descriptor().clone())
            .collect()
    }

    /// Returns the service with the longest base path containing `path`.
    #[must_use]
    pub fn find_service(&self, path: &str) -> Option<HttpService> {
        self.services
            .read()
            .iter()
            .filter(|s| relative_path(s.base_path(), path).is_some())
            .max_by_key(|s| s.base_path().trim_end_matches('/').len())
            .cloned()
    }

    /// Starts an exchange for a request head received by the transport.
    ///
    /// The transport feeds the request body into [`Exchange::body`] while the
    /// engine works, and writes [`Exchange::response`] back once it
    /// completes. The response future never fails.
    pub fn accept(&self, head: RequestHead, identity: ConsumerIdentity) -> Exchange {
        let started = Instant::now();
        let in_flight = InFlightGuard::new();
        let head = Arc::new(head.with_identity(identity));
        let (sender, incoming) = arrowhead_core::body::channel(self.config.max_body_size());

        tracing::debug!(
            request_id = %head.request_id(),
            http.method = %head.method(),
            http.path = head.path(),
            consumer = %head.identity().log_id(),
            "exchange accepted"
        );

        let service = self.find_service(head.path());
        let label = service
            .as_ref()
            .map_or_else(|| UNROUTED.to_string(), |s| s.name().to_string());
        let response = match service {
            Some(service) => self.serve(service, Arc::clone(&head), incoming),
            None => Future::success(not_found(self.config.not_found_message())),
        };

        let committed = Arc::new(AtomicBool::new(false));
        let commit = Arc::clone(&committed);
        let expose = self.config.expose_failure_messages();
        let fallback_label = label.clone();
        let response = response
            .recover(move |failure| Ok(fallback(failure, &head, &fallback_label, expose)))
            .map(move |response| {
                drop(in_flight);
                commit.store(true, Ordering::Release);
                metrics::record_request(&label, response.status().as_u16(), started.elapsed());
                response
            });

        Exchange {
            body: ExchangeBody { sender, committed },
            response,
        }
    }

    fn serve(
        &self,
        service: HttpService,
        head: Arc<RequestHead>,
        incoming: IncomingBody,
    ) -> Future<Response<Bytes>> {
        if let Some(encoding) = head.content_encoding() {
            if !service.accepts_encoding(&encoding) {
                return Future::failure(failures::unsupported_media_type(encoding.name()));
            }
        }

        let token = head
            .header(AUTHORIZATION.as_str())
            .map(|value| value.strip_prefix("Bearer ").unwrap_or(value));
        let authorized = self.policy.is_authorized(
            head.identity(),
            self.config.provider_name(),
            service.descriptor(),
            token,
        );

        let not_found_message = self.config.not_found_message().map(ToString::to_string);
        authorized
            .flat_map(move |allowed| {
                if !allowed {
                    return Future::failure(failures::forbidden(format!(
                        "{} may not use service `{}`",
                        head.identity().log_id(),
                        service.name()
                    )));
                }
                let task = RouteTask::new(
                    service.base_path(),
                    ServiceRequest::from_shared(head, incoming),
                    ServiceResponse::new(),
                );
                service.dispatch(task)
            })
            .try_map(move |dispatch| match dispatch {
                Dispatch::Handled(response) => response.into_http(),
                Dispatch::Unhandled(_) => Ok(not_found(not_found_message.as_deref())),
            })
    }
}

impl std::fmt::Debug for HttpEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEngine")
            .field("config", &self.config)
            .field("services", &self.services.read().len())
            .finish_non_exhaustive()
    }
}

/// `/catalog/` and `/catalog` name the same mount point.
fn canonical_base_path(base_path: &str) -> &str {
    match base_path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// A 404 with no headers and, unless configured, no body.
fn not_found(message: Option<&str>) -> Response<Bytes> {
    let body = message.map_or_else(Bytes::new, |m| Bytes::copy_from_slice(m.as_bytes()));
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

/// Answers a failure nothing else handled.
fn fallback(failure: &Failure, head: &RequestHead, service: &str, expose: bool) -> Response<Bytes> {
    let category = ErrorCategory::of(failure);
    let request_id = head.request_id().to_string();
    if category.is_client_error() {
        tracing::debug!(
            request_id = %request_id,
            service,
            error.class = %failure.class(),
            failure = %failure,
            "request rejected"
        );
    } else {
        tracing::error!(
            request_id = %request_id,
            service,
            error.class = %failure.class(),
            failure = %failure,
            "unhandled failure"
        );
        metrics::record_unhandled_failure(service);
    }

    let envelope = ErrorEnvelope::from_failure(failure, Some(&request_id), expose);
    let mut response = Response::new(Bytes::from(envelope.to_json()));
    *response.status_mut() = category.status_code();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// An accepted request in progress.
pub struct Exchange {
    /// Where the transport delivers the request body.
    pub body: ExchangeBody,
    /// The response to send. Never fails.
    pub response: Future<Response<Bytes>>,
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

/// The transport's handle on a request body.
#[derive(Debug)]
pub struct ExchangeBody {
    sender: BodySender,
    committed: Arc<AtomicBool>,
}

impl ExchangeBody {
    /// Delivers the next chunk.
    pub fn append(&self, chunk: impl Into<Bytes>) {
        self.sender.append(chunk);
    }

    /// Signals the end of the body.
    pub fn finish(&self) {
        self.sender.finish();
    }

    /// Signals that the body cannot be completed.
    ///
    /// After the response was produced the failure can no longer reach
    /// anyone: it is logged and `true` is returned, telling the transport to
    /// close the connection.
    pub fn abort(&self, failure: Failure) -> bool {
        let committed = self.is_committed();
        if committed {
            tracing::warn!(
                failure = %failure,
                "request body failed after the response was committed; closing connection"
            );
        }
        self.sender.abort(failure);
        committed
    }

    /// Returns `true` once the response was produced.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Uri};

    fn service(name: &str, base_path: &str) -> HttpService {
        let body = name.to_string();
        HttpService::builder(name)
            .base_path(base_path)
            .route_any_method("/>", move |_: ServiceRequest, response: ServiceResponse| {
                Future::success(response.with_status(StatusCode::OK).with_body(body.clone()))
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_canonical_base_path() {
        assert_eq!(canonical_base_path("/"), "/");
        assert_eq!(canonical_base_path("/catalog/"), "/catalog");
        assert_eq!(canonical_base_path("/catalog"), "/catalog");
    }

    #[test]
    fn test_find_service_prefers_longest_base_path() {
        let engine = HttpEngine::new(EngineConfig::default());
        engine.provide(service("root", "/")).unwrap();
        engine.provide(service("catalog", "/catalog")).unwrap();
        engine.provide(service("featured", "/catalog/featured")).unwrap();

        let name = |path| engine.find_service(path).map(|s| s.name().to_string());
        assert_eq!(name("/catalog/featured/lamp").as_deref(), Some("featured"));
        assert_eq!(name("/catalog/featuredx").as_deref(), Some("catalog"));
        assert_eq!(name("/catalog").as_deref(), Some("catalog"));
        assert_eq!(name("/orders").as_deref(), Some("root"));
    }

    #[test]
    fn test_duplicate_base_path_rejected() {
        let engine = HttpEngine::new(EngineConfig::default());
        engine.provide(service("a", "/shop")).unwrap();
        let error = engine.provide(service("b", "/shop/")).unwrap_err();
        assert!(matches!(error, ServiceError::DuplicateService { .. }));
    }

    #[test]
    fn test_dismiss() {
        let engine = HttpEngine::new(EngineConfig::default());
        engine.provide(service("shop", "/shop")).unwrap();
        assert!(engine.dismiss("/nowhere").is_none());
        assert_eq!(engine.dismiss("/shop/").unwrap().name(), "shop");
        assert!(engine.find_service("/shop/cart").is_none());
        assert!(engine.services().is_empty());
    }

    #[test]
    fn test_not_found_has_no_headers() {
        let response = not_found(None);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().is_empty());
        assert!(response.body().is_empty());
        assert_eq!(not_found(Some("gone")).body(), "gone");
    }

    #[test]
    fn test_fallback_envelope() {
        let head = RequestHead::new(Method::GET, Uri::from_static("/"));
        let response = fallback(&Failure::error("secret detail"), &head, "shop", false);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let json: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(json["error"]["message"], "internal server error");
        assert_eq!(json["request_id"], head.request_id().to_string());
    }
}
