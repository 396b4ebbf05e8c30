//! # Arrowhead Server
//!
//! Hosts Arrowhead services: the [`HttpEngine`] resolves each request to a
//! provided service and runs its route sequences, and [`Server`] carries the
//! engine over HTTP/1.1.
//!
//! ## Modules
//!
//! - [`engine`] - service lookup, access checks, dispatch and fallbacks
//! - [`config`] - engine and transport settings
//! - [`policy`] - consumer authorization seam
//! - [`registry`] - service lifecycle hooks
//! - [`server`] - hyper transport
//! - [`shutdown`] - shutdown signal and connection draining
//!
//! ## Example
//!
//! ```rust
//! use arrowhead_core::{ConsumerIdentity, HttpService, RequestHead, ServiceRequest, ServiceResponse};
//! use arrowhead_future::Future;
//! use arrowhead_server::{EngineConfig, HttpEngine};
//! use http::{Method, StatusCode, Uri};
//!
//! let engine = HttpEngine::new(EngineConfig::default());
//! engine
//!     .provide(
//!         HttpService::builder("greeter")
//!             .base_path("/greet")
//!             .get("/#name", |request: ServiceRequest, response: ServiceResponse| {
//!                 let name = request.param("name").unwrap_or("stranger").to_string();
//!                 Future::success(response.with_status(StatusCode::OK).with_body(name))
//!             })
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! let head = RequestHead::new(Method::GET, Uri::from_static("/greet/ada"));
//! let exchange = engine.accept(head, ConsumerIdentity::anonymous());
//! exchange.body.finish();
//! exchange.response.if_success(|response| {
//!     assert_eq!(response.status(), StatusCode::OK);
//!     assert_eq!(response.body().as_ref(), b"ada");
//! });
//! ```

#![doc(html_root_url = "https://docs.rs/arrowhead-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod policy;
pub mod registry;
pub mod server;
pub mod shutdown;

pub use config::{ConfigError, EngineConfig, EngineConfigBuilder};
pub use engine::{Exchange, ExchangeBody, HttpEngine};
pub use policy::{AccessPolicy, AllowList, Unrestricted};
pub use registry::{NoopRegistry, ServiceRegistry};
pub use server::{Server, ServerError};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
