//! # Arrowhead
//!
//! A framework for providing networked operations ("Arrowhead services")
//! over HTTP.
//!
//! - [`future`] - single-assignment futures, promises and publishers that
//!   every operation returns
//! - [`router`] - path patterns and the specialization order of routes
//! - [`core`] - requests, responses, route sequences and services
//! - [`server`] - the engine and its HTTP/1.1 transport
//! - [`telemetry`] - logging and metrics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arrowhead::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_telemetry(&TelemetryConfig::default())?;
//!
//!     let engine = HttpEngine::new(EngineConfig::default());
//!     engine.provide(
//!         HttpService::builder("greeter")
//!             .base_path("/greet")
//!             .get("/#name", |request: ServiceRequest, response: ServiceResponse| {
//!                 let name = request.param("name").unwrap_or_default().to_string();
//!                 Future::success(response.with_status(StatusCode::OK).with_body(name))
//!             })
//!             .build()?,
//!     )?;
//!
//!     Server::new(engine).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Request flow
//!
//! ```text
//! head ─▶ service (longest base path) ─▶ access policy ─▶ route sequence
//!                                                        validators ─▶ route ─▶ catchers
//! ```

#![doc(html_root_url = "https://docs.rs/arrowhead/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use arrowhead_core as core;
pub use arrowhead_future as future;
pub use arrowhead_router as router;
pub use arrowhead_server as server;
pub use arrowhead_telemetry as telemetry;

/// The types most services need.
///
/// ```rust
/// use arrowhead::prelude::*;
///
/// let doubled = Future::success(21).map(|n| n * 2);
/// doubled.if_success(|n| assert_eq!(n, 42));
/// ```
pub mod prelude {
    pub use arrowhead_future::{class, ErrorClass, Failure, Future, Outcome, Promise, Publisher};

    pub use arrowhead_router::{HttpPattern, Params};

    pub use arrowhead_core::error::failures;
    pub use arrowhead_core::{
        CatcherHandler, ConsumerIdentity, Decoder, Encoder, Handling, HasBody, HasHeaders,
        HasHeadersMut, HasStatus, HttpService, JsonCodec, RequestHead, RouteHandler,
        ServiceError, ServiceRequest, ServiceResponse, ValidatorHandler,
    };

    pub use arrowhead_server::{
        AccessPolicy, EngineConfig, HttpEngine, Server, ServiceRegistry, ShutdownSignal,
    };

    pub use arrowhead_telemetry::{init_telemetry, TelemetryConfig};

    pub use http::{Method, StatusCode};
}
