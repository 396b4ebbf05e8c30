//! HTTP/1.1 transport for an [`HttpEngine`], built on hyper and tokio.
//!
//! Each connection is served by hyper. For every request the server hands
//! the head to the engine, pumps the body frames into the exchange from a
//! separate task, and writes the engine's response back.
//!
//! Certificates are not inspected here, so every consumer is anonymous.
//!
//! # Example
//!
//! ```rust,no_run
//! use arrowhead_core::{HttpService, ServiceRequest, ServiceResponse};
//! use arrowhead_future::Future;
//! use arrowhead_server::{EngineConfig, HttpEngine, Server};
//! use http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = HttpEngine::new(EngineConfig::default());
//!     engine.provide(
//!         HttpService::builder("health")
//!             .base_path("/health")
//!             .get("/", |_: ServiceRequest, response: ServiceResponse| {
//!                 Future::success(response.with_status(StatusCode::OK))
//!             })
//!             .build()?,
//!     )?;
//!
//!     Server::new(engine).run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use arrowhead_core::{ConsumerIdentity, RequestHead};
use arrowhead_future::{class, Failure};
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

use crate::engine::{Exchange, ExchangeBody, HttpEngine};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address is invalid or cannot be bound.
    #[error("cannot bind: {0}")]
    Bind(String),

    /// The listener failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serves an engine over HTTP/1.1.
#[derive(Debug, Clone)]
pub struct Server {
    engine: Arc<HttpEngine>,
}

impl Server {
    /// Wraps an engine.
    #[must_use]
    pub fn new(engine: HttpEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Returns the engine, to provide or dismiss services while running.
    #[must_use]
    pub const fn engine(&self) -> &Arc<HttpEngine> {
        &self.engine
    }

    /// Serves until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the configured address cannot be
    /// bound.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals())
            .await
    }

    /// Binds the configured address and serves until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the configured address cannot be
    /// bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let config = self.engine.config();
        let addr = config.socket_addr().map_err(|e| {
            ServerError::Bind(format!("invalid address `{}`: {e}", config.http_addr()))
        })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("{addr}: {e}")))?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections accepted by `listener` until `shutdown` triggers.
    ///
    /// On shutdown the server stops accepting, lets open connections finish
    /// their current requests for up to the configured timeout, then
    /// dismisses every service.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the listener address cannot be read.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        tracing::info!(addr = %listener.local_addr()?, "listening");
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let engine = Arc::clone(&self.engine);
                        let shutdown = shutdown.clone();
                        let token = tracker.acquire();
                        tokio::spawn(async move {
                            serve_connection(engine, stream, remote, shutdown).await;
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                },
                () = shutdown.recv() => break,
            }
        }

        let timeout = self.engine.config().shutdown_timeout();
        tracing::info!(
            connections = tracker.active_connections(),
            timeout_secs = timeout.as_secs(),
            "draining connections"
        );
        if tokio::time::timeout(timeout, tracker.wait_idle()).await.is_err() {
            tracing::warn!(
                connections = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }

        self.engine.dismiss_all();
        tracing::info!("server stopped");
        Ok(())
    }
}

async fn serve_connection(
    engine: Arc<HttpEngine>,
    stream: TcpStream,
    remote: SocketAddr,
    shutdown: ShutdownSignal,
) {
    let close = Arc::new(Notify::new());
    let close_requested = Arc::clone(&close);
    let service = service_fn(move |request: Request<Incoming>| {
        let engine = Arc::clone(&engine);
        let close = Arc::clone(&close_requested);
        async move { Ok::<_, Infallible>(handle(&engine, request, close).await) }
    });
    let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    tokio::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        () = shutdown.recv() => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
        // Dropping the connection closes the socket without draining.
        () = close.notified() => {
            tracing::debug!(%remote, "closing connection after a late request body failure");
            return;
        }
    };
    if let Err(e) = result {
        tracing::debug!(%remote, error = %e, "connection closed with error");
    }
}

async fn handle(
    engine: &HttpEngine,
    request: Request<Incoming>,
    close: Arc<Notify>,
) -> Response<Full<Bytes>> {
    let (parts, incoming) = request.into_parts();
    let head = RequestHead::from_parts(parts, ConsumerIdentity::anonymous());
    let Exchange { body, response } = engine.accept(head, ConsumerIdentity::anonymous());
    tokio::spawn(pump(incoming, body, close));

    match response.await {
        Ok(response) => response.map(Full::new),
        // The engine answers every failure itself; this is a dropped exchange.
        Err(failure) => {
            tracing::error!(%failure, "exchange ended without a response");
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

/// Feeds the request body into the exchange as frames arrive.
///
/// A frame error after the response was committed closes the connection.
async fn pump(mut incoming: Incoming, body: ExchangeBody, close: Arc<Notify>) {
    while let Some(frame) = incoming.frame().await {
        match frame {
            Ok(frame) => {
                if let Ok(data) = frame.into_data() {
                    body.append(data);
                }
            }
            Err(e) => {
                if body.abort(Failure::from_error(&class::IO, e)) {
                    close.notify_one();
                }
                return;
            }
        }
    }
    body.finish();
}
