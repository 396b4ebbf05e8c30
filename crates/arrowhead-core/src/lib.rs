//! # Arrowhead Core
//!
//! Services, routes and request handling for the Arrowhead framework.
//!
//! - [`HttpService`] - a named set of routes mounted at a base path
//! - [`Route`], [`Validator`], [`Catcher`] - the routables a service holds
//! - [`RouteSequence`] / [`RouteSequenceFactory`] - the ordered pipeline a
//!   matching request runs through
//! - [`ServiceRequest`] / [`ServiceResponse`] - the messages handlers see
//! - [`IncomingBody`] - the request body, consumed at most once
//! - [`JsonCodec`] / [`EncodingRegistry`] - payload codecs and encodings
//! - [`ConsumerIdentity`] - who is calling
//! - [`error`] - HTTP error classes and their status mapping
//!
//! All handlers answer with an [`arrowhead_future::Future`].

#![doc(html_root_url = "https://docs.rs/arrowhead-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod body;
mod codec;
mod encoding;
pub mod error;
mod factory;
mod handler;
mod identity;
mod message;
mod route;
mod sequence;
mod service;

pub use body::{BodySender, BodyStream, IncomingBody};
pub use codec::{Decoder, Encoder, JsonCodec};
pub use encoding::{Encoding, EncodingRegistry, JSON};
pub use error::{ErrorCategory, ErrorEnvelope, ServiceError};
pub use factory::RouteSequenceFactory;
pub use handler::{CatcherHandler, Handling, RouteHandler, ValidatorHandler};
pub use identity::ConsumerIdentity;
pub use message::{
    HasBody, HasHeaders, HasHeadersMut, HasStatus, RequestHead, RequestId, ServiceRequest,
    ServiceResponse,
};
pub use route::{Catcher, Route, Validator};
pub use sequence::{relative_path, Dispatch, RouteSequence, RouteTask};
pub use service::{HttpService, HttpServiceBuilder, ServiceDescriptor};
