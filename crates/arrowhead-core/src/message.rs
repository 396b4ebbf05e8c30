//! Request and response messages.
//!
//! Messages are composed from a handful of capability traits rather than a
//! hierarchy of message kinds:
//!
//! - [`HasHeaders`] / [`HasHeadersMut`] - header access
//! - [`HasStatus`] - the (optional) response status
//! - [`HasBody`] - access to the message body
//!
//! A request is split into its immutable [`RequestHead`], shared behind an
//! `Arc` by every step of a route sequence, and the mutable parts bound to a
//! single step: path parameters and the [`IncomingBody`].

use std::sync::Arc;

use arrowhead_future::{Failure, Outcome};
use arrowhead_router::Params;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode, Uri, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::body::IncomingBody;
use crate::codec::Encoder;
use crate::encoding::{Encoding, EncodingRegistry};
use crate::error::ROUTE_CONFIGURATION;
use crate::identity::ConsumerIdentity;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, so request IDs sort by arrival in logs.
///
/// # Example
///
/// ```
/// use arrowhead_core::RequestId;
///
/// let id = RequestId::new();
/// println!("request {id}");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID, such as one propagated in a header.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Read access to message headers.
pub trait HasHeaders {
    /// Returns all headers.
    fn headers(&self) -> &HeaderMap;

    /// Returns the first value of `name` if it is visible ASCII.
    fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns the `Content-Type` header.
    fn content_type(&self) -> Option<&str> {
        self.headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }
}

/// Write access to message headers.
pub trait HasHeadersMut: HasHeaders {
    /// Returns all headers for modification.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Replaces every value of `name` with `value`.
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers_mut().insert(name, value);
    }
}

/// Access to a response status.
pub trait HasStatus {
    /// Returns the status, or `None` if none was set yet.
    fn status(&self) -> Option<StatusCode>;
}

/// Access to a message body.
pub trait HasBody {
    /// The body representation.
    type Body;

    /// Returns the body.
    fn body(&self) -> &Self::Body;
}

/// The immutable part of an inbound request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    request_id: RequestId,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    identity: ConsumerIdentity,
}

impl RequestHead {
    /// Creates a head for an anonymous HTTP/1.1 request without headers.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            identity: ConsumerIdentity::Anonymous,
        }
    }

    /// Creates a head from the parts of an `http` request.
    #[must_use]
    pub fn from_parts(parts: http::request::Parts, identity: ConsumerIdentity) -> Self {
        Self {
            request_id: RequestId::new(),
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            identity,
        }
    }

    /// Sets the consumer identity.
    #[must_use]
    pub fn with_identity(mut self, identity: ConsumerIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces the request ID.
    #[must_use]
    pub const fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the request method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the path component of the URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the query component of the URI.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the HTTP version.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Returns the consumer identity.
    #[must_use]
    pub const fn identity(&self) -> &ConsumerIdentity {
        &self.identity
    }

    /// Returns the encoding of the request body, derived from `Content-Type`.
    ///
    /// Returns `None` when the header is absent or carries no media subtype.
    #[must_use]
    pub fn content_encoding(&self) -> Option<Encoding> {
        self.content_type()
            .and_then(|content_type| EncodingRegistry::global().from_content_type(content_type))
    }
}

impl HasHeaders for RequestHead {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// An inbound request as seen by validators and route handlers.
#[derive(Debug)]
pub struct ServiceRequest {
    head: Arc<RequestHead>,
    params: Params,
    body: IncomingBody,
}

impl ServiceRequest {
    /// Creates a request from its head and body.
    #[must_use]
    pub fn new(head: RequestHead, body: IncomingBody) -> Self {
        Self::from_shared(Arc::new(head), body)
    }

    /// Creates a request around an already shared head.
    #[must_use]
    pub fn from_shared(head: Arc<RequestHead>, body: IncomingBody) -> Self {
        Self {
            head,
            params: Params::new(),
            body,
        }
    }

    /// Returns the request head.
    #[must_use]
    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    /// Returns a shared handle to the request head.
    #[must_use]
    pub fn shared_head(&self) -> Arc<RequestHead> {
        Arc::clone(&self.head)
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.head.method()
    }

    /// Returns the full request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.head.path()
    }

    /// Returns the path parameters bound by the route pattern.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the value of the path parameter `name`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Binds path parameters, replacing any bound earlier.
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// Returns the consumer identity.
    #[must_use]
    pub fn identity(&self) -> &ConsumerIdentity {
        self.head.identity()
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.head.request_id()
    }

    /// Returns the encoding of the request body.
    #[must_use]
    pub fn content_encoding(&self) -> Option<Encoding> {
        self.head.content_encoding()
    }
}

impl HasHeaders for ServiceRequest {
    fn headers(&self) -> &HeaderMap {
        self.head.headers()
    }
}

impl HasBody for ServiceRequest {
    type Body = IncomingBody;

    fn body(&self) -> &IncomingBody {
        &self.body
    }
}

/// The response a route sequence builds.
///
/// A fresh response has no status. Routes must set one; a response that
/// reaches the engine without a status is a route configuration failure.
#[derive(Debug, Clone, Default)]
pub struct ServiceResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Bytes,
}

impl ServiceResponse {
    /// Creates an empty response without status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Adds a header, replacing earlier values of the same name.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Encodes `value` as the body and sets the matching `Content-Type`.
    ///
    /// # Errors
    ///
    /// Fails with the encoder's failure if `value` cannot be encoded.
    pub fn with_encoded<T, E>(mut self, encoder: &E, value: &T) -> Outcome<Self>
    where
        T: Serialize,
        E: Encoder,
    {
        self.body = encoder.encode(value)?;
        self.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(encoder.content_type()),
        );
        Ok(self)
    }

    /// Removes the status, every header and the body.
    pub fn clear(&mut self) {
        self.status = None;
        self.headers.clear();
        self.body = Bytes::new();
    }

    /// Converts the response into an `http` response.
    ///
    /// # Errors
    ///
    /// Fails with [`ROUTE_CONFIGURATION`] if no status was set.
    pub fn into_http(self) -> Outcome<http::Response<Bytes>> {
        let status = self.status.ok_or_else(missing_status)?;
        let mut response = http::Response::new(self.body);
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        Ok(response)
    }
}

impl HasHeaders for ServiceResponse {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl HasHeadersMut for ServiceResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}

impl HasStatus for ServiceResponse {
    fn status(&self) -> Option<StatusCode> {
        self.status
    }
}

impl HasBody for ServiceResponse {
    type Body = Bytes;

    fn body(&self) -> &Bytes {
        &self.body
    }
}

pub(crate) fn missing_status() -> Failure {
    Failure::new(
        &ROUTE_CONFIGURATION,
        "route completed without setting a response status",
    )
}
