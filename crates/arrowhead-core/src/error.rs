//! Error taxonomy for Arrowhead services.
//!
//! Runtime failures travel as [`Failure`] values classified by an
//! [`ErrorClass`]. This module adds the HTTP-facing classes, maps any failure
//! to an [`ErrorCategory`] and its status code, and renders the JSON
//! [`ErrorEnvelope`] used for fallback responses.
//!
//! Registration problems (bad patterns, conflicting routes) are reported
//! eagerly as [`ServiceError`] when a service is built.
//!
//! | Class | Category | Status |
//! |---|---|---|
//! | [`BAD_REQUEST`], [`DECODE`](arrowhead_future::class::DECODE) | `BadRequest` | 400 |
//! | [`UNAUTHORIZED`] | `Unauthorized` | 401 |
//! | [`FORBIDDEN`] | `Forbidden` | 403 |
//! | [`NOT_FOUND`] | `NotFound` | 404 |
//! | [`PAYLOAD_TOO_LARGE`] | `PayloadTooLarge` | 413 |
//! | [`UNSUPPORTED_MEDIA_TYPE`] | `UnsupportedMediaType` | 415 |
//! | anything else | `Internal` | 500 |

use arrowhead_future::class::{self, ErrorClass};
use arrowhead_future::Failure;
use arrowhead_router::PatternError;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root of the failures caused by the request itself.
pub static HTTP_REQUEST: ErrorClass = ErrorClass::new("HttpRequestError", &class::ERROR);

/// The request is malformed.
pub static BAD_REQUEST: ErrorClass = ErrorClass::new("BadRequest", &HTTP_REQUEST);

/// The consumer could not be identified.
pub static UNAUTHORIZED: ErrorClass = ErrorClass::new("Unauthorized", &HTTP_REQUEST);

/// The consumer is not allowed to use the service.
pub static FORBIDDEN: ErrorClass = ErrorClass::new("Forbidden", &HTTP_REQUEST);

/// The requested resource does not exist.
pub static NOT_FOUND: ErrorClass = ErrorClass::new("NotFound", &HTTP_REQUEST);

/// The request body exceeds the configured limit.
pub static PAYLOAD_TOO_LARGE: ErrorClass = ErrorClass::new("PayloadTooLarge", &HTTP_REQUEST);

/// The request body uses an encoding the service does not accept.
pub static UNSUPPORTED_MEDIA_TYPE: ErrorClass =
    ErrorClass::new("UnsupportedMediaType", &HTTP_REQUEST);

/// A route produced a response that cannot be sent, such as one without a
/// status.
pub static ROUTE_CONFIGURATION: ErrorClass =
    ErrorClass::new("RouteConfigurationError", &class::ILLEGAL_STATE);

/// Shorthand constructors for failures of the HTTP classes.
pub mod failures {
    use super::{
        Failure, BAD_REQUEST, FORBIDDEN, NOT_FOUND, PAYLOAD_TOO_LARGE, UNAUTHORIZED,
        UNSUPPORTED_MEDIA_TYPE,
    };

    /// A [`BAD_REQUEST`] failure.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Failure {
        Failure::new(&BAD_REQUEST, message)
    }

    /// An [`UNAUTHORIZED`] failure.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Failure {
        Failure::new(&UNAUTHORIZED, message)
    }

    /// A [`FORBIDDEN`] failure.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Failure {
        Failure::new(&FORBIDDEN, message)
    }

    /// A [`NOT_FOUND`] failure.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Failure {
        Failure::new(&NOT_FOUND, message)
    }

    /// A [`PAYLOAD_TOO_LARGE`] failure.
    #[must_use]
    pub fn payload_too_large(limit: usize) -> Failure {
        Failure::new(
            &PAYLOAD_TOO_LARGE,
            format!("request body exceeds {limit} bytes"),
        )
    }

    /// An [`UNSUPPORTED_MEDIA_TYPE`] failure.
    #[must_use]
    pub fn unsupported_media_type(encoding: &str) -> Failure {
        Failure::new(
            &UNSUPPORTED_MEDIA_TYPE,
            format!("encoding `{encoding}` is not accepted"),
        )
    }
}

/// Categories of failures for HTTP status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed request or undecodable body.
    BadRequest,
    /// Missing or invalid consumer identity.
    Unauthorized,
    /// Access denied.
    Forbidden,
    /// Resource not found.
    NotFound,
    /// Body too large.
    PayloadTooLarge,
    /// Unsupported body encoding.
    UnsupportedMediaType,
    /// Everything else.
    Internal,
}

impl ErrorCategory {
    /// Classifies a failure by the nearest mapped class in its ancestry.
    #[must_use]
    pub fn of(failure: &Failure) -> Self {
        Self::of_class(failure.class())
    }

    /// Classifies an error class.
    #[must_use]
    pub fn of_class(class: &ErrorClass) -> Self {
        let table: [(&ErrorClass, Self); 7] = [
            (&BAD_REQUEST, Self::BadRequest),
            (&class::DECODE, Self::BadRequest),
            (&UNAUTHORIZED, Self::Unauthorized),
            (&FORBIDDEN, Self::Forbidden),
            (&NOT_FOUND, Self::NotFound),
            (&PAYLOAD_TOO_LARGE, Self::PayloadTooLarge),
            (&UNSUPPORTED_MEDIA_TYPE, Self::UnsupportedMediaType),
        ];
        table
            .iter()
            .find(|(mapped, _)| class.is_subclass_of(mapped))
            .map_or(Self::Internal, |(_, category)| *category)
    }

    /// Returns the HTTP status code for this category.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Returns `true` for categories caused by the request (4xx).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Internal)
    }
}

/// Message used for internal failures when details must not leak.
pub const GENERIC_INTERNAL_MESSAGE: &str = "internal server error";

/// Serializable error envelope for fallback responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
}

impl ErrorEnvelope {
    /// Builds the envelope for `failure`.
    ///
    /// Client errors carry the failure message. Internal failures carry a
    /// generic message unless `expose_internal` is set.
    #[must_use]
    pub fn from_failure(failure: &Failure, request_id: Option<&str>, expose_internal: bool) -> Self {
        let category = ErrorCategory::of(failure);
        let message = if category.is_client_error() || expose_internal {
            failure.message().to_string()
        } else {
            GENERIC_INTERNAL_MESSAGE.to_string()
        };
        Self {
            error: ErrorDetail {
                code: category.code().to_string(),
                message,
                category,
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    /// Serializes the envelope as JSON.
    #[must_use]
    pub fn to_json(&self) -> Vec<u8> {
        // An envelope of plain strings always serializes.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Errors raised while assembling a service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A route, validator or catcher pattern failed to compile.
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),

    /// Two routes accept exactly the same requests.
    #[error("service `{service}` registers {method} {pattern} more than once")]
    DuplicateRoute {
        /// The service name.
        service: String,
        /// The method, or `*` for any method.
        method: String,
        /// The canonical pattern, or `*` for any path.
        pattern: String,
    },

    /// The base path is not a literal path.
    #[error("invalid base path `{base_path}`: {reason}")]
    InvalidBasePath {
        /// The rejected base path.
        base_path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A service is already mounted at the base path.
    #[error("a service is already mounted at `{base_path}`")]
    DuplicateService {
        /// The contested base path.
        base_path: String,
    },

    /// The service has no name.
    #[error("service name must not be empty")]
    MissingName,
}
