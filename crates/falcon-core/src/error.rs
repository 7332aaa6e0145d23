//! Error types for request dispatch.
//!
//! Every error carries an [`ErrorCategory`] that decides its HTTP status, and
//! renders into the JSON envelope used by the default 404/405/500 responses:
//!
//! ```json
//! { "error": { "code": "NOT_FOUND", "message": "no route for /missing" } }
//! ```

use bytes::Bytes;
use falcon_router::{RouteError, RouteMethod};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Response;

/// Result type for dispatcher operations.
pub type FalconResult<T> = Result<T, FalconError>;

/// Broad classification of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The route table could not be built.
    Configuration,
    /// No route matched the request path.
    NotFound,
    /// A route matched the path but not the method.
    MethodNotAllowed,
    /// A handler or middleware failed.
    Internal,
}

impl ErrorCategory {
    /// Returns the HTTP status code for this category.
    #[must_use]
    pub const fn default_status_code(self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Configuration | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors raised while building or running the dispatcher.
#[derive(Debug, Error)]
pub enum FalconError {
    /// Route registration or snapshot build failed.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// No route matched.
    #[error("no route for {path}")]
    NotFound {
        /// Canonical request path
        path: String,
    },

    /// The path matched but no handler exists for the method.
    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed {
        /// Request method
        method: String,
        /// Canonical request path
        path: String,
        /// Methods registered for the path
        allowed: Vec<RouteMethod>,
    },

    /// A handler or middleware panicked.
    #[error("handler panicked while serving {path}")]
    HandlerPanicked {
        /// Canonical request path
        path: String,
    },

    /// A response body could not be serialized.
    #[error("failed to serialize response body: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FalconError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a method-not-allowed error.
    #[must_use]
    pub fn method_not_allowed(
        method: impl Into<String>,
        path: impl Into<String>,
        allowed: Vec<RouteMethod>,
    ) -> Self {
        Self::MethodNotAllowed {
            method: method.into(),
            path: path.into(),
            allowed,
        }
    }

    /// Creates a handler panic error.
    #[must_use]
    pub fn panicked(path: impl Into<String>) -> Self {
        Self::HandlerPanicked { path: path.into() }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Route(_) => ErrorCategory::Configuration,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::MethodNotAllowed { .. } => ErrorCategory::MethodNotAllowed,
            Self::HandlerPanicked { .. } | Self::Serialization(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns the machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Route(_) => "ROUTE_CONFIGURATION",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            Self::HandlerPanicked { .. } | Self::Serialization(_) => "INTERNAL_ERROR",
        }
    }

    /// Converts this error to a serializable envelope.
    ///
    /// Internal failures report a generic message so panic payloads and
    /// serializer details never reach the client.
    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let message = match self.category() {
            ErrorCategory::Internal | ErrorCategory::Configuration => {
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
            },
        }
    }

    /// Renders the error as a JSON response.
    ///
    /// A method-not-allowed error also sets the `Allow` header.
    #[must_use]
    pub fn to_response(&self) -> Response {
        let body = serde_json::to_vec(&self.to_envelope()).unwrap_or_else(|_| {
            br#"{"error":{"code":"INTERNAL_ERROR","message":"internal server error"}}"#.to_vec()
        });

        let mut response = http::Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = self.status_code();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Self::MethodNotAllowed { allowed, .. } = self {
            if let Ok(value) = HeaderValue::from_str(&allow_header(allowed)) {
                response.headers_mut().insert(http::header::ALLOW, value);
            }
        }
        response
    }
}

/// Formats the value of an `Allow` header.
pub(crate) fn allow_header(allowed: &[RouteMethod]) -> String {
    allowed
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// JSON error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Error details
    pub error: ErrorDetail,
}

/// Body of an [`ErrorEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
}
