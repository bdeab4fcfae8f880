//! Conversion of handler outcomes into HTTP responses.
//!
//! Handlers build their own success responses and return [`HandlerResult`].
//! Failures are turned into responses here and nowhere else:
//!
//! - classified errors with a displayable status get the JSON error envelope
//! - classified errors with status 401 or 404 get the status line only
//! - anything unexpected is a bare 500

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::ApiError;

/// Content type for every JSON body the API writes.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Outcome of a route handler.
pub type HandlerResult = Result<Response, HandlerError>;

/// Failure returned by a route handler.
#[derive(Debug)]
pub enum HandlerError {
    /// A failure with a known category
    Classified(ApiError),

    /// Anything else; never reflected to the client
    Unexpected(String),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::Classified(err) => err.into_response(),
            HandlerError::Unexpected(message) => {
                error!(
                    error_type = "internal",
                    status = StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                    "Unexpected error: {}",
                    message
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    StatusCode::INTERNAL_SERVER_ERROR
                        .canonical_reason()
                        .unwrap_or_default(),
                )
                    .into_response()
            }
        }
    }
}

impl From<ApiError> for HandlerError {
    fn from(err: ApiError) -> Self {
        HandlerError::Classified(err)
    }
}

impl From<http::Error> for HandlerError {
    fn from(err: http::Error) -> Self {
        HandlerError::Unexpected(err.to_string())
    }
}

/// Convert a classified error to a response.
///
/// Logs 5xx at ERROR, 404 at DEBUG and other client errors at WARN. The log
/// line carries the full cause, including for private errors.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_type = self.category().as_str();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}: {}",
                self.message(),
                self.inner_detail()
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}: {}",
                self.message(),
                self.inner_detail()
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}: {}",
                self.message(),
                self.inner_detail()
            );
        }

        if !self.should_display() {
            return status.into_response();
        }

        match serde_json::to_vec(&self) {
            Ok(body) => (status, [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)], body).into_response(),
            Err(e) => HandlerError::Unexpected(e.to_string()).into_response(),
        }
    }
}

/// Serialize `value` as the JSON body of a response with `status`.
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> HandlerResult {
    let body = serde_json::to_vec(value).map_err(|e| HandlerError::Unexpected(e.to_string()))?;
    Ok(Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(Body::from(body))?)
}

/// A response with `status` and no body.
pub fn empty_response(status: StatusCode) -> HandlerResult {
    Ok(status.into_response())
}
