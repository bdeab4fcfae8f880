//! Error types for the articles API.
//!
//! Failures from the document store, the object store and request parsing are
//! all funneled into a single [`ApiError`], a message tagged with an
//! [`ErrorCategory`]. The category alone decides the HTTP status and whether
//! the error body is shown to the client.
//!
//! | category              | status |
//! |-----------------------|--------|
//! | `authorization`       | 401    |
//! | `database-connection` | 503    |
//! | `database-error`      | 400    |
//! | `format-error`        | 400    |
//! | `not-found`           | 404    |
//! | `validation-error`    | 400    |
//! | anything else         | 500    |

use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Category
// =============================================================================

/// Machine-readable failure category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Token missing, malformed, expired or rejected
    Authorization,

    /// Document store unreachable
    DatabaseConnection,

    /// Document store operation failed
    DatabaseError,

    /// Request body could not be parsed
    FormatError,

    /// Referenced resource absent or id malformed
    NotFound,

    /// Semantically invalid request
    ValidationError,

    /// Any tag outside the fixed enumeration
    Other(String),
}

impl ErrorCategory {
    /// Parse a category tag.
    ///
    /// Matching ignores case and dashes, so `not-found`, `NotFound` and
    /// `NOT-FOUND` are the same category. Anything else is `Other`.
    pub fn parse(tag: &str) -> Self {
        let normalized = tag.replace('-', "").to_ascii_uppercase();

        match normalized.as_str() {
            "AUTHORIZATION" => ErrorCategory::Authorization,
            "DATABASECONNECTION" => ErrorCategory::DatabaseConnection,
            "DATABASEERROR" => ErrorCategory::DatabaseError,
            "FORMATERROR" => ErrorCategory::FormatError,
            "NOTFOUND" => ErrorCategory::NotFound,
            "VALIDATIONERROR" => ErrorCategory::ValidationError,
            _ => ErrorCategory::Other(tag.to_string()),
        }
    }

    /// The tag written into the `type` field of the error envelope.
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::DatabaseConnection => "database-connection",
            ErrorCategory::DatabaseError => "database-error",
            ErrorCategory::FormatError => "format-error",
            ErrorCategory::NotFound => "not-found",
            ErrorCategory::ValidationError => "validation-error",
            ErrorCategory::Other(tag) => tag,
        }
    }

    /// HTTP status for this category.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCategory::Authorization => StatusCode::UNAUTHORIZED,
            ErrorCategory::DatabaseConnection => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCategory::DatabaseError => StatusCode::BAD_REQUEST,
            ErrorCategory::FormatError => StatusCode::BAD_REQUEST,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCategory::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether responses in this category carry a body.
    pub fn should_display(&self) -> bool {
        should_display(self.status())
    }
}

impl From<&str> for ErrorCategory {
    fn from(tag: &str) -> Self {
        ErrorCategory::parse(tag)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Responses with these statuses are sent without a body.
const HIDDEN_STATUSES: [StatusCode; 2] = [StatusCode::UNAUTHORIZED, StatusCode::NOT_FOUND];

/// Whether an error response with `status` may carry the error envelope.
pub fn should_display(status: StatusCode) -> bool {
    !HIDDEN_STATUSES.contains(&status)
}

// =============================================================================
// Classified Error
// =============================================================================

/// A failure annotated with a category, ready to become an HTTP response.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    message: String,
    inner: String,
    category: ErrorCategory,
    private: bool,
}

impl ApiError {
    /// Create a classified error from a cause.
    ///
    /// When `private` is set the cause text is kept for logging but never
    /// serialized.
    pub fn new(
        category: impl Into<ErrorCategory>,
        message: impl Into<String>,
        cause: impl fmt::Display,
        private: bool,
    ) -> Self {
        Self {
            message: message.into(),
            inner: cause.to_string(),
            category: category.into(),
            private,
        }
    }

    /// `not-found`, carrying the cause as public detail.
    pub fn not_found(message: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::new(ErrorCategory::NotFound, message, cause, false)
    }

    /// `validation-error`, carrying the cause as public detail.
    pub fn validation(message: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::new(ErrorCategory::ValidationError, message, cause, false)
    }

    /// `format-error`, carrying the cause as public detail.
    pub fn format(message: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::new(ErrorCategory::FormatError, message, cause, false)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Detail visible to clients; `None` for private errors.
    pub fn detail(&self) -> Option<&str> {
        if self.private || self.inner.is_empty() {
            None
        } else {
            Some(&self.inner)
        }
    }

    /// Full cause text, including for private errors. For logs only.
    pub fn inner_detail(&self) -> &str {
        &self.inner
    }

    pub fn category(&self) -> &ErrorCategory {
        &self.category
    }

    pub fn status(&self) -> StatusCode {
        self.category.status()
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn should_display(&self) -> bool {
        self.category.should_display()
    }

    /// The wire form of this error.
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                message: self.message.clone(),
                message_detail: self.detail().map(str::to_string),
                kind: self.category.as_str().to_string(),
            },
        }
    }
}

impl Serialize for ApiError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.envelope().serialize(serializer)
    }
}

/// Turn a maybe-error into a classified error.
///
/// An absent cause yields `None`, so callers can classify a fallible result
/// and check the outcome in one place.
pub fn classify<E: fmt::Display>(
    cause: Option<E>,
    message: &str,
    category: impl Into<ErrorCategory>,
    private: bool,
) -> Option<ApiError> {
    cause.map(|cause| ApiError::new(category, message, cause, private))
}

/// Classify the error arm of a `Result`.
pub trait Classify<T> {
    fn classify(
        self,
        message: &str,
        category: ErrorCategory,
        private: bool,
    ) -> Result<T, ApiError>;
}

impl<T, E: fmt::Display> Classify<T> for Result<T, E> {
    fn classify(
        self,
        message: &str,
        category: ErrorCategory,
        private: bool,
    ) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::new(category, message, e, private))
    }
}

// =============================================================================
// Error Envelope
// =============================================================================

/// `{"error": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,

    #[serde(
        rename = "message-detail",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub message_detail: Option<String>,

    #[serde(rename = "type")]
    pub kind: String,
}

// =============================================================================
// Collaborator Errors
// =============================================================================

/// Errors from the document store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store rejected or failed the operation
    #[error("Store error: {0}")]
    Operation(String),

    /// A document could not be converted to or from its stored form
    #[error("Document conversion error: {0}")]
    Serialization(String),
}

/// Errors from the object store holding article images.
#[derive(Debug, Clone, Error)]
pub enum ObjectStoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Errors from the API client and the access token service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API answered with an unexpected status
    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    /// No usable access token could be obtained
    #[error("Token error: {0}")]
    Token(String),
}

/// Errors from splitting a markdown file into front matter and body.
#[derive(Debug, Clone, Error)]
pub enum FrontMatterError {
    #[error("File does not start with a front matter block")]
    MissingOpeningDelimiter,

    #[error("Front matter block is not closed")]
    MissingClosingDelimiter,

    #[error("Invalid front matter: {0}")]
    Yaml(String),
}

/// Errors from importing a single markdown file.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("{path}: {source}")]
    FrontMatter {
        path: String,
        #[source]
        source: FrontMatterError,
    },

    #[error("Invalid publish date {0:?} (expected MM/DD/YYYY)")]
    InvalidDate(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}
