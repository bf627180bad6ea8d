//! Error types for Hypatia.
//!
//! [`ApiError`] is what resource implementations and the dispatcher return.
//! Every variant belongs to an [`ErrorKind`] which fixes its default HTTP
//! status, and every `ApiError` renders to one or more JSON:API error
//! objects through [`ApiError::to_error_objects`].
//!
//! | Kind | Status |
//! |---|---|
//! | `InvalidDocument`, `InvalidQuery`, `TypeMismatch` | 400 |
//! | `NotFound` | 404 |
//! | `MethodNotAllowed` | 405 |
//! | `NotAcceptable` | 406 |
//! | `Conflict` | 409 |
//! | `UnsupportedMediaType` | 415 |
//! | `Http` | whatever the error was tagged with |
//! | `Internal` | 500 |

use http::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::context::RequestId;
use crate::document::{Document, ErrorObject, ErrorSource, Meta};

/// Result type alias using [`ApiError`].
pub type ApiResult<T> = Result<T, ApiError>;

/// Classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Request body is not a valid JSON:API document.
    InvalidDocument,
    /// Query string could not be parsed or names unknown members.
    InvalidQuery,
    /// Body `type` does not match the endpoint's resource type.
    TypeMismatch,
    /// Resource or relationship target does not exist.
    NotFound,
    /// The resource does not implement the requested capability.
    MethodNotAllowed,
    /// The `Accept` header rules out every representation we can send.
    NotAcceptable,
    /// The request conflicts with server state.
    Conflict,
    /// The request body has an unsupported media type.
    UnsupportedMediaType,
    /// An error pre-tagged with an explicit status.
    Http,
    /// Anything else.
    Internal,
    /// Several errors reported together.
    Multiple,
}

impl ErrorKind {
    /// Returns the default HTTP status code for this kind.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::InvalidDocument | Self::InvalidQuery | Self::TypeMismatch => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::Conflict => StatusCode::CONFLICT,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Http | Self::Internal | Self::Multiple => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the machine-readable code written to `errors[].code`.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidDocument => "INVALID_DOCUMENT",
            Self::InvalidQuery => "INVALID_QUERY",
            Self::TypeMismatch => "TYPE_MISMATCH",
            Self::NotFound => "NOT_FOUND",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::NotAcceptable => "NOT_ACCEPTABLE",
            Self::Conflict => "CONFLICT",
            Self::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            Self::Http => "HTTP_ERROR",
            Self::Internal => "INTERNAL_ERROR",
            Self::Multiple => "MULTIPLE_ERRORS",
        }
    }
}

/// Standard error type for Hypatia.
///
/// # Example
///
/// ```
/// use hypatia_core::{ApiError, ErrorKind};
/// use http::StatusCode;
///
/// let err = ApiError::not_found("users", "42");
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// assert_eq!(err.status(), StatusCode::NOT_FOUND);
///
/// // Resource code can pick any status it likes.
/// let err = ApiError::http(StatusCode::FORBIDDEN, "not your chocolate");
/// assert_eq!(err.status(), StatusCode::FORBIDDEN);
/// ```
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body is not a valid JSON:API document.
    #[error("{message}")]
    InvalidDocument {
        /// Human-readable error message.
        message: String,
        /// JSON pointer to the offending member.
        pointer: Option<String>,
    },

    /// Query parameter could not be parsed or validated.
    #[error("{message}")]
    InvalidQuery {
        /// Human-readable error message.
        message: String,
        /// Name of the offending parameter.
        parameter: Option<String>,
    },

    /// Body `type` does not match the expected resource type.
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch {
        /// Type the endpoint serves.
        expected: String,
        /// Type found in the document.
        found: String,
        /// JSON pointer to the offending `type` member.
        pointer: Option<String>,
    },

    /// Resource not found.
    #[error("{message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
        /// Type of the missing resource.
        resource_type: Option<String>,
        /// Id of the missing resource.
        resource_id: Option<String>,
    },

    /// Capability not implemented.
    #[error("{message}")]
    MethodNotAllowed {
        /// Human-readable error message.
        message: String,
    },

    /// No acceptable representation.
    #[error("{message}")]
    NotAcceptable {
        /// Human-readable error message.
        message: String,
    },

    /// Conflict with server state.
    #[error("{message}")]
    Conflict {
        /// Human-readable error message.
        message: String,
    },

    /// Unsupported request media type.
    #[error("{message}")]
    UnsupportedMediaType {
        /// Human-readable error message.
        message: String,
    },

    /// Error carrying an explicit HTTP status.
    #[error("{message}")]
    Http {
        /// Status to respond with.
        status: StatusCode,
        /// Human-readable error message.
        message: String,
    },

    /// Internal error. The message and source are logged, never sent.
    #[error("internal error: {message}")]
    Internal {
        /// Message for the logs.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Several errors detected together, in detection order.
    #[error("{} errors occurred", .0.len())]
    Multiple(Vec<ApiError>),
}

impl ApiError {
    /// Creates an invalid-document error.
    #[must_use]
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
            pointer: None,
        }
    }

    /// Creates an invalid-document error pointing at a document member.
    #[must_use]
    pub fn invalid_document_at(message: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
            pointer: Some(pointer.into()),
        }
    }

    /// Creates an invalid-query error for a parameter.
    #[must_use]
    pub fn invalid_query(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
            parameter: Some(parameter.into()),
        }
    }

    /// Creates a type-mismatch error.
    #[must_use]
    pub fn type_mismatch(
        expected: impl Into<String>,
        found: impl Into<String>,
        pointer: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
            pointer: Some(pointer.into()),
        }
    }

    /// Creates a not-found error for a resource.
    #[must_use]
    pub fn not_found(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        let resource_type = resource_type.into();
        let resource_id = resource_id.into();
        Self::NotFound {
            message: format!("{resource_type} with id '{resource_id}' not found"),
            resource_type: Some(resource_type),
            resource_id: Some(resource_id),
        }
    }

    /// Creates a not-found error with a free-form message.
    #[must_use]
    pub fn not_found_message(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource_type: None,
            resource_id: None,
        }
    }

    /// Creates a method-not-allowed error.
    #[must_use]
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::MethodNotAllowed {
            message: message.into(),
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates an unsupported-media-type error.
    #[must_use]
    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self::UnsupportedMediaType {
            message: message.into(),
        }
    }

    /// Creates a not-acceptable error.
    #[must_use]
    pub fn not_acceptable(message: impl Into<String>) -> Self {
        Self::NotAcceptable {
            message: message.into(),
        }
    }

    /// Creates an error pre-tagged with `status`.
    #[must_use]
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Folds a list of errors into one.
    ///
    /// Returns `None` for an empty list, the error itself for a single
    /// one, and [`ApiError::Multiple`] otherwise. Order is preserved.
    #[must_use]
    pub fn aggregate(mut errors: Vec<ApiError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDocument { .. } => ErrorKind::InvalidDocument,
            Self::InvalidQuery { .. } => ErrorKind::InvalidQuery,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::MethodNotAllowed { .. } => ErrorKind::MethodNotAllowed,
            Self::NotAcceptable { .. } => ErrorKind::NotAcceptable,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::UnsupportedMediaType { .. } => ErrorKind::UnsupportedMediaType,
            Self::Http { .. } => ErrorKind::Http,
            Self::Internal { .. } => ErrorKind::Internal,
            Self::Multiple(_) => ErrorKind::Multiple,
        }
    }

    /// Returns the HTTP status for this error.
    ///
    /// An aggregate takes the status its members share. Members that
    /// disagree but are all client errors give 400; anything else gives 500.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Http { status, .. } => *status,
            Self::Multiple(errors) => {
                let mut statuses = errors.iter().map(Self::status);
                let Some(first) = statuses.next() else {
                    return StatusCode::INTERNAL_SERVER_ERROR;
                };
                let mut all_client = first.is_client_error();
                let mut all_same = true;
                for status in statuses {
                    all_same &= status == first;
                    all_client &= status.is_client_error();
                }
                if all_same {
                    first
                } else if all_client {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            other => other.kind().default_status_code(),
        }
    }

    /// Returns true if this error maps to a 5xx status.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    /// Renders this error as JSON:API error objects.
    ///
    /// Aggregates are flattened in order. Internal errors are rendered with
    /// a generic title so nothing about the failure leaks to the client.
    #[must_use]
    pub fn to_error_objects(&self) -> Vec<ErrorObject> {
        let mut out = Vec::new();
        self.push_error_objects(&mut out);
        out
    }

    fn push_error_objects(&self, out: &mut Vec<ErrorObject>) {
        if let Self::Multiple(errors) = self {
            for error in errors {
                error.push_error_objects(out);
            }
            return;
        }

        let status = self.status();
        let title = match self {
            Self::Internal { .. } => "Internal Server Error".to_string(),
            other => other.to_string(),
        };

        out.push(ErrorObject {
            status: status.as_str().to_string(),
            code: Some(self.kind().code().to_string()),
            title,
            source: self.error_source(),
            meta: self.error_meta(),
            ..ErrorObject::default()
        });
    }

    fn error_source(&self) -> Option<ErrorSource> {
        match self {
            Self::InvalidDocument {
                pointer: Some(pointer),
                ..
            }
            | Self::TypeMismatch {
                pointer: Some(pointer),
                ..
            } => Some(ErrorSource {
                pointer: Some(pointer.clone()),
                parameter: None,
            }),
            Self::InvalidQuery {
                parameter: Some(parameter),
                ..
            } => Some(ErrorSource {
                pointer: None,
                parameter: Some(parameter.clone()),
            }),
            _ => None,
        }
    }

    fn error_meta(&self) -> Option<Meta> {
        match self {
            Self::NotFound {
                resource_type: Some(rt),
                resource_id: Some(rid),
                ..
            } => match json!({ "resource_type": rt, "resource_id": rid }) {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            },
            _ => None,
        }
    }

    /// Renders this error as a complete error document.
    ///
    /// The request id, when given, is written to the top-level `meta` so
    /// clients can quote it when reporting problems.
    #[must_use]
    pub fn to_document(&self, request_id: Option<&RequestId>) -> Document {
        let document = Document::errors(self.to_error_objects());
        match request_id {
            Some(id) => {
                let mut meta = Meta::new();
                meta.insert("request_id".into(), json!(id.to_string()));
                document.with_meta(meta)
            }
            None => document,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(source: anyhow::Error) -> Self {
        Self::Internal {
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// Errors raised while registering resources or configuring the API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two resources share a type name.
    #[error("resource type `{0}` is already registered")]
    DuplicateType(String),

    /// A resource type name is empty or contains a slash.
    #[error("invalid resource type name `{0}`")]
    InvalidTypeName(String),

    /// A model declares the same JSON key twice.
    #[error("resource type `{type_name}` declares field `{key}` more than once")]
    DuplicateField {
        /// Offending type.
        type_name: String,
        /// Repeated key.
        key: String,
    },

    /// A model uses `id` or `type` as a field key.
    #[error("resource type `{type_name}` uses reserved field key `{key}`")]
    ReservedField {
        /// Offending type.
        type_name: String,
        /// Reserved key.
        key: String,
    },

    /// The configured path prefix is unusable.
    #[error("invalid path prefix `{prefix}`: {reason}")]
    InvalidPrefix {
        /// The prefix as configured.
        prefix: String,
        /// Why it was rejected.
        reason: String,
    },
}
