//! Error types for spec lookup, request building and invocation.

use thiserror::Error;

/// Result type for OpenAPI service client operations.
pub type Result<T> = std::result::Result<T, OpenApiError>;

/// Errors that can occur while resolving, building or sending an operation call.
///
/// None of these are retried internally; each one ends the current `invoke`.
#[derive(Error, Debug)]
pub enum OpenApiError {
    /// Spec text could not be decoded, or required structural keys are missing
    #[error("Invalid OpenAPI spec: {0}")]
    InvalidSpecFormat(String),

    /// No path, operationId or substring match
    #[error("Operation not found: {0}")]
    OperationNotFound(String),

    /// Method omitted where a path defines more than one operation
    #[error("Multiple operations found at path '{path}' ({methods}), method is required")]
    AmbiguousOperation { path: String, methods: String },

    /// Method key is not one of the recognized HTTP methods
    #[error("Invalid HTTP method: {0}")]
    InvalidHttpMethod(String),

    /// A required path/header/query parameter is absent from the call arguments
    #[error("Missing required {location} parameter '{name}' for operation '{operation}'")]
    MissingRequiredParameter {
        location: String,
        name: String,
        operation: String,
    },

    /// Request body declares a content type other than JSON
    #[error("Unsupported request body content type(s) [{content_types}] for operation '{operation}'")]
    UnsupportedContentType {
        operation: String,
        content_types: String,
    },

    /// apiKey scheme with an `in` other than header, query or cookie
    #[error("Unsupported apiKey location '{0}', must be one of 'header', 'query' or 'cookie'")]
    UnsupportedAuthLocation(String),

    /// http scheme other than basic or bearer
    #[error("Unsupported HTTP authentication scheme: {0}")]
    UnsupportedAuthScheme(String),

    /// A strategy received a security scheme of another type
    #[error("{strategy} authentication received a '{scheme_type}' security scheme")]
    SchemeMismatch {
        strategy: &'static str,
        scheme_type: String,
    },

    /// Credential material failed validation at construction time
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Credentials could not be matched to any authentication strategy
    #[error("Unable to create authentication from provided credentials: {0}")]
    UnresolvableCredentials(String),

    /// No node in the payload carried all required fields
    #[error("Failed to extract function invocation: no node with fields [{fields}] in payload: {payload}")]
    PayloadExtractionFailed { fields: String, payload: String },

    /// The caller's payload could not be converted to JSON
    #[error("Failed to encode payload as JSON: {0}")]
    PayloadEncodeError(#[source] serde_json::Error),

    /// String-encoded arguments were not valid JSON
    #[error("Failed to decode '{field}' as JSON: {source}")]
    ArgumentDecodeError {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    /// Arguments (or name) had an unexpected JSON type
    #[error("Invalid {field} type {found} for function call, expected {expected}")]
    InvalidArgumentType {
        field: String,
        found: &'static str,
        expected: &'static str,
    },

    /// Network or HTTP failure surfaced by the transport
    #[error("HTTP transport error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// Client configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OpenApiError {
    /// Helper for creating transport errors that carry no status code
    pub fn transport(message: impl Into<String>) -> Self {
        OpenApiError::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Helper for creating configuration errors
    pub fn config_error(msg: impl Into<String>) -> Self {
        OpenApiError::Config(msg.into())
    }

    /// HTTP status carried by a transport error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            OpenApiError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OpenApiError {
    fn from(err: reqwest::Error) -> Self {
        OpenApiError::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Name of a JSON value's type, for error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Shorten a payload for inclusion in an error message.
pub(crate) fn truncate_for_display(value: &serde_json::Value, max_len: usize) -> String {
    let text = value.to_string();
    if text.chars().count() <= max_len {
        return text;
    }
    let mut short: String = text.chars().take(max_len).collect();
    short.push_str("...");
    short
}
