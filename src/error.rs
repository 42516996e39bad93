// Platform and view error types
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Generic message used when the platform returns an error body we cannot read
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Errors raised while talking to the hosted platform (auth, REST, storage)
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Non-success HTTP status with whatever the service told us about it
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        description: Option<String>,
    },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid redirect: {0}")]
    InvalidRedirect(String),

    #[error("Invalid access token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Session store error: {0}")]
    SessionStore(#[from] std::io::Error),
}

/// Union of the error body shapes returned by the auth, REST and storage services.
/// Auth uses `error`/`error_description` or `msg`, REST uses `message`/`code`,
/// storage uses `error`/`message` with a stringly `statusCode`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    code: Option<Value>,
    error_code: Option<String>,
}

impl PlatformError {
    /// Build an API error from a failed response's status and raw body
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

        let code = parsed.error_code.or_else(|| match parsed.code {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        });

        let message = parsed
            .message
            .or(parsed.msg)
            .or(parsed.error)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or(GENERIC_ERROR_MESSAGE)
                    .to_string()
            });

        PlatformError::Api {
            status: status.as_u16(),
            code,
            message,
            description: parsed.error_description,
        }
    }

    /// HTTP status for API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            PlatformError::Api { status, .. } => Some(*status),
            PlatformError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// A single-object REST request that matched zero rows answers 406
    pub fn is_no_rows(&self) -> bool {
        self.status() == Some(StatusCode::NOT_ACCEPTABLE.as_u16())
    }

    /// Message suitable for showing to the end user: the service's
    /// `error_description` if present, otherwise its message.
    pub fn user_message(&self) -> String {
        match self {
            PlatformError::Api {
                description: Some(description),
                ..
            } if !description.is_empty() => description.clone(),
            other => other.to_string(),
        }
    }
}

/// Outcome failures of a view flow
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("User not logged in")]
    Unauthenticated,

    #[error("{}", .0.user_message())]
    Service(#[from] PlatformError),

    #[error("View was unmounted before the request completed")]
    Cancelled,
}

impl ViewError {
    /// Stable code for machine-readable output
    pub fn error_code(&self) -> &'static str {
        match self {
            ViewError::Unauthenticated => "UNAUTHENTICATED",
            ViewError::Service(_) => "SERVICE_ERROR",
            ViewError::Cancelled => "CANCELLED",
        }
    }
}
