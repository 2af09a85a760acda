use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The main error type for roomrelay
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Missing, malformed, or invalid credential. The upgrade is rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A client frame could not be decoded. Closes that connection only.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Writing to one connection failed.
    #[error("Write failed: {0}")]
    Write(String),

    /// The persistence sink rejected a message.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// JSON body returned for rejected HTTP requests
#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    error_id: String,
}

impl RelayError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Protocol(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Write(_) | Self::Persistence(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns a message that is safe to show to clients.
    ///
    /// Client errors (4xx) carry their message. Server errors (5xx) are
    /// replaced with a generic message; the details only reach the logs.
    fn safe_message(&self) -> String {
        match self {
            Self::Unauthorized(msg) => format!("Unauthorized: {}", msg),
            Self::Protocol(msg) => format!("Protocol error: {}", msg),
            Self::BadRequest(msg) => format!("Bad request: {}", msg),
            Self::Forbidden(msg) => format!("Forbidden: {}", msg),
            Self::ServiceUnavailable(_) => "Service unavailable".to_string(),
            Self::Write(_) | Self::Persistence(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error_id = %error_id, error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error_id = %error_id, error = %self, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: self.safe_message(),
            error_id,
        });

        (status, body).into_response()
    }
}

/// Result type alias for roomrelay
pub type Result<T> = std::result::Result<T, RelayError>;

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            RelayError::Protocol(format!("Invalid frame: {}", err))
        } else {
            RelayError::Internal(format!("JSON serialization error: {}", err))
        }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Persistence(err.to_string())
    }
}
