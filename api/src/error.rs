use std::{collections::HashMap, fmt};

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::Value;

use crate::{identity::AuthenticationError, store::StoreError};

/// Errors that know which HTTP status they should be reported with.
pub trait ApiRequestError {
    fn status_code(&self) -> StatusCode;
}

#[derive(Debug)]
pub enum AppError {
    /// Malformed or empty input.
    Validation(String),
    NotFound(String),
    /// The caller is known but not allowed to do this.
    Unauthorized(String),
    /// No valid identity could be resolved for the request.
    Unauthenticated(AuthenticationError),
    /// A uniqueness or dependency constraint was violated.
    Conflict(String),
    Internal {
        message: String,
        error: String,
        backtrace: Option<backtrace::Backtrace>,
    },
}

impl AppError {
    pub fn internal(error: impl fmt::Display) -> Self {
        tracing::error!(%error, "Internal error");
        AppError::Internal {
            message: "Internal server error".into(),
            error: error.to_string(),
            backtrace: cfg!(debug_assertions).then(backtrace::Backtrace::new),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized(_) => "FORBIDDEN",
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Internal { .. } => "SERVER_ERR",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Conflict(msg) => f.write_str(msg),
            AppError::Unauthenticated(e) => write!(f, "{e}"),
            AppError::Internal { message, error, .. } => write!(f, "{message}: {error}"),
        }
    }
}

impl ApiRequestError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::Unauthenticated(e) => e.status_code(),
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    code: String,

    message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,

    #[cfg(debug_assertions)]
    #[serde(skip_serializing_if = "Option::is_none")]
    debug_info: Option<HashMap<&'static str, Value>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code();
        let code = self.code().to_string();

        let (message, error, backtrace) = match self {
            AppError::Internal {
                message,
                error,
                backtrace,
            } => (message, Some(error), backtrace),
            other => (other.to_string(), None, None),
        };

        #[cfg(not(debug_assertions))]
        let _ = backtrace;

        let error_response = ErrorResponse {
            code,
            message,
            error,
            #[cfg(debug_assertions)]
            debug_info: backtrace.map(|b| {
                HashMap::from([(
                    "backtrace",
                    serde_json::to_value(filter_backtrace(&b)).unwrap_or(Value::Null),
                )])
            }),
        };

        (status_code, Json(error_response)).into_response()
    }
}

impl From<AuthenticationError> for AppError {
    fn from(e: AuthenticationError) -> Self {
        AppError::Unauthenticated(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(what) => AppError::Conflict(format!("{what} already exists")),
            StoreError::Blocked(msg) => AppError::Conflict(msg),
            e => AppError::internal(e),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::internal(e)
    }
}

#[derive(Serialize, Debug)]
struct FrameInfo {
    name: String,
    loc: String,
}

fn filter_backtrace(backtrace: &backtrace::Backtrace) -> Vec<FrameInfo> {
    const MODULE_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");
    let mut frames_info: Vec<FrameInfo> = Vec::new();

    for frame in backtrace.frames() {
        for symbol in frame.symbols() {
            if let (Some(name), Some(filename), Some(lineno)) = (
                symbol.name().map(|n| n.to_string()),
                symbol.filename().map(|f| f.to_owned()),
                symbol.lineno(),
            ) {
                if name.contains(MODULE_PREFIX) {
                    frames_info.push(FrameInfo {
                        name,
                        loc: format!("{}:{}", filename.display(), lineno),
                    });
                }
            }
        }
    }

    frames_info
}
