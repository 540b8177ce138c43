//! HTTP error handling
//!
//! Every failure leaves the server as `{message, code, details?}` with a
//! status derived from the machine-readable code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tasktree_core::{TaskServiceError, ValidationError};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::new(message, "INVALID_QUERY")
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "ENTITY_NOT_FOUND" | "PARENT_NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" | "DEPTH_EXCEEDED" | "INVALID_QUERY" => StatusCode::BAD_REQUEST,
            "CYCLE_ERROR" | "CHILDREN_EXIST" => StatusCode::CONFLICT,
            "ROOT_DELETION_FORBIDDEN" | "ROOT_IMMUTABLE" => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<TaskServiceError> for HttpError {
    fn from(err: TaskServiceError) -> Self {
        let code = err.code();
        match err {
            // store internals go to the log and the details field only
            TaskServiceError::StoreError(ref source) => {
                tracing::error!("Task store failure: {:?}", source);
                HttpError::with_details("Task store failure", code, format!("{:?}", source))
            }
            other => HttpError::new(other.to_string(), code),
        }
    }
}

impl From<ValidationError> for HttpError {
    fn from(err: ValidationError) -> Self {
        TaskServiceError::from(err).into()
    }
}
