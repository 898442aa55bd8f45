use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use crate::ai::AiError;
use crate::db::StoreError;
use crate::workspace::WorkspaceError;

/// Errors surfaced by request handlers and the tool-calling turn.
///
/// Tool failures never appear here; they stay in-band as
/// [`ToolErrorKind`](crate::tools::ToolErrorKind) on the tool's result.
#[derive(Debug, thiserror::Error)]
pub enum EdgeError {
    #[error("tenant id is missing or invalid")]
    InvalidTenant,
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("language model request failed: {0}")]
    UpstreamModel(#[from] AiError),
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("language model is not configured")]
    ModelUnavailable,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<WorkspaceError> for EdgeError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::InvalidTenant => EdgeError::InvalidTenant,
            WorkspaceError::AccessDenied(path) => EdgeError::AccessDenied(path),
            WorkspaceError::NotFound(path) => EdgeError::NotFound(format!("File not found: {}", path)),
            WorkspaceError::TooLarge { .. } | WorkspaceError::NotText(_) => {
                EdgeError::BadRequest(err.to_string())
            }
            WorkspaceError::Io(e) => EdgeError::Io(e),
        }
    }
}

impl ResponseError for EdgeError {
    fn status_code(&self) -> StatusCode {
        match self {
            EdgeError::InvalidTenant | EdgeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            EdgeError::AccessDenied(_) => StatusCode::FORBIDDEN,
            EdgeError::NotFound(_) => StatusCode::NOT_FOUND,
            EdgeError::UpstreamModel(_) => StatusCode::BAD_GATEWAY,
            EdgeError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            EdgeError::Persistence(_) | EdgeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        }
        // internals stay in the log; upstream failures are reported generically
        let message = match self {
            EdgeError::UpstreamModel(_) => "Failed to get a response from the language model".to_string(),
            EdgeError::Persistence(_) | EdgeError::Io(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(status).json(json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_errors_keep_their_kind() {
        assert!(matches!(
            EdgeError::from(WorkspaceError::InvalidTenant),
            EdgeError::InvalidTenant
        ));
        let err = EdgeError::from(WorkspaceError::AccessDenied("../x".into()));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_upstream_error_is_bad_gateway() {
        let err = EdgeError::from(AiError::with_status("rate limited", 429));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
