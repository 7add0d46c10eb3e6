use api_types::ApprovalStatus;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};

use crate::git_host::GitHostError;

#[derive(Debug)]
pub struct ErrorResponse {
    status: StatusCode,
    message: String,
    details: Option<Value>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    /// Attach extra fields to the error body, e.g. the per-team approval
    /// breakdown on a merge refusal.
    pub fn with_details(status: StatusCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            status,
            message: message.into(),
            details: Some(details),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let mut body = Map::new();
        body.insert("error".to_string(), json!(self.message));
        if let Some(Value::Object(details)) = self.details {
            for (key, value) in details {
                body.entry(key).or_insert(value);
            }
        }
        (self.status, Json(Value::Object(body))).into_response()
    }
}

pub(crate) fn db_error(
    error: impl std::error::Error + 'static,
    fallback_message: &str,
) -> ErrorResponse {
    let error: &(dyn std::error::Error + 'static) = &error;
    let mut current = Some(error);

    while let Some(err) = current {
        if let Some(sqlx_error) = err.downcast_ref::<sqlx::Error>() {
            if let sqlx::Error::Database(db_err) = sqlx_error {
                if db_err.is_unique_violation() {
                    return ErrorResponse::new(StatusCode::CONFLICT, "resource already exists");
                }
                if db_err.is_foreign_key_violation() {
                    return ErrorResponse::new(StatusCode::NOT_FOUND, "related resource not found");
                }
            }
            break;
        }
        current = err.source();
    }

    ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, fallback_message)
}

/// Map a source-control-host failure onto the response, keeping the origin
/// status code. Upstream merge errors are never retried here; the caller
/// resubmits explicitly.
pub(crate) fn upstream_error(error: GitHostError, fallback_message: &str) -> ErrorResponse {
    match error {
        GitHostError::PullRequestNotFound => {
            ErrorResponse::new(StatusCode::NOT_FOUND, "pull request not found")
        }
        GitHostError::Upstream { status, message } => ErrorResponse::with_details(
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            message,
            json!({ "upstream_status": status }),
        ),
        GitHostError::Request(error) if error.is_timeout() => {
            ErrorResponse::new(StatusCode::GATEWAY_TIMEOUT, fallback_message)
        }
        GitHostError::Request(_) => ErrorResponse::new(StatusCode::BAD_GATEWAY, fallback_message),
    }
}

/// 403 refusal carrying the current per-team status for client display.
pub(crate) fn not_approved(status: ApprovalStatus) -> ErrorResponse {
    ErrorResponse::with_details(
        StatusCode::FORBIDDEN,
        status.message.clone(),
        json!({
            "can_merge": status.can_merge,
            "team_approvals": status.team_approvals,
        }),
    )
}
