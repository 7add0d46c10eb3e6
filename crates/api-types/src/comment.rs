use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// A discussion comment on a pull request, optionally anchored to a file
/// location and optionally replying to another comment.
///
/// Deletion is a tombstone: content is redacted and `deleted` set, the row
/// stays so `parent_id` references remain valid.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, TS)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub pr_number: i64,
    pub content: String,
    pub file_path: Option<String>,
    pub line_number: Option<i64>,
    pub parent_id: Option<Uuid>,
    pub deleted: bool,
    pub edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateCommentRequest {
    pub content: String,
    pub file_path: Option<String>,
    pub line_number: Option<i64>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct UpdateCommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct ListCommentsResponse {
    pub comments: Vec<Comment>,
}
