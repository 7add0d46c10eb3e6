use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// A single team-member's decision on one pull request.
///
/// At most one row exists per (user_id, project_id, pr_number); a
/// resubmission overwrites team/approved/comment in place.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, TS)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub pr_number: i64,
    pub team_id: Uuid,
    pub approved: bool,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct SubmitReviewRequest {
    /// Team the caller reviews on behalf of; must be assigned to the project.
    pub team_id: Uuid,
    pub approved: bool,
    pub comment: Option<String>,
}
