use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::ReviewerSummary;

/// Per-team slice of the derived approval read model. Never persisted;
/// recomputed on every status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct TeamApprovalStatus {
    pub team_id: Uuid,
    pub team_name: String,
    pub approved: bool,
    pub approved_by: Vec<ReviewerSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ApprovalStatus {
    pub can_merge: bool,
    pub message: String,
    pub team_approvals: Vec<TeamApprovalStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    Merge,
    Squash,
    Rebase,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::Merge => "merge",
            MergeStrategy::Squash => "squash",
            MergeStrategy::Rebase => "rebase",
        }
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct MergeRequest {
    pub strategy: MergeStrategy,
    pub commit_title: Option<String>,
    pub commit_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct MergeResponse {
    pub merged: bool,
    pub sha: Option<String>,
}
