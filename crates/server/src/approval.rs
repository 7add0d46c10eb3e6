//! Multi-team approval aggregation.
//!
//! A pull request is mergeable once every team assigned to the project has at
//! least one approving review from a current member. This is a derived read
//! model: recomputed from raw rows on every query, never cached.

use std::collections::HashMap;

use api_types::{ApprovalStatus, ReviewerSummary, TeamApprovalStatus, TeamRef};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{
    reviews::{ApprovingReview, ReviewError, ReviewRepository},
    teams::{TeamError, TeamRepository},
};

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error(transparent)]
    Team(#[from] TeamError),
    #[error(transparent)]
    Review(#[from] ReviewError),
}

/// Load assigned teams and approving reviews, then fold.
///
/// No snapshot isolation across the two reads: a team unassigned between
/// them just shrinks the denominator, which is acceptable because the merge
/// gate recomputes at merge time.
pub async fn compute_approval_status(
    pool: &SqlitePool,
    project_id: Uuid,
    pr_number: i64,
) -> Result<ApprovalStatus, ApprovalError> {
    let assigned = TeamRepository::list_for_project(pool, project_id).await?;
    if assigned.is_empty() {
        // Fail closed without touching the review store.
        return Ok(aggregate(&assigned, &[]));
    }
    let approving = ReviewRepository::list_approving(pool, project_id, pr_number).await?;
    Ok(aggregate(&assigned, &approving))
}

/// Pure fold over (assigned teams, approving reviews).
///
/// Assigned teams are deduplicated by id, order preserved. An approving
/// review whose team is no longer assigned is ignored. Rejections never
/// appear in the input and never subtract: a team is satisfied the moment
/// any one member approves. Zero assigned teams is never mergeable.
pub fn aggregate(assigned: &[TeamRef], approving: &[ApprovingReview]) -> ApprovalStatus {
    let mut statuses: Vec<TeamApprovalStatus> = Vec::with_capacity(assigned.len());
    let mut index: HashMap<Uuid, usize> = HashMap::with_capacity(assigned.len());

    for team in assigned {
        if index.contains_key(&team.id) {
            continue;
        }
        index.insert(team.id, statuses.len());
        statuses.push(TeamApprovalStatus {
            team_id: team.id,
            team_name: team.name.clone(),
            approved: false,
            approved_by: Vec::new(),
        });
    }

    for review in approving {
        if let Some(&slot) = index.get(&review.team_id) {
            let status = &mut statuses[slot];
            status.approved = true;
            status.approved_by.push(ReviewerSummary {
                user_id: review.user_id,
                display_name: review.display_name.clone(),
            });
        }
    }

    let can_merge = !statuses.is_empty() && statuses.iter().all(|status| status.approved);
    let message = if statuses.is_empty() {
        "no teams are assigned to this project".to_string()
    } else if can_merge {
        "all assigned teams have approved".to_string()
    } else {
        let waiting: Vec<&str> = statuses
            .iter()
            .filter(|status| !status.approved)
            .map(|status| status.team_name.as_str())
            .collect();
        format!("waiting on approval from: {}", waiting.join(", "))
    };

    ApprovalStatus {
        can_merge,
        message,
        team_approvals: statuses,
    }
}
