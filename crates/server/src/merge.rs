//! The merge gate: the only path from consensus to the host's merge action.

use api_types::{ApprovalStatus, MergeRequest, MergeResponse, Project};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::approval::{self, ApprovalError};
use crate::git_host::{GitHost, GitHostError};

#[derive(Debug, Error)]
pub enum MergeGateError {
    /// Consensus does not hold; carries the current per-team breakdown so the
    /// client can render "waiting on team X" without a second round-trip.
    #[error("pull request is not approved by all assigned teams")]
    NotApproved(ApprovalStatus),
    #[error(transparent)]
    Approval(#[from] ApprovalError),
    #[error(transparent)]
    Host(#[from] GitHostError),
}

/// Re-validate mergeability and, only if unanimous across assigned teams,
/// invoke the external merge action.
///
/// Approvals can change between a status check and a merge attempt, so the
/// aggregator is always re-run here; an earlier result is never trusted. The
/// host call is made at most once: a retried squash could double-apply, so a
/// failed merge must be explicitly resubmitted by the caller. Nothing is
/// marked "merged" locally; the host's response is the single point of truth.
pub async fn attempt_merge(
    pool: &SqlitePool,
    host: &dyn GitHost,
    project: &Project,
    pr_number: i64,
    request: &MergeRequest,
) -> Result<MergeResponse, MergeGateError> {
    let status = approval::compute_approval_status(pool, project.id, pr_number).await?;
    if !status.can_merge {
        return Err(MergeGateError::NotApproved(status));
    }

    let outcome = host.merge_pull_request(project, pr_number, request).await?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use api_types::{AccessLevel, MergeStrategy};
    use async_trait::async_trait;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    use super::*;
    use crate::db::{
        projects::ProjectRepository, reviews::ReviewRepository, teams::TeamRepository,
        users::UserRepository,
    };
    use crate::git_host::PullRequestInfo;

    /// Host double that counts merge calls and returns a canned outcome.
    struct RecordingHost {
        merge_calls: AtomicUsize,
        outcome: Result<MergeResponse, u16>,
    }

    impl RecordingHost {
        fn succeeding() -> Self {
            Self {
                merge_calls: AtomicUsize::new(0),
                outcome: Ok(MergeResponse {
                    merged: true,
                    sha: Some("abc123".to_string()),
                }),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                merge_calls: AtomicUsize::new(0),
                outcome: Err(status),
            }
        }

        fn calls(&self) -> usize {
            self.merge_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GitHost for RecordingHost {
        async fn fetch_pull_request(
            &self,
            _project: &Project,
            pr_number: i64,
        ) -> Result<PullRequestInfo, GitHostError> {
            Ok(PullRequestInfo {
                number: pr_number,
                title: "test pr".to_string(),
                state: "open".to_string(),
                merged: false,
            })
        }

        async fn merge_pull_request(
            &self,
            _project: &Project,
            _pr_number: i64,
            _request: &MergeRequest,
        ) -> Result<MergeResponse, GitHostError> {
            self.merge_calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Ok(outcome) => Ok(outcome.clone()),
                Err(status) => Err(GitHostError::Upstream {
                    status: *status,
                    message: "merge conflict".to_string(),
                }),
            }
        }
    }

    fn merge_request() -> MergeRequest {
        MergeRequest {
            strategy: MergeStrategy::Squash,
            commit_title: None,
            commit_message: None,
        }
    }

    async fn seed_project_with_team(pool: &SqlitePool) -> (Project, Uuid, Uuid) {
        let project = ProjectRepository::create(pool, "gate", "octo", "gate")
            .await
            .unwrap();
        let team = TeamRepository::create(pool, "backend").await.unwrap();
        let user = UserRepository::create(pool, "u1", "User One", None)
            .await
            .unwrap();
        TeamRepository::add_member(pool, team.id, user.id).await.unwrap();
        TeamRepository::assign_to_project(pool, project.id, team.id, AccessLevel::Write)
            .await
            .unwrap();
        (project, team.id, user.id)
    }

    #[sqlx::test]
    async fn refuses_without_contacting_host_when_not_approved(pool: SqlitePool) {
        let (project, _team_id, _user_id) = seed_project_with_team(&pool).await;
        let host = RecordingHost::succeeding();

        let result = attempt_merge(&pool, &host, &project, 42, &merge_request()).await;
        match result {
            Err(MergeGateError::NotApproved(status)) => {
                assert!(!status.can_merge);
                assert_eq!(status.team_approvals.len(), 1);
            }
            other => panic!("expected NotApproved, got {other:?}"),
        }
        assert_eq!(host.calls(), 0);
    }

    #[sqlx::test]
    async fn refuses_when_no_teams_assigned(pool: SqlitePool) {
        let project = ProjectRepository::create(&pool, "empty", "octo", "empty")
            .await
            .unwrap();
        let host = RecordingHost::succeeding();

        let result = attempt_merge(&pool, &host, &project, 1, &merge_request()).await;
        assert!(matches!(result, Err(MergeGateError::NotApproved(_))));
        assert_eq!(host.calls(), 0);
    }

    #[sqlx::test]
    async fn merges_once_when_consensus_holds(pool: SqlitePool) {
        let (project, team_id, user_id) = seed_project_with_team(&pool).await;
        ReviewRepository::upsert(&pool, user_id, project.id, 42, team_id, true, None)
            .await
            .unwrap();

        let host = RecordingHost::succeeding();
        let outcome = attempt_merge(&pool, &host, &project, 42, &merge_request())
            .await
            .unwrap();
        assert!(outcome.merged);
        assert_eq!(outcome.sha.as_deref(), Some("abc123"));
        assert_eq!(host.calls(), 1);
    }

    #[sqlx::test]
    async fn upstream_failure_surfaces_verbatim_without_retry(pool: SqlitePool) {
        let (project, team_id, user_id) = seed_project_with_team(&pool).await;
        ReviewRepository::upsert(&pool, user_id, project.id, 42, team_id, true, None)
            .await
            .unwrap();

        let host = RecordingHost::failing(409);
        let result = attempt_merge(&pool, &host, &project, 42, &merge_request()).await;
        match result {
            Err(MergeGateError::Host(GitHostError::Upstream { status, message })) => {
                assert_eq!(status, 409);
                assert_eq!(message, "merge conflict");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
        assert_eq!(host.calls(), 1);
    }
}
