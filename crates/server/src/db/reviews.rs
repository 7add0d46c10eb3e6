use api_types::Review;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use super::is_unique_violation;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("review submission conflicted with a concurrent submission")]
    Conflict,
}

/// An approving review joined with its reviewer's display name, as consumed
/// by the approval aggregator.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApprovingReview {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
}

pub struct ReviewRepository;

impl ReviewRepository {
    /// Atomic upsert keyed by (user_id, project_id, pr_number).
    ///
    /// A resubmission overwrites team/approved/comment and bumps updated_at,
    /// so a reviewer can flip a decision or switch teams without creating
    /// duplicate state. The store's unique constraint serializes concurrent
    /// submissions for the same key; a unique violation that still escapes
    /// the upsert is retried once before surfacing as a conflict.
    pub async fn upsert(
        pool: &SqlitePool,
        user_id: Uuid,
        project_id: Uuid,
        pr_number: i64,
        team_id: Uuid,
        approved: bool,
        comment: Option<&str>,
    ) -> Result<Review, ReviewError> {
        match Self::upsert_once(pool, user_id, project_id, pr_number, team_id, approved, comment)
            .await
        {
            Err(error) if is_unique_violation(&error) => {
                tracing::warn!(
                    %user_id, %project_id, pr_number,
                    "review upsert lost a uniqueness race, retrying once"
                );
                Self::upsert_once(pool, user_id, project_id, pr_number, team_id, approved, comment)
                    .await
                    .map_err(|error| {
                        if is_unique_violation(&error) {
                            ReviewError::Conflict
                        } else {
                            ReviewError::Database(error)
                        }
                    })
            }
            other => other.map_err(ReviewError::Database),
        }
    }

    async fn upsert_once(
        pool: &SqlitePool,
        user_id: Uuid,
        project_id: Uuid,
        pr_number: i64,
        team_id: Uuid,
        approved: bool,
        comment: Option<&str>,
    ) -> Result<Review, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (id, user_id, project_id, pr_number, team_id, approved, comment)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, project_id, pr_number) DO UPDATE SET
                team_id = excluded.team_id,
                approved = excluded.approved,
                comment = excluded.comment,
                updated_at = datetime('now', 'subsec')
            RETURNING id, user_id, project_id, pr_number, team_id, approved, comment,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(project_id)
        .bind(pr_number)
        .bind(team_id)
        .bind(approved)
        .bind(comment)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_key(
        pool: &SqlitePool,
        user_id: Uuid,
        project_id: Uuid,
        pr_number: i64,
    ) -> Result<Option<Review>, ReviewError> {
        let record = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, user_id, project_id, pr_number, team_id, approved, comment,
                   created_at, updated_at
            FROM reviews
            WHERE user_id = $1 AND project_id = $2 AND pr_number = $3
            "#,
        )
        .bind(user_id)
        .bind(project_id)
        .bind(pr_number)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    pub async fn list_for_pull_request(
        pool: &SqlitePool,
        project_id: Uuid,
        pr_number: i64,
    ) -> Result<Vec<Review>, ReviewError> {
        let records = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, user_id, project_id, pr_number, team_id, approved, comment,
                   created_at, updated_at
            FROM reviews
            WHERE project_id = $1 AND pr_number = $2
            ORDER BY created_at
            "#,
        )
        .bind(project_id)
        .bind(pr_number)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    /// Approving reviews for a pull request, in review-creation order, with
    /// reviewer display names resolved.
    pub async fn list_approving(
        pool: &SqlitePool,
        project_id: Uuid,
        pr_number: i64,
    ) -> Result<Vec<ApprovingReview>, ReviewError> {
        let records = sqlx::query_as::<_, ApprovingReview>(
            r#"
            SELECT r.team_id, r.user_id, u.display_name
            FROM reviews r
            INNER JOIN users u ON u.id = r.user_id
            WHERE r.project_id = $1 AND r.pr_number = $2 AND r.approved = 1
            ORDER BY r.created_at
            "#,
        )
        .bind(project_id)
        .bind(pr_number)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use api_types::AccessLevel;
    use sqlx::SqlitePool;

    use super::*;
    use crate::db::{
        projects::ProjectRepository, teams::TeamRepository, users::UserRepository,
    };

    struct Fixture {
        project_id: Uuid,
        team_a: Uuid,
        team_b: Uuid,
        user_id: Uuid,
    }

    async fn seed(pool: &SqlitePool) -> Fixture {
        let project = ProjectRepository::create(pool, "p", "octo", "p").await.unwrap();
        let team_a = TeamRepository::create(pool, "team-a").await.unwrap();
        let team_b = TeamRepository::create(pool, "team-b").await.unwrap();
        let user = UserRepository::create(pool, "u1", "User One", None).await.unwrap();
        TeamRepository::add_member(pool, team_a.id, user.id).await.unwrap();
        TeamRepository::add_member(pool, team_b.id, user.id).await.unwrap();
        for team_id in [team_a.id, team_b.id] {
            TeamRepository::assign_to_project(pool, project.id, team_id, AccessLevel::Write)
                .await
                .unwrap();
        }
        Fixture {
            project_id: project.id,
            team_a: team_a.id,
            team_b: team_b.id,
            user_id: user.id,
        }
    }

    #[sqlx::test]
    async fn resubmission_overwrites_in_place(pool: SqlitePool) {
        let f = seed(&pool).await;

        let first = ReviewRepository::upsert(
            &pool, f.user_id, f.project_id, 42, f.team_a, true, Some("lgtm"),
        )
        .await
        .unwrap();

        let second = ReviewRepository::upsert(
            &pool, f.user_id, f.project_id, 42, f.team_a, false, Some("wait"),
        )
        .await
        .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert!(!second.approved);
        assert_eq!(second.comment.as_deref(), Some("wait"));

        let all = ReviewRepository::list_for_pull_request(&pool, f.project_id, 42)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[sqlx::test]
    async fn resubmission_may_switch_teams(pool: SqlitePool) {
        let f = seed(&pool).await;

        ReviewRepository::upsert(&pool, f.user_id, f.project_id, 42, f.team_a, true, None)
            .await
            .unwrap();
        let switched =
            ReviewRepository::upsert(&pool, f.user_id, f.project_id, 42, f.team_b, true, None)
                .await
                .unwrap();

        assert_eq!(switched.team_id, f.team_b);

        let approving = ReviewRepository::list_approving(&pool, f.project_id, 42)
            .await
            .unwrap();
        assert_eq!(approving.len(), 1);
        assert_eq!(approving[0].team_id, f.team_b);
    }

    #[sqlx::test]
    async fn reviews_are_scoped_per_pull_request(pool: SqlitePool) {
        let f = seed(&pool).await;

        ReviewRepository::upsert(&pool, f.user_id, f.project_id, 42, f.team_a, true, None)
            .await
            .unwrap();
        ReviewRepository::upsert(&pool, f.user_id, f.project_id, 43, f.team_a, false, None)
            .await
            .unwrap();

        let pr_42 = ReviewRepository::find_by_key(&pool, f.user_id, f.project_id, 42)
            .await
            .unwrap()
            .unwrap();
        assert!(pr_42.approved);

        let approving_43 = ReviewRepository::list_approving(&pool, f.project_id, 43)
            .await
            .unwrap();
        assert!(approving_43.is_empty());
    }

    #[sqlx::test]
    async fn concurrent_resubmissions_collapse_to_one_record(pool: SqlitePool) {
        let f = seed(&pool).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let pool = pool.clone();
            let approved = i % 2 == 0;
            let (user_id, project_id, team_id) = (f.user_id, f.project_id, f.team_a);
            handles.push(tokio::spawn(async move {
                ReviewRepository::upsert(&pool, user_id, project_id, 42, team_id, approved, None)
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let all = ReviewRepository::list_for_pull_request(&pool, f.project_id, 42)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }
}
