use api_types::{AccessLevel, Team, TeamRef};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TeamError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Team membership resolver. Consumed read-only by the approval core; the
/// create/assign operations exist for the out-of-scope CRUD collaborators
/// and for seeding.
pub struct TeamRepository;

impl TeamRepository {
    pub async fn create(pool: &SqlitePool, name: &str) -> Result<Team, TeamError> {
        let id = Uuid::new_v4();
        let record = sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (id, name)
            VALUES ($1, $2)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Team>, TeamError> {
        let record = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM teams
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    pub async fn add_member(
        pool: &SqlitePool,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), TeamError> {
        sqlx::query(
            r#"
            INSERT INTO team_members (team_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (team_id, user_id) DO NOTHING
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn is_member(
        pool: &SqlitePool,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, TeamError> {
        let exists = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM team_members
                WHERE team_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(exists != 0)
    }

    pub async fn assign_to_project(
        pool: &SqlitePool,
        project_id: Uuid,
        team_id: Uuid,
        access_level: AccessLevel,
    ) -> Result<(), TeamError> {
        sqlx::query(
            r#"
            INSERT INTO project_teams (project_id, team_id, access_level)
            VALUES ($1, $2, $3)
            ON CONFLICT (project_id, team_id) DO UPDATE SET access_level = excluded.access_level
            "#,
        )
        .bind(project_id)
        .bind(team_id)
        .bind(access_level)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn unassign_from_project(
        pool: &SqlitePool,
        project_id: Uuid,
        team_id: Uuid,
    ) -> Result<(), TeamError> {
        sqlx::query(
            r#"
            DELETE FROM project_teams
            WHERE project_id = $1 AND team_id = $2
            "#,
        )
        .bind(project_id)
        .bind(team_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Teams currently assigned to a project, in assignment order.
    pub async fn list_for_project(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<TeamRef>, TeamError> {
        let records = sqlx::query_as::<_, TeamRef>(
            r#"
            SELECT t.id, t.name
            FROM project_teams pt
            INNER JOIN teams t ON t.id = pt.team_id
            WHERE pt.project_id = $1
            ORDER BY pt.assigned_at, t.name
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    pub async fn is_team_assigned(
        pool: &SqlitePool,
        project_id: Uuid,
        team_id: Uuid,
    ) -> Result<bool, TeamError> {
        let exists = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM project_teams
                WHERE project_id = $1 AND team_id = $2
            )
            "#,
        )
        .bind(project_id)
        .bind(team_id)
        .fetch_one(pool)
        .await?;

        Ok(exists != 0)
    }

    /// Whether a user belongs to any team assigned to the project.
    pub async fn is_project_member(
        pool: &SqlitePool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, TeamError> {
        let exists = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM project_teams pt
                INNER JOIN team_members tm ON tm.team_id = pt.team_id
                WHERE pt.project_id = $1 AND tm.user_id = $2
            )
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(exists != 0)
    }
}
