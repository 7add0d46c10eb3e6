use api_types::Project;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct ProjectRepository;

impl ProjectRepository {
    pub async fn create(
        pool: &SqlitePool,
        name: &str,
        repo_owner: &str,
        repo_name: &str,
    ) -> Result<Project, ProjectError> {
        let id = Uuid::new_v4();
        let record = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (id, name, repo_owner, repo_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, repo_owner, repo_name, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(repo_owner)
        .bind(repo_name)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Project>, ProjectError> {
        let record = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, repo_owner, repo_name, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }
}
