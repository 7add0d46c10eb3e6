use api_types::User;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct UserRepository;

impl UserRepository {
    pub async fn create(
        pool: &SqlitePool,
        username: &str,
        display_name: &str,
        email: Option<&str>,
    ) -> Result<User, UserError> {
        let id = Uuid::new_v4();
        let record = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, display_name, email)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, display_name, email, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(display_name)
        .bind(email)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>, UserError> {
        let record = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, display_name, email, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }
}
