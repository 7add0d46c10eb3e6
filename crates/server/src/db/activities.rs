use api_types::Activity;
use serde_json::Value;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct ActivityRepository;

impl ActivityRepository {
    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        action: &str,
        detail: &Value,
    ) -> Result<Activity, ActivityError> {
        let id = Uuid::new_v4();
        let record = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activities (id, user_id, action, detail)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, action, detail, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(action)
        .bind(detail.to_string())
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    pub async fn list_recent_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Activity>, ActivityError> {
        let records = sqlx::query_as::<_, Activity>(
            r#"
            SELECT id, user_id, action, detail, created_at
            FROM activities
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }
}
