use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::activities::ActivityRepository;

/// Fire-and-forget audit sink. `record` returns before the insert runs and
/// never propagates a failure to the caller; audit-trail loss must not take
/// down a user-facing operation. Call only after the primary write commits.
#[derive(Clone)]
pub struct ActivityRecorder {
    pool: SqlitePool,
}

impl ActivityRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn record(&self, user_id: Uuid, action: &str, detail: Value) {
        let pool = self.pool.clone();
        let action = action.to_string();

        tokio::spawn(async move {
            if let Err(error) = ActivityRepository::create(&pool, user_id, &action, &detail).await {
                tracing::warn!(?error, action = %action, %user_id, "failed to record activity");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::db::users::UserRepository;

    #[sqlx::test]
    async fn record_persists_without_blocking_the_caller(pool: SqlitePool) {
        let user = UserRepository::create(&pool, "u1", "User One", None)
            .await
            .unwrap();
        let recorder = ActivityRecorder::new(pool.clone());

        recorder.record(user.id, "review.submitted", json!({"pr_number": 42}));

        // The insert runs on a spawned task; poll briefly for it to land.
        let mut rows = Vec::new();
        for _ in 0..50 {
            rows = ActivityRepository::list_recent_for_user(&pool, user.id, 10)
                .await
                .unwrap();
            if !rows.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action, "review.submitted");
        assert_eq!(rows[0].detail, json!({"pr_number": 42}));
    }

    #[sqlx::test]
    async fn record_swallows_insert_failures(pool: SqlitePool) {
        let recorder = ActivityRecorder::new(pool.clone());

        // No such user: the FK violation is logged and dropped, never raised.
        recorder.record(Uuid::new_v4(), "comment.posted", json!({}));
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
