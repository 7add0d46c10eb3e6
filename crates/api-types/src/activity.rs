use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;
use uuid::Uuid;

/// Best-effort audit record of a user action.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, TS)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    #[sqlx(json)]
    pub detail: Value,
    pub created_at: DateTime<Utc>,
}
