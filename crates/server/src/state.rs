use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{
    activity::ActivityRecorder, config::ServerConfig, git_host::GitHost, rooms::RoomRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    config: ServerConfig,
    rooms: Arc<RoomRegistry>,
    git_host: Arc<dyn GitHost>,
    activity: ActivityRecorder,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: ServerConfig, git_host: Arc<dyn GitHost>) -> Self {
        let activity = ActivityRecorder::new(pool.clone());
        Self {
            pool,
            config,
            rooms: Arc::new(RoomRegistry::new()),
            git_host,
            activity,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn git_host(&self) -> &dyn GitHost {
        self.git_host.as_ref()
    }

    pub fn activity(&self) -> &ActivityRecorder {
        &self.activity
    }
}
