use std::sync::Arc;

use anyhow::Context;
use axum::{Router, middleware, routing::get};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    AppState, auth,
    config::ServerConfig,
    git_host::GitHubClient,
    routes,
};

pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let pool = SqlitePoolOptions::new()
            .connect(&self.config.database_url)
            .await
            .context("connecting to database")?;
        sqlx::migrate!().run(&pool).await.context("running migrations")?;

        let git_host = GitHubClient::new(
            &self.config.github_api_base,
            self.config.github_token.clone(),
            self.config.upstream_timeout,
        )
        .context("building source-control host client")?;

        let addr = format!("{}:{}", self.config.host, self.config.port);
        let state = AppState::new(pool, self.config, Arc::new(git_host));
        let app = router(state);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding {addr}"))?;
        tracing::info!(%addr, "listening");
        axum::serve(listener, app).await.context("serving")?;
        Ok(())
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::reviews::router())
        .merge(routes::merge::router())
        .merge(routes::comments::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .merge(api)
        .route("/ws", get(routes::ws::ws))
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
