pub mod comments;
pub mod merge;
pub mod reviews;
pub mod ws;

use api_types::Project;
use axum::http::StatusCode;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{projects::ProjectRepository, teams::TeamRepository};
use crate::error::ErrorResponse;

pub(crate) async fn load_project(
    pool: &SqlitePool,
    project_id: Uuid,
) -> Result<Project, ErrorResponse> {
    ProjectRepository::find_by_id(pool, project_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %project_id, "failed to load project");
            ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "failed to load project")
        })?
        .ok_or_else(|| ErrorResponse::new(StatusCode::NOT_FOUND, "project not found"))
}

/// The caller must belong to at least one team assigned to the project.
pub(crate) async fn ensure_project_member(
    pool: &SqlitePool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<(), ErrorResponse> {
    let is_member = TeamRepository::is_project_member(pool, project_id, user_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %project_id, %user_id, "failed to check project membership");
            ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        })?;

    if !is_member {
        return Err(ErrorResponse::new(
            StatusCode::FORBIDDEN,
            "you are not a member of any team assigned to this project",
        ));
    }
    Ok(())
}
