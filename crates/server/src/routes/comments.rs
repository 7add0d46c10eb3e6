use api_types::{
    Comment, CreateCommentRequest, ListCommentsResponse, ServerEvent, UpdateCommentRequest,
};
use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, patch},
};
use tracing::instrument;
use uuid::Uuid;

use super::{ensure_project_member, load_project};
use crate::{
    AppState,
    auth::RequestContext,
    db::comments::CommentRepository,
    error::{ErrorResponse, db_error},
    rooms::pr_room,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_id}/pulls/{pr_number}/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/comments/{comment_id}",
            patch(update_comment).delete(delete_comment),
        )
}

#[instrument(
    name = "comments.list_comments",
    skip(state, ctx),
    fields(project_id = %project_id, pr_number, user_id = %ctx.user.id)
)]
async fn list_comments(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((project_id, pr_number)): Path<(Uuid, i64)>,
) -> Result<Json<ListCommentsResponse>, ErrorResponse> {
    load_project(state.pool(), project_id).await?;
    ensure_project_member(state.pool(), project_id, ctx.user.id).await?;

    let comments = CommentRepository::list_for_pull_request(state.pool(), project_id, pr_number)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to list comments");
            ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "failed to list comments")
        })?;

    Ok(Json(ListCommentsResponse { comments }))
}

#[instrument(
    name = "comments.create_comment",
    skip(state, ctx, payload),
    fields(project_id = %project_id, pr_number, user_id = %ctx.user.id)
)]
async fn create_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((project_id, pr_number)): Path<(Uuid, i64)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<Comment>, ErrorResponse> {
    load_project(state.pool(), project_id).await?;
    ensure_project_member(state.pool(), project_id, ctx.user.id).await?;

    if payload.content.trim().is_empty() {
        return Err(ErrorResponse::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "comment content must not be empty",
        ));
    }

    if let Some(parent_id) = payload.parent_id {
        let parent = CommentRepository::find_by_id(state.pool(), parent_id)
            .await
            .map_err(|error| {
                tracing::error!(?error, %parent_id, "failed to load parent comment");
                ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            })?
            .ok_or_else(|| ErrorResponse::new(StatusCode::NOT_FOUND, "parent comment not found"))?;
        if parent.project_id != project_id || parent.pr_number != pr_number {
            return Err(ErrorResponse::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "parent comment belongs to a different pull request",
            ));
        }
    }

    let comment = CommentRepository::create(
        state.pool(),
        ctx.user.id,
        project_id,
        pr_number,
        &payload.content,
        payload.file_path.as_deref(),
        payload.line_number,
        payload.parent_id,
    )
    .await
    .map_err(|error| {
        tracing::error!(?error, "failed to create comment");
        db_error(error, "failed to create comment")
    })?;

    state.activity().record(
        ctx.user.id,
        "comment.posted",
        serde_json::json!({
            "comment_id": comment.id,
            "project_id": project_id,
            "pr_number": pr_number,
            "is_reply": payload.parent_id.is_some(),
        }),
    );

    state.rooms().broadcast(
        &pr_room(project_id, pr_number),
        &ServerEvent::CommentAdded {
            comment: comment.clone(),
        },
    );

    Ok(Json(comment))
}

#[instrument(
    name = "comments.update_comment",
    skip(state, ctx, payload),
    fields(comment_id = %comment_id, user_id = %ctx.user.id)
)]
async fn update_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, ErrorResponse> {
    let comment = load_live_comment(&state, comment_id).await?;

    if comment.user_id != ctx.user.id {
        return Err(ErrorResponse::new(
            StatusCode::FORBIDDEN,
            "only the author may edit this comment",
        ));
    }
    if payload.content.trim().is_empty() {
        return Err(ErrorResponse::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "comment content must not be empty",
        ));
    }

    let updated = CommentRepository::update_content(state.pool(), comment_id, &payload.content)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to update comment");
            ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "failed to update comment")
        })?;

    state.rooms().broadcast(
        &pr_room(updated.project_id, updated.pr_number),
        &ServerEvent::CommentUpdated {
            comment: updated.clone(),
        },
    );

    Ok(Json(updated))
}

#[instrument(
    name = "comments.delete_comment",
    skip(state, ctx),
    fields(comment_id = %comment_id, user_id = %ctx.user.id)
)]
async fn delete_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(comment_id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    let comment = load_live_comment(&state, comment_id).await?;

    if comment.user_id != ctx.user.id {
        return Err(ErrorResponse::new(
            StatusCode::FORBIDDEN,
            "only the author may delete this comment",
        ));
    }

    let tombstoned = CommentRepository::tombstone(state.pool(), comment_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to delete comment");
            ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "failed to delete comment")
        })?;

    state.rooms().broadcast(
        &pr_room(tombstoned.project_id, tombstoned.pr_number),
        &ServerEvent::CommentDeleted {
            comment_id: tombstoned.id,
            project_id: tombstoned.project_id,
            pr_number: tombstoned.pr_number,
        },
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Load a comment that has not been tombstoned.
async fn load_live_comment(state: &AppState, comment_id: Uuid) -> Result<Comment, ErrorResponse> {
    let comment = CommentRepository::find_by_id(state.pool(), comment_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %comment_id, "failed to load comment");
            ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "failed to load comment")
        })?
        .ok_or_else(|| ErrorResponse::new(StatusCode::NOT_FOUND, "comment not found"))?;

    if comment.deleted {
        return Err(ErrorResponse::new(
            StatusCode::NOT_FOUND,
            "comment not found",
        ));
    }
    Ok(comment)
}
