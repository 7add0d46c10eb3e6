use api_types::{ApprovalStatus, Review, ServerEvent, SubmitReviewRequest};
use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, post},
};
use tracing::instrument;
use uuid::Uuid;

use super::load_project;
use crate::{
    AppState,
    approval,
    auth::RequestContext,
    db::{
        reviews::{ReviewError, ReviewRepository},
        teams::TeamRepository,
    },
    error::{ErrorResponse, db_error, upstream_error},
    rooms::pr_room,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_id}/pulls/{pr_number}/reviews",
            post(submit_review),
        )
        .route(
            "/projects/{project_id}/pulls/{pr_number}/approval-status",
            get(approval_status),
        )
}

#[instrument(
    name = "reviews.submit_review",
    skip(state, ctx, payload),
    fields(project_id = %project_id, pr_number, user_id = %ctx.user.id, team_id = %payload.team_id)
)]
async fn submit_review(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((project_id, pr_number)): Path<(Uuid, i64)>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<Json<Review>, ErrorResponse> {
    let project = load_project(state.pool(), project_id).await?;

    let team = TeamRepository::find_by_id(state.pool(), payload.team_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, team_id = %payload.team_id, "failed to load team");
            ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "failed to load team")
        })?
        .ok_or_else(|| ErrorResponse::new(StatusCode::NOT_FOUND, "team not found"))?;

    let assigned = TeamRepository::is_team_assigned(state.pool(), project_id, team.id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to check team assignment");
            ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        })?;
    if !assigned {
        return Err(ErrorResponse::new(
            StatusCode::FORBIDDEN,
            "team is not assigned to this project",
        ));
    }

    let is_member = TeamRepository::is_member(state.pool(), team.id, ctx.user.id)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to check team membership");
            ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        })?;
    if !is_member {
        return Err(ErrorResponse::new(
            StatusCode::FORBIDDEN,
            "you are not a member of this team",
        ));
    }

    // The host is the oracle for whether this PR number refers to a real
    // item; its title also goes into the activity record.
    let pr = state
        .git_host()
        .fetch_pull_request(&project, pr_number)
        .await
        .map_err(|error| upstream_error(error, "failed to fetch pull request"))?;

    let review = ReviewRepository::upsert(
        state.pool(),
        ctx.user.id,
        project_id,
        pr_number,
        team.id,
        payload.approved,
        payload.comment.as_deref(),
    )
    .await
    .map_err(|error| match error {
        ReviewError::Conflict => ErrorResponse::new(
            StatusCode::CONFLICT,
            "review submission conflicted with a concurrent submission",
        ),
        ReviewError::Database(error) => {
            tracing::error!(?error, "failed to upsert review");
            db_error(error, "failed to submit review")
        }
    })?;

    state.activity().record(
        ctx.user.id,
        "review.submitted",
        serde_json::json!({
            "project_id": project_id,
            "pr_number": pr_number,
            "pr_title": pr.title,
            "team_id": team.id,
            "approved": payload.approved,
        }),
    );

    if state.config().broadcast_reviews {
        state.rooms().broadcast(
            &pr_room(project_id, pr_number),
            &ServerEvent::ReviewSubmitted {
                review: review.clone(),
            },
        );
    }

    Ok(Json(review))
}

#[instrument(
    name = "reviews.approval_status",
    skip(state, ctx),
    fields(project_id = %project_id, pr_number, user_id = %ctx.user.id)
)]
async fn approval_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((project_id, pr_number)): Path<(Uuid, i64)>,
) -> Result<Json<ApprovalStatus>, ErrorResponse> {
    load_project(state.pool(), project_id).await?;

    let status = approval::compute_approval_status(state.pool(), project_id, pr_number)
        .await
        .map_err(|error| {
            tracing::error!(?error, "failed to compute approval status");
            ErrorResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to compute approval status",
            )
        })?;

    Ok(Json(status))
}
