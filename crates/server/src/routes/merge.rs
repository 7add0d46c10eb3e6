use api_types::{MergeRequest, MergeResponse};
use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::post,
};
use tracing::instrument;
use uuid::Uuid;

use super::{ensure_project_member, load_project};
use crate::{
    AppState,
    auth::RequestContext,
    error::{ErrorResponse, not_approved, upstream_error},
    merge::{self, MergeGateError},
};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/projects/{project_id}/pulls/{pr_number}/merge",
        post(merge_pull_request),
    )
}

#[instrument(
    name = "merge.merge_pull_request",
    skip(state, ctx, payload),
    fields(project_id = %project_id, pr_number, user_id = %ctx.user.id)
)]
async fn merge_pull_request(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((project_id, pr_number)): Path<(Uuid, i64)>,
    Json(payload): Json<MergeRequest>,
) -> Result<Json<MergeResponse>, ErrorResponse> {
    let project = load_project(state.pool(), project_id).await?;
    ensure_project_member(state.pool(), project_id, ctx.user.id).await?;

    let outcome = merge::attempt_merge(
        state.pool(),
        state.git_host(),
        &project,
        pr_number,
        &payload,
    )
    .await
    .map_err(|error| match error {
        MergeGateError::NotApproved(status) => not_approved(status),
        MergeGateError::Approval(error) => {
            tracing::error!(?error, "failed to compute approval status for merge");
            ErrorResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to compute approval status",
            )
        }
        MergeGateError::Host(error) => {
            tracing::error!(?error, "upstream merge failed");
            upstream_error(error, "merge failed upstream")
        }
    })?;

    state.activity().record(
        ctx.user.id,
        "pr.merged",
        serde_json::json!({
            "project_id": project_id,
            "pr_number": pr_number,
            "strategy": payload.strategy,
            "sha": outcome.sha.clone(),
        }),
    );

    Ok(Json(outcome))
}
