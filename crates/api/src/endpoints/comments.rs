//! Comment endpoints.

use agora_common::{AppError, AppResult};
use agora_core::{CommentView, CreateCommentInput, UpdateCommentInput};
use agora_db::entities::vote::TargetType;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;

use super::VoteRequest;
use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Result of a cascade delete.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    /// Comments removed, the target included.
    pub deleted: usize,
}

/// Get a comment.
async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<CommentView>> {
    let comment = state.comment_service.get_comment(&id, viewer.id()).await?;

    Ok(ApiResponse::ok(comment))
}

/// Edit a comment. Owner only.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCommentInput>,
) -> AppResult<ApiResponse<CommentView>> {
    let comment = state.comment_service.get_comment(&id, None).await?;
    if comment.author_id != user.id {
        return Err(AppError::Forbidden(
            "Not authorized to edit this comment".to_string(),
        ));
    }

    let updated = state.comment_service.update_comment(&id, input).await?;

    Ok(ApiResponse::ok(updated))
}

/// Delete a comment and all replies beneath it. Owner only.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<DeleteResponse>> {
    let comment = state.comment_service.get_comment(&id, None).await?;
    if comment.author_id != user.id {
        return Err(AppError::Forbidden(
            "Not authorized to delete this comment".to_string(),
        ));
    }

    let deleted = state.comment_service.delete_comment(&id).await?;

    Ok(ApiResponse::ok(DeleteResponse { deleted }))
}

/// Reply to a comment.
async fn reply(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateCommentInput>,
) -> AppResult<(StatusCode, ApiResponse<CommentView>)> {
    let reply = state
        .comment_service
        .create_reply(&id, &user.id, input)
        .await?;

    Ok(ApiResponse::created(reply))
}

/// Vote on a comment.
async fn vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> AppResult<ApiResponse<CommentView>> {
    let vote = req
        .resolve(&state, &id, &user.id, TargetType::Comment)
        .await?;
    let comment = state.comment_service.vote(&id, &user.id, vote).await?;

    Ok(ApiResponse::ok(comment))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(show).put(update).delete(delete))
        .route("/{id}/replies", post(reply))
        .route("/{id}/vote", post(vote))
}
