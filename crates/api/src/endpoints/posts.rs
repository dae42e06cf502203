//! Post endpoints.

use agora_common::{AppError, AppResult};
use agora_core::{
    CommentTree, CommentView, CreateCommentInput, CreatePostInput, PostPage, PostView,
    UpdatePostInput,
};
use agora_db::entities::vote::TargetType;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use super::VoteRequest;
use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{self, ApiResponse},
};

/// Highest feed page a client may ask for.
const MAX_PAGE: u64 = 1_000_000;

/// Feed paging parameters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Paged feed, newest first.
async fn list(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<PostPage>> {
    let page = query.page.unwrap_or(1).clamp(1, MAX_PAGE);
    let limit = query
        .limit
        .unwrap_or(state.feed.default_limit)
        .clamp(1, state.feed.max_limit);

    let posts = state.post_service.list(viewer.id(), page, limit).await?;

    Ok(ApiResponse::ok(posts))
}

/// Create a new post.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePostInput>,
) -> AppResult<(StatusCode, ApiResponse<PostView>)> {
    let post = state.post_service.create(&user.id, input).await?;

    Ok(ApiResponse::created(post))
}

/// Get a post.
async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PostView>> {
    let post = state.post_service.get(&id, viewer.id()).await?;

    Ok(ApiResponse::ok(post))
}

/// Edit a post. Owner only.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdatePostInput>,
) -> AppResult<ApiResponse<PostView>> {
    let post = state.post_service.get(&id, None).await?;
    if post.author_id != user.id {
        return Err(AppError::Forbidden(
            "Not authorized to edit this post".to_string(),
        ));
    }

    let updated = state.post_service.update(&id, input).await?;

    Ok(ApiResponse::ok(updated))
}

/// Delete a post with its comments. Owner only.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let post = state.post_service.get(&id, None).await?;
    if post.author_id != user.id {
        return Err(AppError::Forbidden(
            "Not authorized to delete this post".to_string(),
        ));
    }

    state.post_service.delete(&id).await?;

    Ok(response::ok())
}

/// Vote on a post.
async fn vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> AppResult<ApiResponse<PostView>> {
    let vote = req.resolve(&state, &id, &user.id, TargetType::Post).await?;
    let post = state.post_service.vote(&id, &user.id, vote).await?;

    Ok(ApiResponse::ok(post))
}

/// Flat list of a post's comments, newest first.
async fn comments(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResponse<Vec<CommentView>> {
    ApiResponse::ok(
        state
            .comment_service
            .get_comments_by_post_with_user_votes(&id, viewer.id())
            .await,
    )
}

/// A post's comments as reply trees.
async fn comment_tree(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResponse<Vec<CommentTree>> {
    ApiResponse::ok(
        state
            .comment_service
            .get_comment_tree(&id, viewer.id())
            .await,
    )
}

/// Add a root comment to a post.
async fn create_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateCommentInput>,
) -> AppResult<(StatusCode, ApiResponse<CommentView>)> {
    let comment = state
        .comment_service
        .create_comment(&id, &user.id, input)
        .await?;

    Ok(ApiResponse::created(comment))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(delete))
        .route("/{id}/vote", post(vote))
        .route("/{id}/comments", get(comments).post(create_comment))
        .route("/{id}/comments/tree", get(comment_tree))
}
