//! User endpoints.

use agora_common::AppResult;
use agora_core::PostView;
use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};

use crate::{extractors::MaybeAuthUser, middleware::AppState, response::ApiResponse};

/// All posts by one user, newest first.
async fn posts(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<PostView>>> {
    let user = state.user_service.get(&id).await?;
    let posts = state
        .post_service
        .list_by_author(&user.id, viewer.id())
        .await?;

    Ok(ApiResponse::ok(posts))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/posts", get(posts))
}
