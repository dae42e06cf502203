//! API endpoints.

mod auth;
mod comments;
mod posts;
mod users;

use agora_common::AppResult;
use agora_core::VoteValue;
use agora_db::entities::vote::TargetType;
use axum::Router;
use serde::Deserialize;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .nest("/posts", posts::router())
        .nest("/comments", comments::router())
        .nest("/users", users::router())
}

/// Vote request body, shared by posts and comments.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteRequest {
    /// -1, 0 or 1
    vote_type: i32,
    /// Treat a repeat of the current vote as withdrawing it.
    #[serde(default)]
    toggle: bool,
}

impl VoteRequest {
    async fn resolve(
        &self,
        state: &AppState,
        target_id: &str,
        user_id: &str,
        target_type: TargetType,
    ) -> AppResult<VoteValue> {
        let vote = VoteValue::try_from(self.vote_type)?;
        if !self.toggle {
            return Ok(vote);
        }

        let current = state
            .voting_service
            .get_user_vote(target_id, user_id, target_type)
            .await?;
        Ok(vote.resolve_toggle(current))
    }
}
