//! Vote tally service.
//!
//! Votes live in a ledger with at most one row per (user, target). The
//! `votes` column on posts and comments is a cache of that ledger and is
//! recomputed in full after every ledger change.

use std::collections::HashMap;

use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::vote::{self, TargetType},
    repositories::{CommentRepository, PostRepository, VoteRepository},
};
use sea_orm::Set;

/// A single user's stance on a post or comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteValue {
    Down,
    Neutral,
    Up,
}

impl VoteValue {
    /// Ledger representation. `Neutral` is never stored.
    #[must_use]
    pub const fn as_i16(self) -> i16 {
        match self {
            Self::Down => -1,
            Self::Neutral => 0,
            Self::Up => 1,
        }
    }

    /// Repeating the current vote withdraws it.
    #[must_use]
    pub fn resolve_toggle(self, current: i16) -> Self {
        if self.as_i16() == current {
            Self::Neutral
        } else {
            self
        }
    }
}

impl TryFrom<i32> for VoteValue {
    type Error = AppError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Down),
            0 => Ok(Self::Neutral),
            1 => Ok(Self::Up),
            other => Err(AppError::Validation(format!(
                "voteType must be -1, 0 or 1, got {other}"
            ))),
        }
    }
}

/// Vote service for business logic.
#[derive(Clone)]
pub struct VotingService {
    vote_repo: VoteRepository,
    post_repo: PostRepository,
    comment_repo: CommentRepository,
    id_gen: IdGenerator,
}

impl VotingService {
    /// Create a new voting service.
    #[must_use]
    pub const fn new(
        vote_repo: VoteRepository,
        post_repo: PostRepository,
        comment_repo: CommentRepository,
    ) -> Self {
        Self {
            vote_repo,
            post_repo,
            comment_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Record a vote and return the target's new tally.
    ///
    /// Any previous vote by the user is replaced. A neutral vote only removes
    /// the previous one. The caller is responsible for checking that the
    /// target exists.
    pub async fn vote_on(
        &self,
        target_id: &str,
        user_id: &str,
        vote: VoteValue,
        target_type: TargetType,
    ) -> AppResult<i32> {
        self.vote_repo
            .delete_by_user_and_target(user_id, target_id, target_type)
            .await?;

        if vote != VoteValue::Neutral {
            let model = vote::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user_id.to_string()),
                target_id: Set(target_id.to_string()),
                target_type: Set(target_type),
                vote_type: Set(vote.as_i16()),
                created_at: Set(chrono::Utc::now().into()),
            };
            self.vote_repo.create(model).await?;
        }

        let votes = self.tally(target_id, target_type).await?;

        match target_type {
            TargetType::Post => self.post_repo.set_votes(target_id, votes).await?,
            TargetType::Comment => self.comment_repo.set_votes(target_id, votes).await?,
        }

        tracing::debug!(
            target_id,
            ?target_type,
            user_id,
            vote = vote.as_i16(),
            votes,
            "Vote recorded"
        );

        Ok(votes)
    }

    /// Recompute a target's score from the ledger.
    pub async fn tally(&self, target_id: &str, target_type: TargetType) -> AppResult<i32> {
        let up = self
            .vote_repo
            .count_by_target_and_type(target_id, target_type, 1)
            .await?;
        let down = self
            .vote_repo
            .count_by_target_and_type(target_id, target_type, -1)
            .await?;

        i32::try_from(up as i64 - down as i64)
            .map_err(|_| AppError::Internal(format!("Vote tally overflow for {target_id}")))
    }

    /// The user's vote on a target, 0 when they have not voted.
    pub async fn get_user_vote(
        &self,
        target_id: &str,
        user_id: &str,
        target_type: TargetType,
    ) -> AppResult<i16> {
        Ok(self
            .vote_repo
            .find(user_id, target_id, target_type)
            .await?
            .map_or(0, |v| v.vote_type))
    }

    /// The user's votes on many targets at once. Targets without a vote are absent.
    pub async fn get_user_votes(
        &self,
        target_ids: &[String],
        user_id: &str,
        target_type: TargetType,
    ) -> AppResult<HashMap<String, i16>> {
        let votes = self
            .vote_repo
            .find_by_user_and_targets(user_id, target_ids, target_type)
            .await?;

        Ok(votes.into_iter().map(|v| (v.target_id, v.vote_type)).collect())
    }

    /// Drop every ledger row for targets that are being deleted.
    pub async fn purge(&self, target_ids: &[String], target_type: TargetType) -> AppResult<u64> {
        self.vote_repo.delete_by_targets(target_ids, target_type).await
    }
}
