//! Comment service.

use std::collections::HashSet;

use agora_common::{AppError, AppResult, Config, IdGenerator};
use agora_db::{
    entities::{comment, vote::TargetType},
    repositories::{CommentRepository, PostRepository},
};
use chrono::{DateTime, FixedOffset};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{
    threading::{CommentTree, build_comment_tree, validate_reply_depth},
    user::{AuthorSummary, UserService},
    voting::{VoteValue, VotingService},
};

/// A comment as served to clients: author resolved and the viewer's vote attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub votes: i32,
    /// -1, 0 or 1; always 0 for anonymous viewers.
    pub user_vote: i16,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub author: AuthorSummary,
}

impl CommentView {
    /// Attach an author and the viewer's vote to a stored comment.
    #[must_use]
    pub fn from_model(model: comment::Model, author: AuthorSummary, user_vote: i16) -> Self {
        Self {
            id: model.id,
            content: model.content,
            author_id: model.author_id,
            post_id: model.post_id,
            parent_id: model.parent_id,
            votes: model.votes,
            user_vote,
            created_at: model.created_at,
            updated_at: model.updated_at,
            author,
        }
    }
}

/// Input for creating a comment or a reply.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentInput {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

/// Input for editing a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentInput {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    user_service: UserService,
    voting_service: VotingService,
    id_gen: IdGenerator,
    max_reply_depth: usize,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        user_service: UserService,
        voting_service: VotingService,
        config: &Config,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_service,
            voting_service,
            id_gen: IdGenerator::new(),
            max_reply_depth: config.threading.max_reply_depth,
        }
    }

    /// The reply tree of a post.
    ///
    /// Storage failures are logged and yield an empty tree.
    pub async fn get_comment_tree(&self, post_id: &str, viewer_id: Option<&str>) -> Vec<CommentTree> {
        build_comment_tree(
            self.get_comments_by_post_with_user_votes(post_id, viewer_id)
                .await,
        )
    }

    /// All comments on a post, newest first, with the viewer's votes.
    ///
    /// Storage failures are logged and yield an empty list.
    pub async fn get_comments_by_post_with_user_votes(
        &self,
        post_id: &str,
        viewer_id: Option<&str>,
    ) -> Vec<CommentView> {
        match self.comments_with_votes(post_id, viewer_id).await {
            Ok(comments) => comments,
            Err(e) => {
                tracing::error!(error = %e, post_id, "Failed to load comments");
                Vec::new()
            }
        }
    }

    /// All comments on a post, newest first, without viewer votes.
    pub async fn get_comments_by_post(&self, post_id: &str) -> AppResult<Vec<CommentView>> {
        let comments = self.comment_repo.find_by_post(post_id).await?;
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let author_ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();
        let authors = self.user_service.author_summaries(&author_ids).await?;

        Ok(comments
            .into_iter()
            .map(|c| {
                let author = authors
                    .get(&c.author_id)
                    .cloned()
                    .unwrap_or_else(|| AuthorSummary::deleted(&c.author_id));
                CommentView::from_model(c, author, 0)
            })
            .collect())
    }

    /// A single comment.
    pub async fn get_comment(&self, id: &str, viewer_id: Option<&str>) -> AppResult<CommentView> {
        let comment = self.comment_repo.get_by_id(id).await?;
        let user_vote = match viewer_id {
            Some(viewer) => {
                self.voting_service
                    .get_user_vote(id, viewer, TargetType::Comment)
                    .await?
            }
            None => 0,
        };
        self.view(comment, user_vote).await
    }

    /// Add a root comment to a post.
    pub async fn create_comment(
        &self,
        post_id: &str,
        author_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<CommentView> {
        input.validate()?;

        let post = self.post_repo.get_by_id(post_id).await?;
        let comment = self
            .insert(&post.id, None, author_id, input.content)
            .await?;

        tracing::info!(comment_id = %comment.id, post_id, "Comment created");
        self.view(comment, 0).await
    }

    /// Reply to an existing comment.
    ///
    /// The reply lands on the parent's post. Depth is checked against a fresh
    /// read of that post's comments.
    pub async fn create_reply(
        &self,
        parent_id: &str,
        author_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<CommentView> {
        input.validate()?;

        let parent = self
            .comment_repo
            .find_by_id(parent_id)
            .await?
            .ok_or_else(|| AppError::ParentNotFound(parent_id.to_string()))?;

        let siblings = self.comment_repo.find_by_post(&parent.post_id).await?;
        if !validate_reply_depth(parent_id, &siblings, self.max_reply_depth) {
            return Err(AppError::DepthExceeded {
                max_depth: self.max_reply_depth,
            });
        }

        let reply = self
            .insert(&parent.post_id, Some(parent_id), author_id, input.content)
            .await?;

        tracing::info!(comment_id = %reply.id, parent_id, post_id = %reply.post_id, "Reply created");
        self.view(reply, 0).await
    }

    /// Replace a comment's content.
    pub async fn update_comment(
        &self,
        id: &str,
        input: UpdateCommentInput,
    ) -> AppResult<CommentView> {
        input.validate()?;

        let comment = self.comment_repo.get_by_id(id).await?;
        let mut active: comment::ActiveModel = comment.into();
        active.content = Set(input.content);
        active.updated_at = Set(chrono::Utc::now().into());

        let updated = self.comment_repo.update(active).await?;
        self.view(updated, 0).await
    }

    /// Delete a comment with every reply beneath it.
    ///
    /// Descendants go before their ancestors and the target goes last. Votes
    /// on the removed comments are purged afterwards. Returns how many
    /// comments were removed.
    pub async fn delete_comment(&self, id: &str) -> AppResult<usize> {
        let target = self.comment_repo.get_by_id(id).await?;

        let mut visited = HashSet::from([target.id.clone()]);
        let mut stack = vec![target.id];
        let mut order = Vec::new();

        while let Some(current) = stack.pop() {
            for child in self.comment_repo.find_by_parent(&current).await? {
                if visited.insert(child.id.clone()) {
                    stack.push(child.id);
                }
            }
            order.push(current);
        }

        for comment_id in order.iter().rev() {
            self.comment_repo.delete(comment_id).await?;
        }

        self.voting_service
            .purge(&order, TargetType::Comment)
            .await?;

        tracing::info!(comment_id = id, removed = order.len(), "Comment deleted");
        Ok(order.len())
    }

    /// Vote on a comment and return it with the new tally.
    pub async fn vote(
        &self,
        comment_id: &str,
        user_id: &str,
        vote: VoteValue,
    ) -> AppResult<CommentView> {
        let mut comment = self.comment_repo.get_by_id(comment_id).await?;

        comment.votes = self
            .voting_service
            .vote_on(comment_id, user_id, vote, TargetType::Comment)
            .await?;

        self.view(comment, vote.as_i16()).await
    }

    async fn insert(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        author_id: &str,
        content: String,
    ) -> AppResult<comment::Model> {
        let now = chrono::Utc::now();
        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            content: Set(content),
            author_id: Set(author_id.to_string()),
            post_id: Set(post_id.to_string()),
            parent_id: Set(parent_id.map(ToString::to_string)),
            votes: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        self.comment_repo.create(model).await
    }

    async fn view(&self, comment: comment::Model, user_vote: i16) -> AppResult<CommentView> {
        let author = self.user_service.author_summary(&comment.author_id).await?;
        Ok(CommentView::from_model(comment, author, user_vote))
    }

    async fn comments_with_votes(
        &self,
        post_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<Vec<CommentView>> {
        let mut comments = self.get_comments_by_post(post_id).await?;

        if let Some(viewer) = viewer_id.filter(|_| !comments.is_empty()) {
            let ids: Vec<String> = comments.iter().map(|c| c.id.clone()).collect();
            let votes = self
                .voting_service
                .get_user_votes(&ids, viewer, TargetType::Comment)
                .await?;
            for comment in &mut comments {
                comment.user_vote = votes.get(&comment.id).copied().unwrap_or(0);
            }
        }

        Ok(comments)
    }
}
