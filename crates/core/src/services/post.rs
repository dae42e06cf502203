//! Post service.

use std::collections::HashMap;

use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::{post, vote::TargetType},
    repositories::{CommentRepository, PostRepository},
};
use chrono::{DateTime, FixedOffset};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{
    user::{AuthorSummary, UserService},
    voting::{VoteValue, VotingService},
};

/// A post as served to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub votes: i32,
    pub user_vote: i16,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub author: AuthorSummary,
}

impl PostView {
    fn from_model(model: post::Model, author: AuthorSummary, user_vote: i16) -> Self {
        Self {
            id: model.id,
            title: model.title,
            content: model.content,
            author_id: model.author_id,
            votes: model.votes,
            user_vote,
            created_at: model.created_at,
            updated_at: model.updated_at,
            author,
        }
    }
}

/// One page of the post feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<PostView>,
    pub total_posts: u64,
    pub total_pages: u64,
    pub current_page: u64,
}

/// Input for creating a post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostInput {
    #[validate(length(min = 1, max = 256))]
    pub title: String,

    #[validate(length(min = 1, max = 50000))]
    pub content: String,
}

/// Input for editing a post. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostInput {
    #[validate(length(min = 1, max = 256))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 50000))]
    pub content: Option<String>,
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    comment_repo: CommentRepository,
    user_service: UserService,
    voting_service: VotingService,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        comment_repo: CommentRepository,
        user_service: UserService,
        voting_service: VotingService,
    ) -> Self {
        Self {
            post_repo,
            comment_repo,
            user_service,
            voting_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Publish a new post.
    pub async fn create(&self, author_id: &str, input: CreatePostInput) -> AppResult<PostView> {
        input.validate()?;

        let now = chrono::Utc::now();
        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(input.title),
            content: Set(input.content),
            author_id: Set(author_id.to_string()),
            votes: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let post = self.post_repo.create(model).await?;
        tracing::info!(post_id = %post.id, author_id, "Post created");

        self.view(post, 0).await
    }

    /// A single post with the viewer's vote.
    pub async fn get(&self, id: &str, viewer_id: Option<&str>) -> AppResult<PostView> {
        let post = self.post_repo.get_by_id(id).await?;
        let user_vote = match viewer_id {
            Some(viewer) => {
                self.voting_service
                    .get_user_vote(id, viewer, TargetType::Post)
                    .await?
            }
            None => 0,
        };
        self.view(post, user_vote).await
    }

    /// A page of the feed, newest first. `page` starts at 1.
    ///
    /// A page whose offset does not fit the store's row offset is a
    /// validation error.
    pub async fn list(
        &self,
        viewer_id: Option<&str>,
        page: u64,
        limit: u64,
    ) -> AppResult<PostPage> {
        let page = page.max(1);
        let limit = limit.max(1);

        let offset = (page - 1)
            .checked_mul(limit)
            .filter(|offset| i64::try_from(*offset).is_ok())
            .ok_or_else(|| AppError::Validation(format!("Page {page} is out of range")))?;

        let posts = self.post_repo.find_paginated(limit, offset).await?;
        let total_posts = self.post_repo.count().await?;
        let posts = self.enrich(posts, viewer_id).await?;

        Ok(PostPage {
            posts,
            total_posts,
            total_pages: total_posts.div_ceil(limit),
            current_page: page,
        })
    }

    /// All posts by one author, newest first.
    pub async fn list_by_author(
        &self,
        author_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<Vec<PostView>> {
        let posts = self.post_repo.find_by_author(author_id).await?;
        self.enrich(posts, viewer_id).await
    }

    /// Edit a post's title and/or content.
    pub async fn update(&self, id: &str, input: UpdatePostInput) -> AppResult<PostView> {
        input.validate()?;

        let post = self.post_repo.get_by_id(id).await?;
        let mut active: post::ActiveModel = post.into();

        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(content) = input.content {
            active.content = Set(content);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        let updated = self.post_repo.update(active).await?;
        self.view(updated, 0).await
    }

    /// Delete a post together with its comments and every vote on either.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(id).await?;

        let comment_ids: Vec<String> = self
            .comment_repo
            .find_by_post(&post.id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        self.voting_service
            .purge(&comment_ids, TargetType::Comment)
            .await?;
        let removed = self.comment_repo.delete_by_post(&post.id).await?;
        self.voting_service
            .purge(&[post.id.clone()], TargetType::Post)
            .await?;
        self.post_repo.delete(&post.id).await?;

        tracing::info!(post_id = id, comments_removed = removed, "Post deleted");
        Ok(())
    }

    /// Vote on a post and return it with the new tally.
    pub async fn vote(&self, post_id: &str, user_id: &str, vote: VoteValue) -> AppResult<PostView> {
        let mut post = self.post_repo.get_by_id(post_id).await?;

        post.votes = self
            .voting_service
            .vote_on(post_id, user_id, vote, TargetType::Post)
            .await?;

        self.view(post, vote.as_i16()).await
    }

    async fn view(&self, post: post::Model, user_vote: i16) -> AppResult<PostView> {
        let author = self.user_service.author_summary(&post.author_id).await?;
        Ok(PostView::from_model(post, author, user_vote))
    }

    async fn enrich(
        &self,
        posts: Vec<post::Model>,
        viewer_id: Option<&str>,
    ) -> AppResult<Vec<PostView>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let author_ids: Vec<String> = posts.iter().map(|p| p.author_id.clone()).collect();
        let authors = self.user_service.author_summaries(&author_ids).await?;

        let votes = match viewer_id {
            Some(viewer) => {
                let ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
                self.voting_service
                    .get_user_votes(&ids, viewer, TargetType::Post)
                    .await?
            }
            None => HashMap::new(),
        };

        Ok(posts
            .into_iter()
            .map(|p| {
                let author = authors
                    .get(&p.author_id)
                    .cloned()
                    .unwrap_or_else(|| AuthorSummary::deleted(&p.author_id));
                let user_vote = votes.get(&p.id).copied().unwrap_or(0);
                PostView::from_model(p, author, user_vote)
            })
            .collect())
    }
}
