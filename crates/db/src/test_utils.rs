//! Test utilities for database operations.
//!
//! Model fixtures for repository and service tests driven by
//! `sea_orm::MockDatabase`. Timestamps are offsets in seconds from a fixed
//! base so that ordering in tests is deterministic.

use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::entities::{
    comment, post, user,
    vote::{self, TargetType},
};

/// 2025-01-01T00:00:00Z
const BASE_TIMESTAMP: i64 = 1_735_689_600;

/// Timestamp `offset_secs` after the fixture base time.
#[must_use]
pub fn at(offset_secs: i64) -> DateTimeWithTimeZone {
    (DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(BASE_TIMESTAMP + offset_secs)).fixed_offset()
}

/// A user with a deterministic email and password hash.
#[must_use]
pub fn user_fixture(id: &str, username: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: username.to_string(),
        username_lower: username.to_lowercase(),
        email: format!("{}@example.com", username.to_lowercase()),
        password_hash: "hash".to_string(),
        token: Some(format!("token-{id}")),
        created_at: at(0),
    }
}

/// A post created `offset_secs` after the base time.
#[must_use]
pub fn post_fixture(id: &str, author_id: &str, offset_secs: i64) -> post::Model {
    post::Model {
        id: id.to_string(),
        title: format!("Post {id}"),
        content: format!("Content of {id}"),
        author_id: author_id.to_string(),
        votes: 0,
        created_at: at(offset_secs),
        updated_at: at(offset_secs),
    }
}

/// A comment by `user1` created `offset_secs` after the base time.
#[must_use]
pub fn comment_fixture(
    id: &str,
    post_id: &str,
    parent_id: Option<&str>,
    offset_secs: i64,
) -> comment::Model {
    comment::Model {
        id: id.to_string(),
        content: format!("Comment {id}"),
        author_id: "user1".to_string(),
        post_id: post_id.to_string(),
        parent_id: parent_id.map(ToString::to_string),
        votes: 0,
        created_at: at(offset_secs),
        updated_at: at(offset_secs),
    }
}

/// A ledger row.
#[must_use]
pub fn vote_fixture(
    id: &str,
    user_id: &str,
    target_id: &str,
    target_type: TargetType,
    vote_type: i16,
) -> vote::Model {
    vote::Model {
        id: id.to_string(),
        user_id: user_id.to_string(),
        target_id: target_id.to_string(),
        target_type,
        vote_type,
        created_at: at(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_are_ordered() {
        assert!(at(10) > at(0));
        assert_eq!(at(0).timestamp(), BASE_TIMESTAMP);
    }

    #[test]
    fn test_comment_fixture_parent() {
        let root = comment_fixture("c1", "p1", None, 0);
        let reply = comment_fixture("c2", "p1", Some("c1"), 1);

        assert!(root.parent_id.is_none());
        assert_eq!(reply.parent_id.as_deref(), Some("c1"));
    }
}
