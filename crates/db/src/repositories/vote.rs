//! Vote ledger repository.

use std::sync::Arc;

use crate::entities::{
    Vote,
    vote::{self, TargetType},
};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user's vote on a target.
    pub async fn find(
        &self,
        user_id: &str,
        target_id: &str,
        target_type: TargetType,
    ) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::TargetId.eq(target_id))
            .filter(vote::Column::TargetType.eq(target_type))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))
    }

    /// A user's votes on several targets of one kind.
    pub async fn find_by_user_and_targets(
        &self,
        user_id: &str,
        target_ids: &[String],
        target_type: TargetType,
    ) -> AppResult<Vec<vote::Model>> {
        if target_ids.is_empty() {
            return Ok(vec![]);
        }

        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::TargetId.is_in(target_ids.to_vec()))
            .filter(vote::Column::TargetType.eq(target_type))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))
    }

    /// Create a new vote.
    pub async fn create(&self, model: vote::ActiveModel) -> AppResult<vote::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))
    }

    /// Remove a user's vote on a target, if any. Returns the number of rows removed.
    pub async fn delete_by_user_and_target(
        &self,
        user_id: &str,
        target_id: &str,
        target_type: TargetType,
    ) -> AppResult<u64> {
        let result = Vote::delete_many()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::TargetId.eq(target_id))
            .filter(vote::Column::TargetType.eq(target_type))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Count the votes of one direction on a target.
    pub async fn count_by_target_and_type(
        &self,
        target_id: &str,
        target_type: TargetType,
        vote_type: i16,
    ) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::TargetId.eq(target_id))
            .filter(vote::Column::TargetType.eq(target_type))
            .filter(vote::Column::VoteType.eq(vote_type))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))
    }

    /// Purge every vote on the given targets.
    pub async fn delete_by_targets(
        &self,
        target_ids: &[String],
        target_type: TargetType,
    ) -> AppResult<u64> {
        if target_ids.is_empty() {
            return Ok(0);
        }

        let result = Vote::delete_many()
            .filter(vote::Column::TargetId.is_in(target_ids.to_vec()))
            .filter(vote::Column::TargetType.eq(target_type))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::vote_fixture;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    #[tokio::test]
    async fn test_find_existing_vote() {
        let vote = vote_fixture("v1", "user1", "c1", TargetType::Comment, 1);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[vote.clone()]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let result = repo.find("user1", "c1", TargetType::Comment).await.unwrap();

        assert_eq!(result.map(|v| v.vote_type), Some(1));
    }

    #[tokio::test]
    async fn test_find_by_user_and_targets_empty_skips_query() {
        // No results queued: a query would fail.
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = VoteRepository::new(db);
        let result = repo
            .find_by_user_and_targets("user1", &[], TargetType::Comment)
            .await
            .unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_user_and_targets() {
        let v1 = vote_fixture("v1", "user1", "c1", TargetType::Comment, 1);
        let v2 = vote_fixture("v2", "user1", "c3", TargetType::Comment, -1);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[v1, v2]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let ids = vec!["c1".to_string(), "c2".to_string(), "c3".to_string()];
        let result = repo
            .find_by_user_and_targets("user1", &ids, TargetType::Comment)
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_count_by_target_and_type() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => Value::BigInt(Some(4)),
                }]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let count = repo
            .count_by_target_and_type("p1", TargetType::Post, 1)
            .await
            .unwrap();

        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn test_delete_by_user_and_target() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let removed = repo
            .delete_by_user_and_target("user1", "c1", TargetType::Comment)
            .await
            .unwrap();

        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn test_delete_by_targets_empty_is_noop() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = VoteRepository::new(db);
        let removed = repo
            .delete_by_targets(&[], TargetType::Comment)
            .await
            .unwrap();

        assert_eq!(removed, 0);
    }
}
