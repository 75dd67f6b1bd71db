//! Violation repository.

use std::sync::Arc;

use crate::entities::{Violation, violation};
use compliance_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::Expr,
};

/// Violation repository for database operations.
#[derive(Clone)]
pub struct ViolationRepository {
    db: Arc<DatabaseConnection>,
}

impl ViolationRepository {
    /// Create a new violation repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a new violation.
    pub async fn create(&self, model: violation::ActiveModel) -> AppResult<violation::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a violation by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<violation::Model>> {
        Violation::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a violation by ID, failing if it does not exist.
    pub async fn get_by_id(&self, id: &str) -> AppResult<violation::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Violation {id} not found")))
    }

    /// Get every violation, newest first.
    pub async fn find_all(&self) -> AppResult<Vec<violation::Model>> {
        Violation::find()
            .order_by_desc(violation::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get violations reported by a staff account, newest first.
    pub async fn find_by_reporter(&self, reporter_id: &str) -> AppResult<Vec<violation::Model>> {
        Violation::find()
            .filter(violation::Column::ReportedBy.eq(reporter_id))
            .order_by_desc(violation::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get violations filed against a student, newest first.
    pub async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<violation::Model>> {
        Violation::find()
            .filter(violation::Column::StudentId.eq(student_id))
            .order_by_desc(violation::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply `changes` only if the stored revision still equals `expected_revision`.
    ///
    /// The revision is bumped in the same statement. When no row matches, the
    /// record is re-read to tell a lost race (`Conflict`) from a vanished
    /// record (`NotFound`).
    pub async fn update_if_revision(
        &self,
        id: &str,
        expected_revision: i64,
        changes: violation::ActiveModel,
    ) -> AppResult<violation::Model> {
        let result = Violation::update_many()
            .set(changes)
            .col_expr(
                violation::Column::Revision,
                Expr::col(violation::Column::Revision).add(1),
            )
            .filter(violation::Column::Id.eq(id))
            .filter(violation::Column::Revision.eq(expected_revision))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return match self.find_by_id(id).await? {
                None => Err(AppError::NotFound(format!("Violation {id} not found"))),
                Some(current) => {
                    tracing::debug!(
                        violation_id = %id,
                        expected_revision,
                        current_revision = current.revision,
                        "Revision check failed"
                    );
                    Err(AppError::Conflict(format!(
                        "Violation {id} was modified concurrently (expected revision {expected_revision}, found {})",
                        current.revision
                    )))
                }
            };
        }

        self.get_by_id(id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::violation::{Category, Priority, ViolationStatus};
    use chrono::{NaiveDate, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Set};

    fn create_test_violation(id: &str, revision: i64) -> violation::Model {
        violation::Model {
            id: id.to_string(),
            student_id: "STU001".to_string(),
            student_name: "Asha Rao".to_string(),
            department: "Computer Science".to_string(),
            category: Category::MissingIdBadge,
            description: "No badge at the library gate".to_string(),
            priority: Priority::Medium,
            status: ViolationStatus::Pending,
            due_date: NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
            evidence_url: None,
            correction_url: None,
            rejection_reason: None,
            reported_by: "staff1".to_string(),
            verified_by: None,
            created_at: Utc::now().into(),
            acknowledged_at: None,
            corrected_at: None,
            verified_at: None,
            revision,
        }
    }

    fn acknowledge_changes() -> violation::ActiveModel {
        violation::ActiveModel {
            status: Set(ViolationStatus::Acknowledged),
            acknowledged_at: Set(Some(Utc::now().into())),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_find_by_student() {
        let v1 = create_test_violation("v1", 0);
        let v2 = create_test_violation("v2", 0);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[v1, v2]])
                .into_connection(),
        );

        let repo = ViolationRepository::new(db);
        let result = repo.find_by_student("STU001").await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "v1");
    }

    #[tokio::test]
    async fn test_get_by_id_missing_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<violation::Model>::new()])
                .into_connection(),
        );

        let repo = ViolationRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_if_revision_applies() {
        let mut updated = create_test_violation("v1", 1);
        updated.status = ViolationStatus::Acknowledged;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[updated]])
                .into_connection(),
        );

        let repo = ViolationRepository::new(db);
        let result = repo
            .update_if_revision("v1", 0, acknowledge_changes())
            .await
            .unwrap();

        assert_eq!(result.revision, 1);
        assert_eq!(result.status, ViolationStatus::Acknowledged);
    }

    #[tokio::test]
    async fn test_update_if_revision_stale_is_conflict() {
        let current = create_test_violation("v1", 3);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .append_query_results([[current]])
                .into_connection(),
        );

        let repo = ViolationRepository::new(db);
        let result = repo.update_if_revision("v1", 2, acknowledge_changes()).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_if_revision_vanished_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .append_query_results([Vec::<violation::Model>::new()])
                .into_connection(),
        );

        let repo = ViolationRepository::new(db);
        let result = repo.update_if_revision("v1", 0, acknowledge_changes()).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
