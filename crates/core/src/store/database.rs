//! Store implementations backed by the sea-orm repositories.

use async_trait::async_trait;
use compliance_common::AppResult;
use compliance_db::entities::{account, violation};
use compliance_db::repositories::{AccountRepository, ViolationRepository};
use sea_orm::Set;

use super::{AccountStore, ViolationQuery, ViolationStore};
use crate::lifecycle::{FieldUpdate, ViolationPatch};
use crate::model::Violation;

fn new_violation_model(v: Violation) -> violation::ActiveModel {
    violation::ActiveModel {
        id: Set(v.id),
        student_id: Set(v.student_id),
        student_name: Set(v.student_name),
        department: Set(v.department),
        category: Set(v.category),
        description: Set(v.description),
        priority: Set(v.priority),
        status: Set(v.status),
        due_date: Set(v.due_date),
        evidence_url: Set(v.evidence_url),
        correction_url: Set(v.correction_url),
        rejection_reason: Set(v.rejection_reason),
        reported_by: Set(v.reported_by),
        verified_by: Set(v.verified_by),
        created_at: Set(v.created_at.into()),
        acknowledged_at: Set(v.acknowledged_at.map(Into::into)),
        corrected_at: Set(v.corrected_at.map(Into::into)),
        verified_at: Set(v.verified_at.map(Into::into)),
        revision: Set(v.revision),
    }
}

/// Only the columns the patch touches are set; the revision is bumped by
/// the repository.
fn patch_changes(patch: &ViolationPatch) -> violation::ActiveModel {
    let mut changes = violation::ActiveModel {
        status: Set(patch.status),
        ..Default::default()
    };

    if let Some(at) = patch.acknowledged_at {
        changes.acknowledged_at = Set(Some(at.into()));
    }
    if let Some(at) = patch.corrected_at {
        changes.corrected_at = Set(Some(at.into()));
    }
    if let Some(at) = patch.verified_at {
        changes.verified_at = Set(Some(at.into()));
    }
    if let Some(by) = &patch.verified_by {
        changes.verified_by = Set(Some(by.clone()));
    }
    match &patch.correction_url {
        FieldUpdate::Keep => {}
        FieldUpdate::Set(url) => changes.correction_url = Set(Some(url.clone())),
        FieldUpdate::Clear => changes.correction_url = Set(None),
    }
    match &patch.rejection_reason {
        FieldUpdate::Keep => {}
        FieldUpdate::Set(reason) => changes.rejection_reason = Set(Some(reason.clone())),
        FieldUpdate::Clear => changes.rejection_reason = Set(None),
    }

    changes
}

#[async_trait]
impl ViolationStore for ViolationRepository {
    async fn insert(&self, violation: Violation) -> AppResult<Violation> {
        self.create(new_violation_model(violation))
            .await
            .map(Violation::from)
    }

    async fn get(&self, id: &str) -> AppResult<Violation> {
        self.get_by_id(id).await.map(Violation::from)
    }

    async fn find(&self, query: &ViolationQuery) -> AppResult<Vec<Violation>> {
        let models = match query {
            ViolationQuery::All => self.find_all().await?,
            ViolationQuery::ReportedBy(id) => self.find_by_reporter(id).await?,
            ViolationQuery::Student(student_id) => self.find_by_student(student_id).await?,
        };
        Ok(models.into_iter().map(Violation::from).collect())
    }

    async fn update(&self, patch: &ViolationPatch) -> AppResult<Violation> {
        self.update_if_revision(&patch.id, patch.expected_revision, patch_changes(patch))
            .await
            .map(Violation::from)
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn insert(&self, account: account::Model) -> AppResult<account::Model> {
        self.create(account::ActiveModel {
            id: Set(account.id),
            email: Set(account.email),
            password_hash: Set(account.password_hash),
            full_name: Set(account.full_name),
            role: Set(account.role),
            student_id: Set(account.student_id),
            department: Set(account.department),
            token: Set(account.token),
            created_at: Set(account.created_at),
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<account::Model>> {
        Self::find_by_email(self, email).await
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<account::Model>> {
        Self::find_by_token(self, token).await
    }

    async fn update_token(&self, id: &str, token: &str) -> AppResult<account::Model> {
        Self::update_token(self, id, token).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::lifecycle::{TransitionPayload, request_transition};
    use crate::model::ViolationStatus;
    use crate::model::fixtures::{admin, at, violation};
    use sea_orm::ActiveValue;

    #[test]
    fn test_reject_patch_sets_only_touched_columns() {
        let mut record = violation("v1", ViolationStatus::Corrected);
        record.correction_url = Some("/files/fix.jpg".to_string());
        let transition = request_transition(
            &record,
            crate::lifecycle::TransitionEvent::Reject,
            &admin("admin1"),
            &TransitionPayload::rejection("photo unclear"),
            at(3, 9),
        )
        .unwrap();

        let changes = patch_changes(&transition.patch);

        assert_eq!(changes.status, ActiveValue::Set(ViolationStatus::Correcting));
        assert_eq!(changes.correction_url, ActiveValue::Set(None));
        assert_eq!(
            changes.rejection_reason,
            ActiveValue::Set(Some("photo unclear".to_string()))
        );
        assert!(changes.acknowledged_at.is_not_set());
        assert!(changes.verified_by.is_not_set());
        assert!(changes.revision.is_not_set());
    }
}
