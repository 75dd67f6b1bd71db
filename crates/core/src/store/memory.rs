//! In-memory stores with the same revision semantics as the database.

use std::collections::HashMap;

use async_trait::async_trait;
use compliance_common::{AppError, AppResult};
use compliance_db::entities::account;
use tokio::sync::RwLock;

use super::{AccountStore, ViolationQuery, ViolationStore};
use crate::lifecycle::ViolationPatch;
use crate::model::Violation;

/// Violation store kept in a map.
#[derive(Debug, Default)]
pub struct MemoryViolationStore {
    records: RwLock<HashMap<String, Violation>>,
}

impl MemoryViolationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ViolationStore for MemoryViolationStore {
    async fn insert(&self, violation: Violation) -> AppResult<Violation> {
        let mut records = self.records.write().await;
        if records.contains_key(&violation.id) {
            return Err(AppError::Conflict(format!(
                "Violation {} already exists",
                violation.id
            )));
        }
        records.insert(violation.id.clone(), violation.clone());
        Ok(violation)
    }

    async fn get(&self, id: &str) -> AppResult<Violation> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Violation {id} not found")))
    }

    async fn find(&self, query: &ViolationQuery) -> AppResult<Vec<Violation>> {
        let mut found: Vec<Violation> = self
            .records
            .read()
            .await
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn update(&self, patch: &ViolationPatch) -> AppResult<Violation> {
        let mut records = self.records.write().await;
        let current = records
            .get_mut(&patch.id)
            .ok_or_else(|| AppError::NotFound(format!("Violation {} not found", patch.id)))?;

        if current.revision != patch.expected_revision {
            return Err(AppError::Conflict(format!(
                "Violation {} was modified concurrently (expected revision {}, found {})",
                patch.id, patch.expected_revision, current.revision
            )));
        }

        *current = patch.apply_to(current);
        Ok(current.clone())
    }
}

/// Account store kept in a map.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, account::Model>>,
}

impl MemoryAccountStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, account: account::Model) -> AppResult<account::Model> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.email == account.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<account::Model>> {
        let email = email.to_lowercase();
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<account::Model>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.token == token)
            .cloned())
    }

    async fn update_token(&self, id: &str, token: &str) -> AppResult<account::Model> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Account {id} not found")))?;
        account.token = token.to_string();
        Ok(account.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::lifecycle::{TransitionEvent, TransitionPayload, request_transition};
    use crate::model::ViolationStatus;
    use crate::model::fixtures::{at, student, violation};

    #[tokio::test]
    async fn test_update_checks_revision() {
        let store = MemoryViolationStore::new();
        let record = store
            .insert(violation("v1", ViolationStatus::Pending))
            .await
            .unwrap();

        let transition = request_transition(
            &record,
            TransitionEvent::Acknowledge,
            &student("STU001"),
            &TransitionPayload::default(),
            at(2, 9),
        )
        .unwrap();

        let updated = store.update(&transition.patch).await.unwrap();
        assert_eq!(updated, transition.updated);
        assert_eq!(updated.revision, 1);

        // Replaying the same patch loses to the revision it already advanced
        let replay = store.update(&transition.patch).await;
        assert!(matches!(replay, Err(AppError::Conflict(_))));
        assert_eq!(store.get("v1").await.unwrap().revision, 1);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryViolationStore::new();
        let record = violation("ghost", ViolationStatus::Pending);
        let transition = request_transition(
            &record,
            TransitionEvent::Acknowledge,
            &student("STU001"),
            &TransitionPayload::default(),
            at(2, 9),
        )
        .unwrap();

        let result = store.update(&transition.patch).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_scopes_and_orders() {
        let store = MemoryViolationStore::new();
        let mut older = violation("older", ViolationStatus::Pending);
        older.created_at = at(1, 8);
        let mut newer = violation("newer", ViolationStatus::Pending);
        newer.created_at = at(2, 8);
        let mut other = violation("other", ViolationStatus::Pending);
        other.student_id = "STU002".to_string();
        other.reported_by = "staff2".to_string();
        for v in [older, newer, other] {
            store.insert(v).await.unwrap();
        }

        let mine = store
            .find(&ViolationQuery::Student("STU001".to_string()))
            .await
            .unwrap();
        let ids: Vec<_> = mine.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "older"]);

        let reported = store
            .find(&ViolationQuery::ReportedBy("staff2".to_string()))
            .await
            .unwrap();
        assert_eq!(reported.len(), 1);
        assert_eq!(store.find(&ViolationQuery::All).await.unwrap().len(), 3);
        assert!(
            store
                .find(&ViolationQuery::Student(String::new()))
                .await
                .unwrap()
                .is_empty()
        );
    }
}
