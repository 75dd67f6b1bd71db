//! Persistence seams used by the services.
//!
//! [`ViolationStore`] and [`AccountStore`] are implemented by the sea-orm
//! repositories for production and by in-memory maps for tests and local
//! development.

mod database;
mod memory;

use async_trait::async_trait;
use compliance_common::AppResult;
use compliance_db::entities::account;

use crate::lifecycle::ViolationPatch;
use crate::model::{Actor, Role, Violation};

pub use memory::{MemoryAccountStore, MemoryViolationStore};

/// Which violations a listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationQuery {
    /// Every record.
    All,
    /// Records reported by a staff account.
    ReportedBy(String),
    /// Records filed against a student ID.
    Student(String),
}

impl ViolationQuery {
    /// The records `actor` is allowed to see.
    #[must_use]
    pub fn for_actor(actor: &Actor) -> Self {
        match actor.role {
            Role::Admin => Self::All,
            Role::Staff => Self::ReportedBy(actor.id.clone()),
            Role::Student => Self::Student(actor.student_id.clone().unwrap_or_default()),
        }
    }

    /// Whether `record` falls inside this query.
    #[must_use]
    pub fn matches(&self, record: &Violation) -> bool {
        match self {
            Self::All => true,
            Self::ReportedBy(id) => record.reported_by == *id,
            Self::Student(student_id) => {
                !student_id.is_empty() && record.student_id == *student_id
            }
        }
    }
}

/// Violation persistence.
#[async_trait]
pub trait ViolationStore: Send + Sync {
    /// Store a new record.
    async fn insert(&self, violation: Violation) -> AppResult<Violation>;

    /// Fetch one record, or `NotFound`.
    async fn get(&self, id: &str) -> AppResult<Violation>;

    /// Records matching `query`, newest first.
    async fn find(&self, query: &ViolationQuery) -> AppResult<Vec<Violation>>;

    /// Persist `patch` if the stored revision still equals
    /// `patch.expected_revision`, returning the updated record.
    ///
    /// Fails with `Conflict` when the revision moved and `NotFound` when the
    /// record is gone.
    async fn update(&self, patch: &ViolationPatch) -> AppResult<Violation>;
}

/// Account persistence.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Store a new account. Duplicate emails fail with `Conflict`.
    async fn insert(&self, account: account::Model) -> AppResult<account::Model>;

    /// Look up an account by lowercased email.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<account::Model>>;

    /// Look up an account by session token.
    async fn find_by_token(&self, token: &str) -> AppResult<Option<account::Model>>;

    /// Replace an account's session token.
    async fn update_token(&self, id: &str, token: &str) -> AppResult<account::Model>;
}
