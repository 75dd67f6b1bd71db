//! Domain model shared by the lifecycle manager and services.

use chrono::{DateTime, NaiveDate, Utc};
use compliance_db::entities::{account, violation};
use serde::{Deserialize, Serialize};

pub use compliance_db::entities::account::Role;
pub use compliance_db::entities::violation::{Category, Priority, ViolationStatus};

/// Departments offered when reporting a violation or registering a student.
pub const DEPARTMENTS: [&str; 8] = [
    "Computer Science",
    "Electronics and Communication",
    "Mechanical Engineering",
    "Civil Engineering",
    "Electrical Engineering",
    "Information Technology",
    "Chemical Engineering",
    "Biotechnology",
];

/// A compliance record filed against a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub department: String,
    pub category: Category,
    pub description: String,
    pub priority: Priority,
    pub status: ViolationStatus,
    pub due_date: NaiveDate,
    pub evidence_url: Option<String>,
    pub correction_url: Option<String>,
    pub rejection_reason: Option<String>,
    pub reported_by: String,
    pub verified_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub corrected_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token; every persisted write bumps it by one.
    pub revision: i64,
}

impl Violation {
    /// Past its due date and not yet verified.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date < today && self.status != ViolationStatus::Verified
    }
}

impl From<violation::Model> for Violation {
    fn from(m: violation::Model) -> Self {
        Self {
            id: m.id,
            student_id: m.student_id,
            student_name: m.student_name,
            department: m.department,
            category: m.category,
            description: m.description,
            priority: m.priority,
            status: m.status,
            due_date: m.due_date,
            evidence_url: m.evidence_url,
            correction_url: m.correction_url,
            rejection_reason: m.rejection_reason,
            reported_by: m.reported_by,
            verified_by: m.verified_by,
            created_at: m.created_at.with_timezone(&Utc),
            acknowledged_at: m.acknowledged_at.map(|t| t.with_timezone(&Utc)),
            corrected_at: m.corrected_at.map(|t| t.with_timezone(&Utc)),
            verified_at: m.verified_at.map(|t| t.with_timezone(&Utc)),
            revision: m.revision,
        }
    }
}

/// The identity performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    pub role: Role,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl Actor {
    /// Whether this actor is the student a violation was filed against.
    #[must_use]
    pub fn owns(&self, record: &Violation) -> bool {
        self.role == Role::Student && self.student_id.as_deref() == Some(record.student_id.as_str())
    }
}

impl From<&account::Model> for Actor {
    fn from(account: &account::Model) -> Self {
        Self {
            id: account.id.clone(),
            role: account.role,
            display_name: account.full_name.clone(),
            student_id: account.student_id.clone(),
            department: account.department.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    pub fn violation(id: &str, status: ViolationStatus) -> Violation {
        Violation {
            id: id.to_string(),
            student_id: "STU001".to_string(),
            student_name: "Asha Rao".to_string(),
            department: "Computer Science".to_string(),
            category: Category::MissingIdBadge,
            description: "No badge at the library gate".to_string(),
            priority: Priority::Medium,
            status,
            due_date: NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
            evidence_url: None,
            correction_url: None,
            rejection_reason: None,
            reported_by: "staff1".to_string(),
            verified_by: None,
            created_at: at(1, 9),
            acknowledged_at: None,
            corrected_at: None,
            verified_at: None,
            revision: 0,
        }
    }

    pub fn student(student_id: &str) -> Actor {
        Actor {
            id: format!("acct-{student_id}"),
            role: Role::Student,
            display_name: "Asha Rao".to_string(),
            student_id: Some(student_id.to_string()),
            department: Some("Computer Science".to_string()),
        }
    }

    pub fn staff(id: &str) -> Actor {
        Actor {
            id: id.to_string(),
            role: Role::Staff,
            display_name: "Duty Officer".to_string(),
            student_id: None,
            department: None,
        }
    }

    pub fn admin(id: &str) -> Actor {
        Actor {
            id: id.to_string(),
            role: Role::Admin,
            display_name: "Dean".to_string(),
            student_id: None,
            department: None,
        }
    }
}
