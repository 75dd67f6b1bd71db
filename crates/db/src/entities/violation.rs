//! Violation entity.

use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a violation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
pub enum ViolationStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "acknowledged")]
    Acknowledged,
    #[sea_orm(string_value = "correcting")]
    Correcting,
    #[sea_orm(string_value = "corrected")]
    Corrected,
    #[sea_orm(string_value = "verified")]
    Verified,
}

impl ViolationStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Acknowledged,
        Self::Correcting,
        Self::Corrected,
        Self::Verified,
    ];

    /// Stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Acknowledged => "acknowledged",
            Self::Correcting => "correcting",
            Self::Corrected => "corrected",
            Self::Verified => "verified",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl fmt::Display for ViolationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViolationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status: {s}"))
    }
}

/// Kind of compliance issue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(64))")]
pub enum Category {
    #[sea_orm(string_value = "Improper Uniform")]
    #[serde(rename = "Improper Uniform")]
    ImproperUniform,
    #[sea_orm(string_value = "Missing ID/Badge")]
    #[serde(rename = "Missing ID/Badge")]
    MissingIdBadge,
    #[sea_orm(string_value = "Hair Code Violation")]
    #[serde(rename = "Hair Code Violation")]
    HairCode,
    #[sea_orm(string_value = "Untidy Appearance")]
    #[serde(rename = "Untidy Appearance")]
    UntidyAppearance,
    #[sea_orm(string_value = "Attendance Issues")]
    #[serde(rename = "Attendance Issues")]
    Attendance,
    #[sea_orm(string_value = "Room Conduct")]
    #[serde(rename = "Room Conduct")]
    RoomConduct,
    #[sea_orm(string_value = "Library Conduct")]
    #[serde(rename = "Library Conduct")]
    LibraryConduct,
    #[sea_orm(string_value = "Late Night Out")]
    #[serde(rename = "Late Night Out")]
    Curfew,
    #[sea_orm(string_value = "Unauthorized Guest")]
    #[serde(rename = "Unauthorized Guest")]
    UnauthorizedGuest,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Self; 9] = [
        Self::ImproperUniform,
        Self::MissingIdBadge,
        Self::HairCode,
        Self::UntidyAppearance,
        Self::Attendance,
        Self::RoomConduct,
        Self::LibraryConduct,
        Self::Curfew,
        Self::UnauthorizedGuest,
    ];

    /// Human-readable label, also the stored value.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ImproperUniform => "Improper Uniform",
            Self::MissingIdBadge => "Missing ID/Badge",
            Self::HairCode => "Hair Code Violation",
            Self::UntidyAppearance => "Untidy Appearance",
            Self::Attendance => "Attendance Issues",
            Self::RoomConduct => "Room Conduct",
            Self::LibraryConduct => "Library Conduct",
            Self::Curfew => "Late Night Out",
            Self::UnauthorizedGuest => "Unauthorized Guest",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Urgency assigned by the reporting staff member.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    #[default]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
}

impl Priority {
    /// All priorities, lowest first.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown priority: {s}"))
    }
}

/// Violation model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "violation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Institution-issued student identifier of the offender.
    pub student_id: String,
    pub student_name: String,
    pub department: String,
    pub category: Category,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub priority: Priority,
    pub status: ViolationStatus,
    /// Correction deadline, display only.
    pub due_date: Date,
    /// Staff-supplied proof of the violation.
    #[sea_orm(nullable)]
    pub evidence_url: Option<String>,
    /// Student-supplied proof of correction.
    #[sea_orm(nullable)]
    pub correction_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_reason: Option<String>,
    /// Staff account that reported the violation.
    pub reported_by: String,
    /// Admin account that verified the correction.
    #[sea_orm(nullable)]
    pub verified_by: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(nullable)]
    pub acknowledged_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(nullable)]
    pub corrected_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(nullable)]
    pub verified_at: Option<DateTimeWithTimeZone>,
    /// Optimistic concurrency token, bumped on every write.
    pub revision: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
