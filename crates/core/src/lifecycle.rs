//! Violation lifecycle state machine.
//!
//! Every status change goes through [`request_transition`], which checks the
//! requested event against a single declarative table ([`TRANSITIONS`]) and
//! the acting identity, then returns the resulting record together with a
//! [`ViolationPatch`] describing exactly which fields change.
//!
//! The function performs no I/O and never reads the wall clock; `now` is an
//! argument. Persisting the patch is the caller's job, and the patch carries
//! the revision it was computed against so the write can be rejected if the
//! record moved in the meantime.
//!
//! ```text
//! pending --acknowledge--> acknowledged --submit--> corrected --verify--> verified
//!                                                     |    ^
//!                                               reject|    |submit
//!                                                     v    |
//!                                                   correcting
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use compliance_common::AppError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Actor, Role, Violation, ViolationStatus};

/// Something an actor asks to happen to a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransitionEvent {
    /// Student confirms they have seen the violation.
    Acknowledge,
    /// Student uploads proof that the issue was fixed.
    SubmitCorrection,
    /// Admin accepts the submitted proof.
    Verify,
    /// Admin sends the proof back with a reason.
    Reject,
}

impl TransitionEvent {
    /// Every event.
    pub const ALL: [Self; 4] = [
        Self::Acknowledge,
        Self::SubmitCorrection,
        Self::Verify,
        Self::Reject,
    ];

    /// Wire name of the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Acknowledge => "acknowledge",
            Self::SubmitCorrection => "submitCorrection",
            Self::Verify => "verify",
            Self::Reject => "reject",
        }
    }

    /// Who may request this event, regardless of the record's state.
    #[must_use]
    pub const fn actor_constraint(self) -> ActorConstraint {
        match self {
            Self::Acknowledge | Self::SubmitCorrection => ActorConstraint::RecordOwner,
            Self::Verify | Self::Reject => ActorConstraint::Admin,
        }
    }
}

impl fmt::Display for TransitionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity requirement attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorConstraint {
    /// A student whose `student_id` matches the record.
    RecordOwner,
    /// Any admin.
    Admin,
}

impl ActorConstraint {
    /// Whether `actor` satisfies this constraint for `record`.
    #[must_use]
    pub fn admits(self, actor: &Actor, record: &Violation) -> bool {
        match self {
            Self::RecordOwner => actor.owns(record),
            Self::Admin => actor.role == Role::Admin,
        }
    }
}

/// One edge of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: ViolationStatus,
    pub event: TransitionEvent,
    pub to: ViolationStatus,
}

/// The complete set of permitted transitions. Anything absent is invalid.
pub const TRANSITIONS: [TransitionRule; 5] = [
    TransitionRule {
        from: ViolationStatus::Pending,
        event: TransitionEvent::Acknowledge,
        to: ViolationStatus::Acknowledged,
    },
    TransitionRule {
        from: ViolationStatus::Acknowledged,
        event: TransitionEvent::SubmitCorrection,
        to: ViolationStatus::Corrected,
    },
    TransitionRule {
        from: ViolationStatus::Correcting,
        event: TransitionEvent::SubmitCorrection,
        to: ViolationStatus::Corrected,
    },
    TransitionRule {
        from: ViolationStatus::Corrected,
        event: TransitionEvent::Verify,
        to: ViolationStatus::Verified,
    },
    TransitionRule {
        from: ViolationStatus::Corrected,
        event: TransitionEvent::Reject,
        to: ViolationStatus::Correcting,
    },
];

/// Look up the edge for `event` leaving `from`.
#[must_use]
pub fn rule_for(from: ViolationStatus, event: TransitionEvent) -> Option<&'static TransitionRule> {
    TRANSITIONS
        .iter()
        .find(|rule| rule.from == from && rule.event == event)
}

/// Events that have an edge leaving `status`.
pub fn allowed_events(status: ViolationStatus) -> impl Iterator<Item = TransitionEvent> {
    TRANSITIONS
        .iter()
        .filter(move |rule| rule.from == status)
        .map(|rule| rule.event)
}

/// Data some events need in addition to the actor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionPayload {
    /// Retrieval URL of the uploaded correction proof.
    pub correction_url: Option<String>,
    /// Why the admin sent the correction back.
    pub rejection_reason: Option<String>,
}

impl TransitionPayload {
    /// Payload carrying a correction file reference.
    #[must_use]
    pub fn correction(url: impl Into<String>) -> Self {
        Self {
            correction_url: Some(url.into()),
            rejection_reason: None,
        }
    }

    /// Payload carrying a rejection reason.
    #[must_use]
    pub fn rejection(reason: impl Into<String>) -> Self {
        Self {
            correction_url: None,
            rejection_reason: Some(reason.into()),
        }
    }
}

/// How a nullable field changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    Keep,
    Set(T),
    Clear,
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        Self::Keep
    }
}

impl<T: Clone> FieldUpdate<T> {
    /// Apply this update to `field`.
    pub fn apply(&self, field: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Set(value) => *field = Some(value.clone()),
            Self::Clear => *field = None,
        }
    }
}

/// Field changes produced by one transition.
///
/// Timestamp fields are only ever set, never cleared, so they are plain
/// options where `None` means "leave as is".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationPatch {
    pub id: String,
    /// Revision of the snapshot the patch was computed from.
    pub expected_revision: i64,
    pub event: TransitionEvent,
    pub status: ViolationStatus,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub corrected_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub correction_url: FieldUpdate<String>,
    pub rejection_reason: FieldUpdate<String>,
}

impl ViolationPatch {
    fn new(record: &Violation, event: TransitionEvent, status: ViolationStatus) -> Self {
        Self {
            id: record.id.clone(),
            expected_revision: record.revision,
            event,
            status,
            acknowledged_at: None,
            corrected_at: None,
            verified_at: None,
            verified_by: None,
            correction_url: FieldUpdate::Keep,
            rejection_reason: FieldUpdate::Keep,
        }
    }

    /// The record as it looks once this patch is persisted.
    #[must_use]
    pub fn apply_to(&self, record: &Violation) -> Violation {
        let mut updated = record.clone();
        updated.status = self.status;
        if self.acknowledged_at.is_some() {
            updated.acknowledged_at = self.acknowledged_at;
        }
        if self.corrected_at.is_some() {
            updated.corrected_at = self.corrected_at;
        }
        if self.verified_at.is_some() {
            updated.verified_at = self.verified_at;
        }
        if self.verified_by.is_some() {
            updated.verified_by.clone_from(&self.verified_by);
        }
        self.correction_url.apply(&mut updated.correction_url);
        self.rejection_reason.apply(&mut updated.rejection_reason);
        updated.revision = self.expected_revision + 1;
        updated
    }
}

/// Result of an accepted transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub updated: Violation,
    pub patch: ViolationPatch,
}

/// Why a transition was refused. All variants are permanent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {event} a violation that is {status}")]
    InvalidTransition {
        status: ViolationStatus,
        event: TransitionEvent,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{event} requires a non-empty {field}")]
    MissingPayload {
        event: TransitionEvent,
        field: &'static str,
    },

    #[error("violation {id} is verified and can no longer change")]
    TerminalState { id: String },
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        let message = err.to_string();
        match err {
            TransitionError::InvalidTransition { .. } => Self::InvalidTransition(message),
            TransitionError::Unauthorized(_) => Self::Forbidden(message),
            TransitionError::MissingPayload { .. } => Self::MissingPayload(message),
            TransitionError::TerminalState { .. } => Self::TerminalState(message),
        }
    }
}

/// Validate `event` against `record` and compute its effects.
///
/// Checks run in a fixed order: terminal state, then the actor constraint
/// (independent of state), then the transition table, then the payload.
/// Timestamps are clamped so they never precede `record.created_at`.
/// Each timestamp is written once: a resubmission after a rejection keeps
/// the first `corrected_at`, so the record shows when correction began.
pub fn request_transition(
    record: &Violation,
    event: TransitionEvent,
    actor: &Actor,
    payload: &TransitionPayload,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    if record.status.is_terminal() {
        return Err(TransitionError::TerminalState {
            id: record.id.clone(),
        });
    }

    if !event.actor_constraint().admits(actor, record) {
        return Err(TransitionError::Unauthorized(unauthorized_message(event)));
    }

    let rule = rule_for(record.status, event).ok_or(TransitionError::InvalidTransition {
        status: record.status,
        event,
    })?;

    let now = now.max(record.created_at);
    let mut patch = ViolationPatch::new(record, event, rule.to);

    match event {
        TransitionEvent::Acknowledge => {
            patch.acknowledged_at = record.acknowledged_at.is_none().then_some(now);
        }
        TransitionEvent::SubmitCorrection => {
            let url = non_empty(payload.correction_url.as_deref()).ok_or(
                TransitionError::MissingPayload {
                    event,
                    field: "correction file",
                },
            )?;
            patch.correction_url = FieldUpdate::Set(url.to_string());
            // First submission only; resubmissions keep the original time
            patch.corrected_at = record.corrected_at.is_none().then_some(now);
            if rule.from == ViolationStatus::Correcting {
                patch.rejection_reason = FieldUpdate::Clear;
            }
        }
        TransitionEvent::Verify => {
            patch.verified_at = Some(now);
            patch.verified_by = Some(actor.id.clone());
        }
        TransitionEvent::Reject => {
            let reason = non_empty(payload.rejection_reason.as_deref()).ok_or(
                TransitionError::MissingPayload {
                    event,
                    field: "rejection reason",
                },
            )?;
            patch.rejection_reason = FieldUpdate::Set(reason.to_string());
            patch.correction_url = FieldUpdate::Clear;
        }
    }

    Ok(Transition {
        updated: patch.apply_to(record),
        patch,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn unauthorized_message(event: TransitionEvent) -> String {
    match event.actor_constraint() {
        ActorConstraint::RecordOwner => {
            format!("only the student named on the violation may {event} it")
        }
        ActorConstraint::Admin => format!("only admins may {event} a correction"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::fixtures::{admin, at, staff, student, violation};

    fn owner() -> Actor {
        student("STU001")
    }

    fn payload_for(event: TransitionEvent) -> TransitionPayload {
        match event {
            TransitionEvent::SubmitCorrection => {
                TransitionPayload::correction("/files/correction-photos/v1-1.jpg")
            }
            TransitionEvent::Reject => TransitionPayload::rejection("photo unclear"),
            _ => TransitionPayload::default(),
        }
    }

    fn actor_for(event: TransitionEvent) -> Actor {
        match event.actor_constraint() {
            ActorConstraint::RecordOwner => owner(),
            ActorConstraint::Admin => admin("admin1"),
        }
    }

    #[test]
    fn test_every_table_edge_succeeds() {
        for rule in TRANSITIONS {
            let record = violation("v1", rule.from);
            let result = request_transition(
                &record,
                rule.event,
                &actor_for(rule.event),
                &payload_for(rule.event),
                at(2, 10),
            )
            .unwrap();

            assert_eq!(result.updated.status, rule.to, "{rule:?}");
            assert_eq!(result.updated.revision, record.revision + 1);
            assert_eq!(result.patch.expected_revision, record.revision);
        }
    }

    #[test]
    fn test_edges_outside_table_are_invalid() {
        for status in ViolationStatus::ALL {
            if status.is_terminal() {
                continue;
            }
            for event in TransitionEvent::ALL {
                if rule_for(status, event).is_some() {
                    continue;
                }
                let err = request_transition(
                    &violation("v1", status),
                    event,
                    &actor_for(event),
                    &payload_for(event),
                    at(2, 10),
                )
                .unwrap_err();

                assert_eq!(
                    err,
                    TransitionError::InvalidTransition { status, event },
                    "{status} / {event}"
                );
            }
        }
    }

    #[test]
    fn test_acknowledge_sets_timestamp() {
        let record = violation("v1", ViolationStatus::Pending);
        let result = request_transition(
            &record,
            TransitionEvent::Acknowledge,
            &owner(),
            &TransitionPayload::default(),
            at(2, 10),
        )
        .unwrap();

        assert_eq!(result.patch.acknowledged_at, Some(at(2, 10)));
        assert_eq!(result.patch.correction_url, FieldUpdate::Keep);
        assert_eq!(result.patch.rejection_reason, FieldUpdate::Keep);
        assert_eq!(result.updated.acknowledged_at, Some(at(2, 10)));
        assert!(result.updated.corrected_at.is_none());
    }

    #[test]
    fn test_submit_from_correcting_clears_reason() {
        let mut record = violation("v1", ViolationStatus::Correcting);
        record.rejection_reason = Some("photo unclear".to_string());
        record.corrected_at = Some(at(2, 12));

        let result = request_transition(
            &record,
            TransitionEvent::SubmitCorrection,
            &owner(),
            &TransitionPayload::correction("/files/new.jpg"),
            at(3, 8),
        )
        .unwrap();

        assert_eq!(result.updated.status, ViolationStatus::Corrected);
        assert_eq!(result.updated.correction_url.as_deref(), Some("/files/new.jpg"));
        assert!(result.updated.rejection_reason.is_none());
        assert_eq!(result.updated.corrected_at, Some(at(2, 12)));
        assert!(result.patch.corrected_at.is_none());
    }

    #[test]
    fn test_verify_records_admin() {
        let mut record = violation("v1", ViolationStatus::Corrected);
        record.correction_url = Some("/files/fix.jpg".to_string());

        let result = request_transition(
            &record,
            TransitionEvent::Verify,
            &admin("admin7"),
            &TransitionPayload::default(),
            at(5, 9),
        )
        .unwrap();

        assert_eq!(result.updated.verified_by.as_deref(), Some("admin7"));
        assert_eq!(result.updated.verified_at, Some(at(5, 9)));
        assert_eq!(result.updated.correction_url.as_deref(), Some("/files/fix.jpg"));
    }

    #[test]
    fn test_non_admin_cannot_verify_or_reject_in_any_state() {
        for status in ViolationStatus::ALL {
            if status.is_terminal() {
                continue;
            }
            for event in [TransitionEvent::Verify, TransitionEvent::Reject] {
                for actor in [owner(), staff("staff1")] {
                    let err = request_transition(
                        &violation("v1", status),
                        event,
                        &actor,
                        &payload_for(event),
                        at(2, 10),
                    )
                    .unwrap_err();
                    assert!(matches!(err, TransitionError::Unauthorized(_)), "{status} / {event}");
                }
            }
        }
    }

    #[test]
    fn test_other_student_cannot_act_on_record() {
        let intruder = student("STU999");

        let err = request_transition(
            &violation("v1", ViolationStatus::Pending),
            TransitionEvent::Acknowledge,
            &intruder,
            &TransitionPayload::default(),
            at(2, 10),
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::Unauthorized(_)));

        let err = request_transition(
            &violation("v1", ViolationStatus::Acknowledged),
            TransitionEvent::SubmitCorrection,
            &intruder,
            &TransitionPayload::correction("/files/x.jpg"),
            at(2, 10),
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::Unauthorized(_)));

        let err = request_transition(
            &violation("v1", ViolationStatus::Pending),
            TransitionEvent::Acknowledge,
            &admin("admin1"),
            &TransitionPayload::default(),
            at(2, 10),
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::Unauthorized(_)));
    }

    #[test]
    fn test_reject_without_reason_is_missing_payload() {
        let mut record = violation("v1", ViolationStatus::Corrected);
        record.correction_url = Some("/files/fix.jpg".to_string());

        for reason in [None, Some(String::new()), Some("   ".to_string())] {
            let payload = TransitionPayload {
                correction_url: None,
                rejection_reason: reason,
            };
            let err = request_transition(
                &record,
                TransitionEvent::Reject,
                &admin("admin1"),
                &payload,
                at(3, 9),
            )
            .unwrap_err();

            assert_eq!(
                err,
                TransitionError::MissingPayload {
                    event: TransitionEvent::Reject,
                    field: "rejection reason",
                }
            );
        }
        assert_eq!(record.correction_url.as_deref(), Some("/files/fix.jpg"));
        assert!(record.rejection_reason.is_none());
    }

    #[test]
    fn test_correction_without_file_is_missing_payload() {
        let err = request_transition(
            &violation("v1", ViolationStatus::Acknowledged),
            TransitionEvent::SubmitCorrection,
            &owner(),
            &TransitionPayload::default(),
            at(2, 10),
        )
        .unwrap_err();

        assert!(matches!(err, TransitionError::MissingPayload { .. }));
    }

    #[test]
    fn test_verified_is_terminal_for_everyone() {
        let record = violation("v1", ViolationStatus::Verified);

        for event in TransitionEvent::ALL {
            for actor in [owner(), admin("admin1"), staff("staff1"), student("STU999")] {
                let err = request_transition(
                    &record,
                    event,
                    &actor,
                    &payload_for(event),
                    at(9, 9),
                )
                .unwrap_err();
                assert_eq!(err, TransitionError::TerminalState { id: "v1".to_string() });
            }
        }
    }

    #[test]
    fn test_same_inputs_same_outcome() {
        let record = violation("v1", ViolationStatus::Pending);
        let first = request_transition(
            &record,
            TransitionEvent::Acknowledge,
            &owner(),
            &TransitionPayload::default(),
            at(2, 10),
        );
        let second = request_transition(
            &record,
            TransitionEvent::Acknowledge,
            &owner(),
            &TransitionPayload::default(),
            at(2, 10),
        );

        assert_eq!(first, second);
    }

    #[test]
    fn test_clock_before_creation_is_clamped() {
        let record = violation("v1", ViolationStatus::Pending);
        let result = request_transition(
            &record,
            TransitionEvent::Acknowledge,
            &owner(),
            &TransitionPayload::default(),
            at(1, 3),
        )
        .unwrap();

        assert_eq!(result.updated.acknowledged_at, Some(record.created_at));
    }

    #[test]
    fn test_full_lifecycle_scenario() {
        let mut record = violation("v1", ViolationStatus::Pending);
        record.due_date = record.created_at.date_naive() + chrono::Days::new(3);
        let student = owner();
        let admin = admin("admin1");

        let step = |record: &Violation, event, actor: &Actor, payload, now| {
            request_transition(record, event, actor, &payload, now)
                .unwrap()
                .updated
        };

        let record = step(
            &record,
            TransitionEvent::Acknowledge,
            &student,
            TransitionPayload::default(),
            at(1, 12),
        );
        assert_eq!(record.status, ViolationStatus::Acknowledged);
        assert!(record.acknowledged_at.is_some());

        let record = step(
            &record,
            TransitionEvent::SubmitCorrection,
            &student,
            TransitionPayload::correction("/files/first.jpg"),
            at(2, 9),
        );
        assert_eq!(record.status, ViolationStatus::Corrected);
        assert_eq!(record.correction_url.as_deref(), Some("/files/first.jpg"));

        let record = step(
            &record,
            TransitionEvent::Reject,
            &admin,
            TransitionPayload::rejection("photo unclear"),
            at(2, 15),
        );
        assert_eq!(record.status, ViolationStatus::Correcting);
        assert!(record.correction_url.is_none());
        assert_eq!(record.rejection_reason.as_deref(), Some("photo unclear"));

        let record = step(
            &record,
            TransitionEvent::SubmitCorrection,
            &student,
            TransitionPayload::correction("/files/second.jpg"),
            at(3, 9),
        );
        assert_eq!(record.status, ViolationStatus::Corrected);
        assert!(record.rejection_reason.is_none());

        let record = step(
            &record,
            TransitionEvent::Verify,
            &admin,
            TransitionPayload::default(),
            at(3, 16),
        );
        assert_eq!(record.status, ViolationStatus::Verified);
        assert_eq!(record.verified_at, Some(at(3, 16)));
        assert_eq!(record.verified_by.as_deref(), Some("admin1"));
        assert_eq!(record.revision, 5);

        for event in TransitionEvent::ALL {
            let err = request_transition(
                &record,
                event,
                &actor_for(event),
                &payload_for(event),
                at(4, 9),
            )
            .unwrap_err();
            assert!(matches!(err, TransitionError::TerminalState { .. }));
        }
    }

    #[test]
    fn test_allowed_events() {
        let from_corrected: Vec<_> = allowed_events(ViolationStatus::Corrected).collect();
        assert_eq!(
            from_corrected,
            vec![TransitionEvent::Verify, TransitionEvent::Reject]
        );
        assert_eq!(allowed_events(ViolationStatus::Verified).count(), 0);
    }

    #[test]
    fn test_error_mapping() {
        let err: AppError = TransitionError::Unauthorized("no".to_string()).into();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err: AppError = TransitionError::TerminalState { id: "v1".to_string() }.into();
        assert_eq!(err.error_code(), "TERMINAL_STATE");
        assert!(!err.is_retryable());
    }
}
