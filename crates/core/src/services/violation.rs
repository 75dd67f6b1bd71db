//! Violation service: reporting, listing and lifecycle transitions.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use compliance_common::{
    AppError, AppResult, Bucket, IdGenerator, StorageBackend, generate_storage_key,
};
use serde::Deserialize;
use validator::Validate;

use crate::clock::Clock;
use crate::export::{self, Export, ExportFormat};
use crate::filter::ViolationFilter;
use crate::lifecycle::{TransitionEvent, TransitionPayload, request_transition};
use crate::model::{Actor, Category, Priority, Role, Violation, ViolationStatus};
use crate::services::bounded;
use crate::stats::ViolationStats;
use crate::store::{ViolationQuery, ViolationStore};

/// Input for reporting a violation.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReportViolationInput {
    #[validate(length(min = 1, max = 64, message = "Student ID is required"))]
    pub student_id: String,
    #[validate(length(min = 1, max = 256, message = "Student name is required"))]
    pub student_name: String,
    #[validate(length(min = 1, max = 128, message = "Department is required"))]
    pub department: String,
    pub category: Category,
    #[validate(length(min = 1, max = 4096, message = "Description is required"))]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    pub due_date: NaiveDate,
}

impl ReportViolationInput {
    fn trimmed(self) -> Self {
        Self {
            student_id: self.student_id.trim().to_string(),
            student_name: self.student_name.trim().to_string(),
            department: self.department.trim().to_string(),
            description: self.description.trim().to_string(),
            ..self
        }
    }
}

/// A photo received from a client.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Orchestrates the lifecycle manager with its collaborators.
///
/// Every store and blob call is bounded by the configured timeout. Timeouts
/// and collaborator I/O errors surface as `TransientFailure`.
#[derive(Clone)]
pub struct ViolationService {
    store: Arc<dyn ViolationStore>,
    storage: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    id_gen: IdGenerator,
    timeout: Duration,
}

impl ViolationService {
    /// Create a new violation service.
    #[must_use]
    pub fn new(
        store: Arc<dyn ViolationStore>,
        storage: Arc<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            storage,
            clock,
            id_gen: IdGenerator::new(),
            timeout,
        }
    }

    /// File a new violation. Staff only.
    pub async fn report(
        &self,
        actor: &Actor,
        input: ReportViolationInput,
        evidence: Option<PhotoUpload>,
    ) -> AppResult<Violation> {
        if actor.role != Role::Staff {
            return Err(AppError::Forbidden(
                "Only staff can report violations".to_string(),
            ));
        }

        let input = input.trimmed();
        input.validate()?;

        let now = self.clock.now();

        let evidence_url = match evidence.filter(|file| !file.data.is_empty()) {
            Some(file) => {
                let key =
                    generate_storage_key(Bucket::EvidencePhotos, None, &file.file_name, now);
                let uploaded = self
                    .bounded(
                        "evidence upload",
                        self.storage.upload(&key, &file.data, &file.content_type),
                    )
                    .await?;
                Some(uploaded)
            }
            None => None,
        };

        let violation = Violation {
            id: self.id_gen.generate(),
            student_id: input.student_id,
            student_name: input.student_name,
            department: input.department,
            category: input.category,
            description: input.description,
            priority: input.priority,
            status: ViolationStatus::Pending,
            due_date: input.due_date,
            evidence_url,
            correction_url: None,
            rejection_reason: None,
            reported_by: actor.id.clone(),
            verified_by: None,
            created_at: now,
            acknowledged_at: None,
            corrected_at: None,
            verified_at: None,
            revision: 0,
        };

        let created = self
            .bounded("violation insert", self.store.insert(violation))
            .await?;

        tracing::info!(
            violation_id = %created.id,
            actor_id = %actor.id,
            category = %created.category,
            "Reported violation"
        );

        Ok(created)
    }

    /// Violations visible to `actor`, newest first.
    pub async fn list(&self, actor: &Actor) -> AppResult<Vec<Violation>> {
        let query = ViolationQuery::for_actor(actor);
        self.bounded("violation query", self.store.find(&query)).await
    }

    /// Visible violations matching `filter`.
    pub async fn list_filtered(
        &self,
        actor: &Actor,
        filter: &ViolationFilter,
    ) -> AppResult<Vec<Violation>> {
        Ok(filter.apply(&self.list(actor).await?))
    }

    /// One violation, if `actor` may see it.
    pub async fn get(&self, actor: &Actor, id: &str) -> AppResult<Violation> {
        let record = self.load(id).await?;
        if !ViolationQuery::for_actor(actor).matches(&record) {
            return Err(AppError::NotFound(format!("Violation {id} not found")));
        }
        Ok(record)
    }

    /// Student confirms a pending violation.
    pub async fn acknowledge(
        &self,
        actor: &Actor,
        id: &str,
        revision: i64,
    ) -> AppResult<Violation> {
        self.transition(
            actor,
            id,
            revision,
            TransitionEvent::Acknowledge,
            TransitionPayload::default(),
        )
        .await
    }

    /// Student uploads correction proof.
    ///
    /// The transition is validated before anything is uploaded. If the
    /// upload succeeds but the record cannot be written, the blob is left
    /// behind and the call fails as retryable.
    pub async fn submit_correction(
        &self,
        actor: &Actor,
        id: &str,
        revision: i64,
        file: PhotoUpload,
    ) -> AppResult<Violation> {
        let record = self.load_at(id, revision).await?;
        let now = self.clock.now();

        let key = generate_storage_key(
            Bucket::CorrectionPhotos,
            Some(&record.id),
            &file.file_name,
            now,
        );
        let payload = TransitionPayload {
            correction_url: (!file.data.is_empty()).then(|| self.storage.public_url(&key)),
            rejection_reason: None,
        };
        let transition = request_transition(
            &record,
            TransitionEvent::SubmitCorrection,
            actor,
            &payload,
            now,
        )?;

        self.bounded(
            "correction upload",
            self.storage.upload(&key, &file.data, &file.content_type),
        )
        .await?;

        match self
            .bounded("violation update", self.store.update(&transition.patch))
            .await
        {
            Ok(updated) => {
                log_transition(&updated, TransitionEvent::SubmitCorrection, actor);
                Ok(updated)
            }
            Err(err @ (AppError::Conflict(_) | AppError::TransientFailure(_))) => Err(err),
            Err(err) => {
                tracing::warn!(
                    violation_id = %record.id,
                    key = %key,
                    error = %err,
                    "Correction uploaded but not recorded"
                );
                Err(AppError::TransientFailure(format!(
                    "Correction for {} was uploaded but not recorded: {err}",
                    record.id
                )))
            }
        }
    }

    /// Admin accepts a correction.
    pub async fn verify(&self, actor: &Actor, id: &str, revision: i64) -> AppResult<Violation> {
        self.transition(
            actor,
            id,
            revision,
            TransitionEvent::Verify,
            TransitionPayload::default(),
        )
        .await
    }

    /// Admin sends a correction back.
    pub async fn reject(
        &self,
        actor: &Actor,
        id: &str,
        revision: i64,
        reason: &str,
    ) -> AppResult<Violation> {
        self.transition(
            actor,
            id,
            revision,
            TransitionEvent::Reject,
            TransitionPayload::rejection(reason),
        )
        .await
    }

    /// Counters over the violations visible to `actor`.
    pub async fn stats(&self, actor: &Actor) -> AppResult<ViolationStats> {
        let records = self.list(actor).await?;
        Ok(ViolationStats::collect(&records, self.clock.today()))
    }

    /// Filtered visible violations rendered for download.
    pub async fn export(
        &self,
        actor: &Actor,
        filter: &ViolationFilter,
        format: ExportFormat,
    ) -> AppResult<Export> {
        let records = self.list_filtered(actor, filter).await?;
        tracing::debug!(actor_id = %actor.id, count = records.len(), ?format, "Exporting violations");
        export::render(&records, format, self.clock.today())
    }

    async fn transition(
        &self,
        actor: &Actor,
        id: &str,
        revision: i64,
        event: TransitionEvent,
        payload: TransitionPayload,
    ) -> AppResult<Violation> {
        let record = self.load_at(id, revision).await?;
        let transition = request_transition(&record, event, actor, &payload, self.clock.now())?;

        let updated = self
            .bounded("violation update", self.store.update(&transition.patch))
            .await?;

        log_transition(&updated, event, actor);
        Ok(updated)
    }

    async fn load(&self, id: &str) -> AppResult<Violation> {
        self.bounded("violation lookup", self.store.get(id)).await
    }

    /// Load a record and check the caller acted on its current revision.
    async fn load_at(&self, id: &str, revision: i64) -> AppResult<Violation> {
        let record = self.load(id).await?;
        if record.revision != revision {
            return Err(AppError::Conflict(format!(
                "Violation {id} is at revision {}, not {revision}; reload and retry",
                record.revision
            )));
        }
        Ok(record)
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = AppResult<T>> + Send,
    ) -> AppResult<T> {
        bounded(operation, self.timeout, call).await
    }
}

fn log_transition(updated: &Violation, event: TransitionEvent, actor: &Actor) {
    tracing::info!(
        violation_id = %updated.id,
        event = %event,
        actor_id = %actor.id,
        status = %updated.status,
        revision = updated.revision,
        "Applied transition"
    );
}
