//! Violation endpoints.

use std::collections::HashMap;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use compliance_common::{AppError, AppResult};
use compliance_core::{
    ExportFormat, PhotoUpload, ReportViolationInput, Violation, ViolationFilter, ViolationStats,
};
use serde::Deserialize;

use crate::{extractors::AuthActor, middleware::AppState, response::ApiResponse};

/// Largest accepted photo upload request.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Dashboard filter query. `all` or an empty value disables a predicate.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl FilterQuery {
    fn into_filter(self) -> AppResult<ViolationFilter> {
        Ok(ViolationFilter {
            status: parse_choice(self.status.as_deref())?,
            category: parse_choice(self.category.as_deref())?,
            search_text: self.search,
            ..ViolationFilter::default()
        })
    }
}

fn parse_choice<T>(raw: Option<&str>) -> AppResult<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    match raw.map(str::trim) {
        None | Some("" | "all") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(AppError::BadRequest),
    }
}

/// Export query.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(flatten)]
    pub filter: FilterQuery,
}

/// Body of a transition that carries no payload.
#[derive(Debug, Deserialize)]
pub struct RevisionRequest {
    pub revision: i64,
}

/// Body of a rejection.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub revision: i64,
    #[serde(default)]
    pub reason: String,
}

/// Text fields and the named file part of a multipart form.
struct UploadForm {
    fields: HashMap<String, String>,
    file: Option<PhotoUpload>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart, file_field: &str) -> AppResult<Self> {
        let mut fields = HashMap::new();
        let mut file = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == file_field {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?
                    .to_vec();
                file = Some(PhotoUpload {
                    file_name,
                    content_type,
                    data,
                });
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                fields.insert(name, text);
            }
        }

        Ok(Self { fields, file })
    }

    fn field(&self, name: &str) -> AppResult<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AppError::BadRequest(format!("Missing form field: {name}")))
    }

    fn revision(&self) -> AppResult<i64> {
        self.field("revision")?
            .trim()
            .parse()
            .map_err(|_| AppError::BadRequest("revision must be an integer".to_string()))
    }
}

/// Report a violation without evidence.
async fn report(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<ReportViolationInput>,
) -> AppResult<ApiResponse<Violation>> {
    let violation = state.violation_service.report(&actor, req, None).await?;
    Ok(ApiResponse::ok(violation))
}

/// Report a violation with an evidence photo.
///
/// Expects a `data` part holding the report as JSON and an optional
/// `evidence` file part.
async fn report_with_evidence(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<Violation>> {
    let form = UploadForm::read(multipart, "evidence").await?;
    let input: ReportViolationInput = serde_json::from_str(form.field("data")?)
        .map_err(|e| AppError::BadRequest(format!("Invalid report data: {e}")))?;

    let violation = state
        .violation_service
        .report(&actor, input, form.file)
        .await?;
    Ok(ApiResponse::ok(violation))
}

/// List visible violations.
async fn list(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> AppResult<ApiResponse<Vec<Violation>>> {
    let filter = query.into_filter()?;
    let violations = state
        .violation_service
        .list_filtered(&actor, &filter)
        .await?;
    Ok(ApiResponse::ok(violations))
}

/// Get a violation.
async fn show(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Violation>> {
    let violation = state.violation_service.get(&actor, &id).await?;
    Ok(ApiResponse::ok(violation))
}

/// Dashboard counters.
async fn stats(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ViolationStats>> {
    let stats = state.violation_service.stats(&actor).await?;
    Ok(ApiResponse::ok(stats))
}

/// Download the filtered list as CSV or JSON.
async fn export(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> AppResult<Response> {
    let filter = query.filter.into_filter()?;
    let export = state
        .violation_service
        .export(&actor, &filter, query.format)
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, export.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.filename),
            ),
        ],
        export.body,
    )
        .into_response())
}

/// Student acknowledges a violation.
async fn acknowledge(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RevisionRequest>,
) -> AppResult<ApiResponse<Violation>> {
    let violation = state
        .violation_service
        .acknowledge(&actor, &id, req.revision)
        .await?;
    Ok(ApiResponse::ok(violation))
}

/// Student submits correction proof as multipart `file` + `revision`.
async fn submit_correction(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<ApiResponse<Violation>> {
    let form = UploadForm::read(multipart, "file").await?;
    let revision = form.revision()?;
    let file = form
        .file
        .ok_or_else(|| AppError::MissingPayload("correction file is required".to_string()))?;

    let violation = state
        .violation_service
        .submit_correction(&actor, &id, revision, file)
        .await?;
    Ok(ApiResponse::ok(violation))
}

/// Admin verifies a correction.
async fn verify(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RevisionRequest>,
) -> AppResult<ApiResponse<Violation>> {
    let violation = state
        .violation_service
        .verify(&actor, &id, req.revision)
        .await?;
    Ok(ApiResponse::ok(violation))
}

/// Admin rejects a correction.
async fn reject(
    AuthActor(actor): AuthActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RejectRequest>,
) -> AppResult<ApiResponse<Violation>> {
    let violation = state
        .violation_service
        .reject(&actor, &id, req.revision, &req.reason)
        .await?;
    Ok(ApiResponse::ok(violation))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(report))
        .route("/with-evidence", post(report_with_evidence))
        .route("/stats", get(stats))
        .route("/export", get(export))
        .route("/{id}", get(show))
        .route("/{id}/acknowledge", post(acknowledge))
        .route("/{id}/correction", post(submit_correction))
        .route("/{id}/verify", post(verify))
        .route("/{id}/reject", post(reject))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use compliance_core::{Category, ViolationStatus};

    #[test]
    fn test_filter_query_all_means_no_predicate() {
        let filter = FilterQuery {
            status: Some("all".to_string()),
            category: Some(String::new()),
            search: Some("ravi".to_string()),
        }
        .into_filter()
        .unwrap();

        assert!(filter.status.is_none());
        assert!(filter.category.is_none());
        assert_eq!(filter.search_text.as_deref(), Some("ravi"));
    }

    #[test]
    fn test_filter_query_parses_labels() {
        let filter = FilterQuery {
            status: Some("Corrected".to_string()),
            category: Some("Missing ID/Badge".to_string()),
            search: None,
        }
        .into_filter()
        .unwrap();

        assert_eq!(filter.status, Some(ViolationStatus::Corrected));
        assert_eq!(filter.category, Some(Category::MissingIdBadge));
    }

    #[test]
    fn test_filter_query_rejects_unknown_status() {
        let result = FilterQuery {
            status: Some("closed".to_string()),
            ..FilterQuery::default()
        }
        .into_filter();

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
