//! Meta endpoints.

use axum::{routing::get, Json, Router};
use compliance_core::{Category, Priority, ViolationStatus, DEPARTMENTS};
use serde::Serialize;

use crate::middleware::AppState;

/// Reference data for building report forms and filters.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaResponse {
    pub name: String,
    pub version: String,
    pub categories: Vec<&'static str>,
    pub departments: Vec<&'static str>,
    pub priorities: Vec<Priority>,
    pub statuses: Vec<ViolationStatus>,
}

/// Get portal metadata.
async fn meta() -> Json<MetaResponse> {
    Json(MetaResponse {
        name: "compliance-portal".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        categories: Category::ALL.iter().map(|c| c.label()).collect(),
        departments: DEPARTMENTS.to_vec(),
        priorities: Priority::ALL.to_vec(),
        statuses: ViolationStatus::ALL.to_vec(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(meta))
}
