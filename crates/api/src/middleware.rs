//! API middleware.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use compliance_common::AppError;
use compliance_core::{AccountService, ViolationService};

use crate::extractors::SessionToken;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub account_service: AccountService,
    pub violation_service: ViolationService,
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` to an actor and stores it in the
/// request extensions. Requests with an unknown token pass through
/// unauthenticated; handlers that need an actor reject them. A session
/// lookup that fails answers the request with that error.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    if let Some(token) = token {
        match state.account_service.current_actor(&token).await {
            Ok(actor) => {
                req.extensions_mut().insert(actor);
                req.extensions_mut().insert(SessionToken(token));
            }
            Err(AppError::Unauthorized) => {
                tracing::debug!("Unknown session token");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to resolve session");
                return e.into_response();
            }
        }
    }

    next.run(req).await
}
