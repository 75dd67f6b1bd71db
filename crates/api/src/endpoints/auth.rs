//! Authentication endpoints.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use compliance_common::AppResult;
use compliance_core::{Actor, RegisterInput, Session, SignInInput};
use serde::Serialize;

use crate::{
    extractors::{AuthActor, SessionToken},
    middleware::AppState,
    response::ApiResponse,
};

/// Create a new account.
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterInput>,
) -> AppResult<ApiResponse<Session>> {
    let session = state.account_service.register(req).await?;
    Ok(ApiResponse::ok(session))
}

/// Sign in to an existing account.
async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SignInInput>,
) -> AppResult<ApiResponse<Session>> {
    let session = state.account_service.sign_in(req).await?;
    Ok(ApiResponse::ok(session))
}

/// Signout response.
#[derive(Serialize)]
pub struct SignoutResponse {
    pub ok: bool,
}

/// Sign out (invalidate current token by rotating it).
async fn signout(
    SessionToken(token): SessionToken,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<SignoutResponse>> {
    state.account_service.sign_out(&token).await?;
    Ok(ApiResponse::ok(SignoutResponse { ok: true }))
}

/// The signed-in actor.
async fn me(AuthActor(actor): AuthActor) -> ApiResponse<Actor> {
    ApiResponse::ok(actor)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
        .route("/me", get(me))
}
