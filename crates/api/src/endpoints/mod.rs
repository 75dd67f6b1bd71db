//! API endpoints.

mod auth;
mod meta;
mod violations;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/meta", meta::router())
        .nest("/violations", violations::router())
}
