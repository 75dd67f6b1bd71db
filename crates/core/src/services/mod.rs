//! Business logic services.

pub mod account;
pub mod violation;

use std::future::Future;
use std::time::Duration;

use compliance_common::{AppError, AppResult};

pub use account::{AccountService, RegisterInput, Session, SignInInput};
pub use violation::{PhotoUpload, ReportViolationInput, ViolationService};

/// Run a collaborator call under `timeout`.
///
/// An elapsed timeout, a database error or a storage error comes back as
/// `TransientFailure`. Every other error passes through.
pub(crate) async fn bounded<T>(
    operation: &'static str,
    timeout: Duration,
    call: impl Future<Output = AppResult<T>> + Send,
) -> AppResult<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(|err| collaborator_failure(operation, err)),
        Err(_) => {
            tracing::warn!(operation, ?timeout, "Collaborator timed out");
            Err(AppError::TransientFailure(format!(
                "{operation} timed out after {}ms",
                timeout.as_millis()
            )))
        }
    }
}

fn collaborator_failure(operation: &str, err: AppError) -> AppError {
    match err {
        AppError::Database(message) | AppError::Storage(message) => {
            tracing::warn!(operation, error = %message, "Collaborator failed");
            AppError::TransientFailure(format!("{operation} failed: {message}"))
        }
        other => other,
    }
}
