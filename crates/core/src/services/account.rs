//! Account service: registration, sessions and actor resolution.

use std::sync::Arc;
use std::time::Duration;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use compliance_common::{AppError, AppResult, IdGenerator};
use compliance_db::entities::account;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::clock::Clock;
use crate::model::{Actor, Role};
use crate::services::bounded;
use crate::store::AccountStore;

/// Input for creating an account.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, max = 256, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub confirm_password: String,
    #[validate(length(min = 1, max = 128, message = "Full name is required"))]
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

/// Input for signing in.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignInInput {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// An authenticated session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub actor: Actor,
}

/// Account service.
///
/// Store calls share the lifecycle timeout, so an unreachable account store
/// surfaces as `TransientFailure` rather than a rejected session.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    clock: Arc<dyn Clock>,
    id_gen: IdGenerator,
    timeout: Duration,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self {
            store,
            clock,
            id_gen: IdGenerator::new(),
            timeout,
        }
    }

    /// Register a new account and open a session for it.
    pub async fn register(&self, input: RegisterInput) -> AppResult<Session> {
        input.validate()?;

        if input.password != input.confirm_password {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }

        let (student_id, department) = match input.role {
            Role::Student => {
                let student_id = non_blank(input.student_id);
                let department = non_blank(input.department);
                match (student_id, department) {
                    (Some(student_id), Some(department)) => (Some(student_id), Some(department)),
                    _ => {
                        return Err(AppError::Validation(
                            "Students must provide a student ID and department".to_string(),
                        ));
                    }
                }
            }
            Role::Staff | Role::Admin => (None, None),
        };

        let email = input.email.trim().to_lowercase();
        if bounded("account lookup", self.timeout, self.store.find_by_email(&email))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let account = account::Model {
            id: self.id_gen.generate(),
            email,
            password_hash: hash_password(&input.password)?,
            full_name: input.full_name.trim().to_string(),
            role: input.role,
            student_id,
            department,
            token: self.id_gen.generate_token(),
            created_at: self.clock.now().into(),
        };
        let account = bounded("account insert", self.timeout, self.store.insert(account)).await?;

        tracing::info!(account_id = %account.id, role = %account.role, "Registered account");

        Ok(Session {
            actor: Actor::from(&account),
            token: account.token,
        })
    }

    /// Exchange credentials for the account's session token.
    pub async fn sign_in(&self, input: SignInInput) -> AppResult<Session> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        let account = bounded("account lookup", self.timeout, self.store.find_by_email(&email))
            .await?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(&input.password, &account.password_hash)? {
            tracing::debug!(account_id = %account.id, "Password mismatch");
            return Err(invalid_credentials());
        }

        Ok(Session {
            actor: Actor::from(&account),
            token: account.token,
        })
    }

    /// Invalidate a session by rotating the account's token.
    pub async fn sign_out(&self, token: &str) -> AppResult<()> {
        let account = bounded("session lookup", self.timeout, self.store.find_by_token(token))
            .await?
            .ok_or(AppError::Unauthorized)?;

        let fresh = self.id_gen.generate_token();
        bounded(
            "session rotation",
            self.timeout,
            self.store.update_token(&account.id, &fresh),
        )
        .await?;

        tracing::debug!(account_id = %account.id, "Session closed");
        Ok(())
    }

    /// Resolve a session token to the acting identity.
    pub async fn current_actor(&self, token: &str) -> AppResult<Actor> {
        bounded("session lookup", self.timeout, self.store.find_by_token(token))
            .await?
            .map(|account| Actor::from(&account))
            .ok_or(AppError::Unauthorized)
    }
}

fn invalid_credentials() -> AppError {
    tracing::debug!("Invalid credentials");
    AppError::Unauthorized
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
