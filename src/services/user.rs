//! User service
//!
//! Staff accounts and login sessions:
//! - staff creation with username and password rules
//! - login issuing an opaque session token
//! - session validation, logout and expiry cleanup

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Session, User};
use crate::services::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 150;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Unknown user, wrong password or inactive account
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Username already taken
    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    /// Session expired
    #[error("Session expired")]
    SessionExpired,

    /// Unknown session token
    #[error("Invalid session")]
    InvalidSession,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A freshly opened session and the user it belongs to
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session: Session,
    pub user: User,
}

/// User service for managing accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_days,
        }
    }

    /// Create a staff account
    pub async fn create_staff(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, UserServiceError> {
        self.create_user(CreateUserInput {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            is_staff: true,
        })
        .await
    }

    /// Create an account
    ///
    /// # Errors
    /// - `ValidationError` for a malformed username, email or short password
    /// - `DuplicateUsername` if the username is taken
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let username = validate_username(&input.username)?;
        let email = validate_email(&input.email)?;
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(UserServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::DuplicateUsername(username));
        }

        let password_hash = hash_password(&input.password)?;
        let user = User::new(username, email, password_hash, input.is_staff);
        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!("Created user '{}' (staff: {})", created.username, created.is_staff);
        Ok(created)
    }

    /// Check credentials and open a session
    ///
    /// # Errors
    /// - `InvalidCredentials` for an unknown user, a wrong password or an
    ///   inactive account. The cases are not distinguished.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthSession, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username.trim())
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? || !user.is_active {
            tracing::warn!("Failed login for '{}'", user.username);
            return Err(UserServiceError::InvalidCredentials);
        }

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id,
            expires_at: now + Duration::days(self.session_days),
            created_at: now,
        };
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        self.user_repo
            .touch_last_login(user.id, now)
            .await
            .context("Failed to record login")?;

        Ok(AuthSession {
            session,
            user: User {
                last_login: Some(now),
                ..user
            },
        })
    }

    /// Resolve a session token to its user
    ///
    /// # Errors
    /// - `InvalidSession` for an unknown token or a user that is gone or inactive
    /// - `SessionExpired` for an expired session, which is deleted
    pub async fn validate_session(&self, token: &str) -> Result<User, UserServiceError> {
        let session = self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
            .ok_or(UserServiceError::InvalidSession)?;

        if session.is_expired() {
            let _ = self.session_repo.delete(token).await;
            return Err(UserServiceError::SessionExpired);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::InvalidSession)?;

        if !user.is_active {
            return Err(UserServiceError::InvalidSession);
        }
        Ok(user)
    }

    /// Delete a session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        Ok(self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?)
    }

    /// Number of staff accounts
    pub async fn count_staff(&self) -> Result<i64, UserServiceError> {
        Ok(self.user_repo.count_staff().await.context("Failed to count staff")?)
    }
}

fn validate_username(username: &str) -> Result<String, UserServiceError> {
    let username = username.trim();
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(UserServiceError::ValidationError(format!(
            "Username must be {} to {} characters",
            MIN_USERNAME_LEN, MAX_USERNAME_LEN
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '_' | '-'))
    {
        return Err(UserServiceError::ValidationError(
            "Username may only contain letters, digits and @ . + - _".to_string(),
        ));
    }
    Ok(username.to_string())
}

/// Email is optional; when present it needs a local part and a domain
fn validate_email(email: &str) -> Result<String, UserServiceError> {
    let email = email.trim();
    if email.is_empty() {
        return Ok(String::new());
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email.to_string()),
        _ => Err(UserServiceError::ValidationError(format!(
            "Invalid email address: {}",
            email
        ))),
    }
}
