//! Signed-in user
//!
//! The sync layer only needs to know whether a user is present and what
//! their id is. `AuthProvider` is the seam to a real identity service;
//! `LocalSession` keeps the user in the local store so the CLI stays signed
//! in across runs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::domain::UserId;
use crate::storage::{load_snapshot, save_snapshot, LocalStore, StorageError};

/// Local key holding the signed-in user
pub const SESSION_USER_KEY: &str = "sessionUser";
/// Local key holding the last used email
pub const EMAIL_KEY: &str = "email";
/// Local key holding the login flag (`"true"` while signed in)
pub const LOGIN_FLAG_KEY: &str = "isLoggedIn";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),
}

/// The authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
}

/// Source of the current user
pub trait AuthProvider: Send + Sync {
    /// `None` means offline, local-only mode
    fn current_user(&self) -> Option<User>;

    fn sign_in(&self, email: &str) -> Result<User, SessionError>;

    fn sign_out(&self) -> Result<(), SessionError>;
}

/// Session persisted in the local store
///
/// The user id is derived from the normalized email, so signing in again
/// with the same address reaches the same remote rows.
pub struct LocalSession {
    local: Arc<dyn LocalStore>,
}

impl LocalSession {
    pub fn new(local: Arc<dyn LocalStore>) -> Self {
        Self { local }
    }

    /// Whether the login flag is set
    pub fn is_logged_in(&self) -> bool {
        matches!(self.local.get(LOGIN_FLAG_KEY), Ok(Some(flag)) if flag == "true")
    }
}

fn normalize_email(email: &str) -> Result<String, SessionError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((name, domain)) if !name.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(email),
        _ => Err(SessionError::InvalidEmail(email)),
    }
}

impl AuthProvider for LocalSession {
    fn current_user(&self) -> Option<User> {
        if !self.is_logged_in() {
            return None;
        }
        match load_snapshot::<User>(self.local.as_ref(), SESSION_USER_KEY) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Ignoring unreadable session: {}", e);
                None
            }
        }
    }

    fn sign_in(&self, email: &str) -> Result<User, SessionError> {
        let email = normalize_email(email)?;
        let user = User {
            id: UserId::new(format!("local:{}", email)),
            email: email.clone(),
        };

        save_snapshot(self.local.as_ref(), SESSION_USER_KEY, &user)?;
        self.local.set(EMAIL_KEY, &email)?;
        self.local.set(LOGIN_FLAG_KEY, "true")?;

        info!("Signed in as {}", email);
        Ok(user)
    }

    fn sign_out(&self) -> Result<(), SessionError> {
        self.local.remove(SESSION_USER_KEY)?;
        self.local.set(LOGIN_FLAG_KEY, "false")?;
        info!("Signed out");
        Ok(())
    }
}
