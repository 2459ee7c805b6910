//! Admin authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during admin authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] lte_admin_core::EmailError),

    /// Wrong email or password. Deliberately does not say which.
    #[error("Please enter a correct email and password.")]
    InvalidCredentials,

    /// Correct credentials for a deactivated account.
    #[error("This account is inactive.")]
    Inactive,

    /// The current password given for a password change is wrong.
    #[error("Your old password was entered incorrectly.")]
    IncorrectPassword,

    /// The two new password fields differ.
    #[error("The two password fields didn't match.")]
    PasswordMismatch,

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// Profile name left blank.
    #[error("Name is required.")]
    MissingName,

    /// Email is already used by another admin.
    #[error("An admin with this email already exists.")]
    EmailTaken,

    /// Admin user not found.
    #[error("admin user not found")]
    UserNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Whether the message is safe and useful to show next to a form.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Repository(_) | Self::PasswordHash)
    }
}
