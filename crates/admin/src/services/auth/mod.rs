//! Admin authentication service.
//!
//! Email/password login with Argon2 hashes, profile updates, password
//! changes and password reset tokens.

mod error;
pub mod tokens;

pub use error::AuthError;
pub use tokens::{PasswordResetTokens, TokenError};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use lte_admin_core::Email;

use crate::db::RepositoryError;
use crate::db::admin_users::AdminUserRepository;
use crate::models::AdminUser;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Admin authentication service.
pub struct AdminAuthService<'a> {
    users: AdminUserRepository<'a>,
}

impl<'a> AdminAuthService<'a> {
    /// Create a new admin authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: AdminUserRepository::new(pool),
        }
    }

    /// Check an email/password pair and record the login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or wrong
    /// password, `AuthError::Inactive` for a deactivated account.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AdminUser, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;
        if !user.is_active {
            return Err(AuthError::Inactive);
        }

        self.users.touch_last_login(user.id).await?;
        tracing::info!(admin_user_id = %user.id, "admin logged in");
        Ok(user)
    }

    /// Update the user's name and email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::MissingName` or
    /// `AuthError::EmailTaken`.
    pub async fn update_profile(
        &self,
        user: &AdminUser,
        name: &str,
        email: &str,
    ) -> Result<AdminUser, AuthError> {
        let email = Email::parse(email)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }

        self.users
            .update_profile(user.id, name, &email)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    /// Change the password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IncorrectPassword` if `old_password` is wrong, or a
    /// validation error for the new password.
    pub async fn change_password(
        &self,
        user: &AdminUser,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthError> {
        verify_password(old_password, &user.password_hash)
            .map_err(|_| AuthError::IncorrectPassword)?;
        self.set_password(user, new_password, confirm_password)
            .await
    }

    /// Set a new password without checking the current one.
    ///
    /// # Errors
    ///
    /// Returns a validation error for the new password, or a database error.
    pub async fn set_password(
        &self,
        user: &AdminUser,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthError> {
        validate_new_password(new_password, confirm_password)?;
        let hash = hash_password(new_password)?;
        self.users.set_password(user.id, &hash).await?;
        tracing::info!(admin_user_id = %user.id, "admin password changed");
        Ok(())
    }
}

/// Check a new password and its confirmation.
///
/// # Errors
///
/// Returns `AuthError::PasswordMismatch` or `AuthError::WeakPassword`.
pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), AuthError> {
    if password != confirm {
        return Err(AuthError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword(
            "Password can't be entirely numeric.".to_string(),
        ));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or an unparsable hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
