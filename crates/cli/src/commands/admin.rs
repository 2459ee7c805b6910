//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a staff user (password from LTE_ADMIN_PASSWORD)
//! LTE_ADMIN_PASSWORD='...' lte-cli admin create -e admin@example.com -n "Admin Name"
//!
//! # Create a superuser
//! LTE_ADMIN_PASSWORD='...' lte-cli admin create -e root@example.com -n "Root" --superuser
//!
//! # Grant a permission
//! lte-cli admin grant -e admin@example.com -p blog.change_article
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `LTE_ADMIN_PASSWORD` - password for `admin create`

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;

use lte_admin::db::{AdminUserRepository, RepositoryError};
use lte_admin::services::AuthError;
use lte_admin::services::auth::{hash_password, validate_new_password};
use lte_admin_core::{Action, AdminUserId, Email, EmailError};

/// Variable holding the new user's password.
const PASSWORD_VAR: &str = "LTE_ADMIN_PASSWORD";

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password rejected or could not be hashed.
    #[error("Password rejected: {0}")]
    Password(#[from] AuthError),

    /// User already exists.
    #[error("Admin user already exists with email: {0}")]
    UserExists(String),

    /// No user with this email.
    #[error("No admin user with email: {0}")]
    UserNotFound(String),

    /// Codename is not `app_label.action_model`.
    #[error("Invalid permission codename: {0} (expected app_label.action_model)")]
    InvalidCodename(String),
}

async fn connect() -> Result<PgPool, AdminError> {
    let database_url =
        super::database_url().ok_or(AdminError::MissingEnvVar(super::DATABASE_URL_VAR))?;

    tracing::info!("Connecting to admin database...");
    Ok(PgPool::connect(&database_url).await?)
}

/// Create a new admin user.
///
/// # Arguments
///
/// * `email` - Admin's email address
/// * `name` - Admin's display name
/// * `is_superuser` - Grant every permission
/// * `is_staff` - Allow signing in to the admin site
///
/// # Returns
///
/// The ID of the created admin user.
pub async fn create_user(
    email: &str,
    name: &str,
    is_superuser: bool,
    is_staff: bool,
) -> Result<AdminUserId, AdminError> {
    let email = Email::parse(email)?;
    if name.trim().is_empty() {
        return Err(AuthError::MissingName.into());
    }
    let password = std::env::var(PASSWORD_VAR)
        .map(SecretString::from)
        .map_err(|_| AdminError::MissingEnvVar(PASSWORD_VAR))?;
    validate_new_password(password.expose_secret(), password.expose_secret())?;
    let password_hash = hash_password(password.expose_secret())?;

    let pool = connect().await?;
    let users = AdminUserRepository::new(&pool);

    tracing::info!("Creating admin user: {}", email);
    let user = match users
        .create(&email, name.trim(), &password_hash, is_staff, is_superuser)
        .await
    {
        Ok(user) => user,
        Err(RepositoryError::Conflict(_)) => return Err(AdminError::UserExists(email.to_string())),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Staff: {}, Superuser: {}",
        user.id,
        user.email,
        user.is_staff,
        user.is_superuser
    );
    if !is_staff {
        tracing::warn!("User is not staff and cannot sign in to the admin site.");
    }

    Ok(user.id)
}

/// Grant a permission codename to an existing admin user.
pub async fn grant_permission(email: &str, codename: &str) -> Result<(), AdminError> {
    let email = Email::parse(email)?;
    validate_codename(codename)?;

    let pool = connect().await?;
    let users = AdminUserRepository::new(&pool);
    let user = users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| AdminError::UserNotFound(email.to_string()))?;

    if users.grant_permission(user.id, codename).await? {
        tracing::info!("Granted {} to {}", codename, user.email);
    } else {
        tracing::info!("{} already has {}", user.email, codename);
    }
    if user.is_superuser {
        tracing::warn!("{} is a superuser; explicit grants have no effect.", user.email);
    }
    Ok(())
}

/// Check that `codename` reads `app_label.{add,change,delete,view}_model`.
fn validate_codename(codename: &str) -> Result<(), AdminError> {
    let invalid = || AdminError::InvalidCodename(codename.to_owned());
    let (app_label, rest) = codename.split_once('.').ok_or_else(invalid)?;
    let (action, model) = rest.split_once('_').ok_or_else(invalid)?;

    let known_action = Action::ALL.iter().any(|a| a.as_str() == action);
    if app_label.is_empty() || model.is_empty() || !known_action {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_codename;

    #[test]
    fn test_validate_codename() {
        assert!(validate_codename("blog.change_article").is_ok());
        assert!(validate_codename("accounts.view_adminuser").is_ok());
        assert!(validate_codename("shop.delete_order_line").is_ok());

        assert!(validate_codename("change_article").is_err());
        assert!(validate_codename("blog.publish_article").is_err());
        assert!(validate_codename("blog.view_").is_err());
        assert!(validate_codename(".view_article").is_err());
        assert!(validate_codename("blog.article").is_err());
    }
}
