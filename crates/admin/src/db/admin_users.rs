//! Admin user repository for database operations.
//!
//! Covers admin accounts and their permission codenames. Queries are checked
//! at runtime so the crate builds without a live database.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use lte_admin_core::{AdminUserId, Email};

use super::RepositoryError;
use crate::models::AdminUser;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` admin user queries.
#[derive(Debug, sqlx::FromRow)]
struct AdminUserRow {
    id: i32,
    email: String,
    name: String,
    password_hash: String,
    is_active: bool,
    is_staff: bool,
    is_superuser: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AdminUserRow> for AdminUser {
    type Error = RepositoryError;

    fn try_from(row: AdminUserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: AdminUserId::new(row.id),
            email,
            name: row.name,
            password_hash: row.password_hash,
            is_active: row.is_active,
            is_staff: row.is_staff,
            is_superuser: row.is_superuser,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Map a unique violation on the email column to `Conflict`.
fn map_unique_email(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict("email already exists".to_owned());
    }
    RepositoryError::Database(e)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for admin user database operations.
pub struct AdminUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminUserRepository<'a> {
    /// Create a new admin user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all admin users, ordered by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list_all(&self) -> Result<Vec<AdminUser>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminUserRow>(
            r"
            SELECT id, email, name, password_hash, is_active, is_staff, is_superuser,
                   last_login, created_at, updated_at
            FROM admin.admin_user
            ORDER BY email ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get an admin user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_id(&self, id: AdminUserId) -> Result<Option<AdminUser>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r"
            SELECT id, email, name, password_hash, is_active, is_staff, is_superuser,
                   last_login, created_at, updated_at
            FROM admin.admin_user
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an admin user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<AdminUser>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r"
            SELECT id, email, name, password_hash, is_active, is_staff, is_superuser,
                   last_login, created_at, updated_at
            FROM admin.admin_user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Permission codenames granted to a user, sorted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn permissions(&self, id: AdminUserId) -> Result<Vec<String>, RepositoryError> {
        let codenames = sqlx::query_scalar::<_, String>(
            r"
            SELECT codename
            FROM admin.admin_user_permission
            WHERE admin_user_id = $1
            ORDER BY codename ASC
            ",
        )
        .bind(id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(codenames)
    }

    /// Create a new admin user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
        is_staff: bool,
        is_superuser: bool,
    ) -> Result<AdminUser, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r"
            INSERT INTO admin.admin_user (email, name, password_hash, is_staff, is_superuser)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, name, password_hash, is_active, is_staff, is_superuser,
                      last_login, created_at, updated_at
            ",
        )
        .bind(email.as_str())
        .bind(name)
        .bind(password_hash)
        .bind(is_staff)
        .bind(is_superuser)
        .fetch_one(self.pool)
        .await
        .map_err(map_unique_email)?;

        row.try_into()
    }

    /// Grant a permission codename. Returns `false` if it was already held.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn grant_permission(
        &self,
        id: AdminUserId,
        codename: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO admin.admin_user_permission (admin_user_id, codename)
            VALUES ($1, $2)
            ON CONFLICT (admin_user_id, codename) DO NOTHING
            ",
        )
        .bind(id.as_i32())
        .bind(codename)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Update display name and email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Conflict` if the email belongs to another user.
    pub async fn update_profile(
        &self,
        id: AdminUserId,
        name: &str,
        email: &Email,
    ) -> Result<AdminUser, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r"
            UPDATE admin.admin_user
            SET name = $2, email = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, name, password_hash, is_active, is_staff, is_superuser,
                      last_login, created_at, updated_at
            ",
        )
        .bind(id.as_i32())
        .bind(name)
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await
        .map_err(map_unique_email)?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Replace the stored password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_password(
        &self,
        id: AdminUserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE admin.admin_user
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Record a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn touch_last_login(&self, id: AdminUserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE admin.admin_user SET last_login = NOW() WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
