//! Admin user domain types.
//!
//! These types represent validated domain objects for admin authentication.

use std::fmt;

use chrono::{DateTime, Utc};

use lte_admin_core::{AdminUserId, Email, Principal};

/// An admin user (domain type).
///
/// Implements `Debug` manually to keep the password hash out of logs.
#[derive(Clone)]
pub struct AdminUser {
    /// Unique admin user ID.
    pub id: AdminUserId,
    /// Admin's email address.
    pub email: Email,
    /// Admin's display name.
    pub name: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Inactive users cannot log in and hold no permissions.
    pub is_active: bool,
    /// Staff users may enter the admin site.
    pub is_staff: bool,
    /// Superusers hold every permission.
    pub is_superuser: bool,
    /// Last successful login, if any.
    pub last_login: Option<DateTime<Utc>>,
    /// When the admin was created.
    pub created_at: DateTime<Utc>,
    /// When the admin was last updated.
    pub updated_at: DateTime<Utc>,
}

impl AdminUser {
    /// Build the request principal from this user and their permission codenames.
    #[must_use]
    pub fn principal<I, S>(&self, codenames: I) -> Principal
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Principal::builder()
            .id(self.id)
            .active(self.is_active)
            .staff(self.is_staff)
            .superuser(self.is_superuser)
            .permissions(codenames)
            .build()
    }

    /// Whether this user may enter the admin site.
    #[must_use]
    pub const fn has_site_access(&self) -> bool {
        self.is_active && self.is_staff
    }
}

impl fmt::Debug for AdminUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password_hash", &"[REDACTED]")
            .field("is_active", &self.is_active)
            .field("is_staff", &self.is_staff)
            .field("is_superuser", &self.is_superuser)
            .field("last_login", &self.last_login)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn test_user() -> AdminUser {
    let now = Utc::now();
    AdminUser {
        id: AdminUserId::new(7),
        email: Email::parse("staff@lte.test").unwrap(),
        name: "Staff Member".to_string(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        is_active: true,
        is_staff: true,
        is_superuser: false,
        last_login: None,
        created_at: now,
        updated_at: now,
    }
}
