//! Session middleware configuration for the admin site.
//!
//! `PostgreSQL`-backed sessions using tower-sessions with SameSite=Strict and
//! a two-week inactivity expiry.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

/// Session cookie name for the admin site.
pub const SESSION_COOKIE_NAME: &str = "lte_admin_session";

/// Inactivity expiry in seconds (two weeks).
const SESSION_EXPIRY_SECONDS: i64 = 14 * 24 * 60 * 60;

/// `PostgreSQL` store in `admin.session`. The table is created by migration.
///
/// # Errors
///
/// Returns the store's message if the schema or table name is rejected.
pub fn postgres_store(pool: &PgPool) -> Result<PostgresStore, String> {
    PostgresStore::new(pool.clone())
        .with_schema_name("admin")?
        .with_table_name("session")
}

/// Create the session layer around `store`.
///
/// `is_secure` sets the cookie's `Secure` flag; pass `true` when served over HTTPS.
#[must_use]
pub fn create_session_layer<S: SessionStore + Clone>(
    store: S,
    is_secure: bool,
) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
