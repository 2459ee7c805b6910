//! HTTP route handlers for the admin site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check (database)
//!
//! # Dashboard
//! GET  /                          - Dashboard with the full menu
//! GET  /{app_label}               - Group index
//!
//! # Entities
//! GET  /accounts/adminuser        - Admin user change list
//!
//! # Accounts
//! GET  /login                     - Login form
//! POST /login                     - Authenticate
//! GET  /logout, POST /logout      - End session
//! GET  /profile                   - Profile detail
//! GET  /profile/edit              - Profile form
//! POST /profile/edit              - Update name/email
//! GET  /password/change           - Password change form
//! POST /password/change           - Change password
//! GET  /password/reset            - Reset request form
//! POST /password/reset            - Send reset email
//! GET  /password/reset/done       - Reset email sent
//! GET  /password/reset/{token}    - New password form
//! POST /password/reset/{token}    - Set password and log in
//!
//! # API
//! GET  /api/menu                  - Menu tree as JSON
//! ```

pub mod account;
pub mod admin_users;
pub mod api;
pub mod auth;
pub mod dashboard;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};

use crate::state::AppState;

/// Route paths. Named ones are also loaded into the site's URL table.
pub mod paths {
    use lte_admin_core::route_names;

    pub const HEALTH: &str = "/health";
    pub const READY: &str = "/health/ready";
    pub const INDEX: &str = "/";
    pub const APP_LIST: &str = "/{app_label}";
    pub const ADMIN_USER_CHANGELIST: &str = "/accounts/adminuser";
    pub const LOGIN: &str = "/login";
    pub const LOGOUT: &str = "/logout";
    pub const PROFILE: &str = "/profile";
    pub const PROFILE_UPDATE: &str = "/profile/edit";
    pub const PASSWORD_CHANGE: &str = "/password/change";
    pub const PASSWORD_RESET: &str = "/password/reset";
    pub const PASSWORD_RESET_DONE: &str = "/password/reset/done";
    pub const PASSWORD_RESET_CONFIRM: &str = "/password/reset/{token}";
    pub const API_MENU: &str = "/api/menu";
    pub const STATIC: &str = "/static";

    /// `(route name, path)` pairs for reversing.
    pub const NAMED: &[(&str, &str)] = &[
        (route_names::INDEX, INDEX),
        (route_names::APP_LIST, APP_LIST),
        (route_names::LOGIN, LOGIN),
        (route_names::LOGOUT, LOGOUT),
        (route_names::PROFILE, PROFILE),
        (route_names::PROFILE_UPDATE, PROFILE_UPDATE),
        (route_names::PASSWORD_CHANGE, PASSWORD_CHANGE),
        (route_names::PASSWORD_RESET, PASSWORD_RESET),
        (route_names::PASSWORD_RESET_DONE, PASSWORD_RESET_DONE),
        (route_names::PASSWORD_RESET_CONFIRM, PASSWORD_RESET_CONFIRM),
    ];

    /// Paths outside the group index and entity routes.
    pub const FIXED: &[&str] = &[
        INDEX,
        HEALTH,
        READY,
        LOGIN,
        LOGOUT,
        PROFILE,
        PROFILE_UPDATE,
        PASSWORD_CHANGE,
        PASSWORD_RESET,
        PASSWORD_RESET_DONE,
        PASSWORD_RESET_CONFIRM,
        API_MENU,
        STATIC,
    ];

    /// Whether `/{segment}` would be shadowed by a fixed path.
    #[must_use]
    pub fn is_reserved_segment(segment: &str) -> bool {
        FIXED
            .iter()
            .any(|path| path.trim_start_matches('/').split('/').next() == Some(segment))
    }
}

/// All admin routes, without middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(paths::HEALTH, get(health))
        .route(paths::READY, get(readiness))
        .merge(dashboard::router())
        .merge(admin_users::router())
        .merge(auth::router())
        .merge(account::router())
        .merge(api::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::paths::is_reserved_segment;

    #[test]
    fn test_reserved_segments() {
        for segment in ["", "health", "login", "logout", "profile", "password", "api", "static"] {
            assert!(is_reserved_segment(segment), "{segment}");
        }
        assert!(!is_reserved_segment("accounts"));
        assert!(!is_reserved_segment("blog"));
        assert!(!is_reserved_segment("pass"));
    }
}
