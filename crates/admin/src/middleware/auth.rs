//! Authentication extractor and session helpers for the admin site.
//!
//! [`RequireStaff`] is the access gate for private views: the session must
//! name an active staff user. The user's flags and permissions are reloaded
//! from the database on every request.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::{Expiry, Session};

use lte_admin_core::Principal;

use crate::db::{AdminUserRepository, RepositoryError};
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::{AdminUser, CurrentAdmin, session_keys};
use crate::routes::paths;
use crate::state::AppState;

/// Extractor that requires an active staff user.
///
/// Anonymous HTML requests are redirected to the login page with a `next`
/// parameter, anonymous API requests get 401 and signed-in users without
/// site access get 403.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(staff: RequireStaff) -> impl IntoResponse {
///     format!("Hello, {}!", staff.user.name)
/// }
/// ```
pub struct RequireStaff {
    pub user: AdminUser,
    pub principal: Principal,
}

/// Why [`RequireStaff`] refused a request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page (HTML requests).
    RedirectToLogin { next: String },
    /// Unauthorized response (API requests).
    Unauthorized,
    /// Signed in, but not an active staff member.
    Forbidden,
    /// Session or database failure while checking.
    Internal(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => Redirect::to(&login_url(&next)).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have permission to access the admin site",
            )
                .into_response(),
            Self::Internal(err) => err.into_response(),
        }
    }
}

impl From<AppError> for AuthRejection {
    fn from(err: AppError) -> Self {
        Self::Internal(err)
    }
}

impl From<RepositoryError> for AuthRejection {
    fn from(err: RepositoryError) -> Self {
        Self::Internal(err.into())
    }
}

impl From<tower_sessions::session::Error> for AuthRejection {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(err.into())
    }
}

/// Login page URL that returns to `next` afterwards.
#[must_use]
pub fn login_url(next: &str) -> String {
    format!("{}?next={}", paths::LOGIN, urlencoding::encode(next))
}

fn anonymous_rejection(parts: &Parts) -> AuthRejection {
    if parts.uri.path().starts_with("/api/") {
        return AuthRejection::Unauthorized;
    }
    let next = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);
    AuthRejection::RedirectToLogin { next }
}

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let Some(current) = session
            .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
            .await?
        else {
            return Err(anonymous_rejection(parts));
        };

        let users = AdminUserRepository::new(state.pool());
        let user = match users.get_by_id(current.id).await? {
            Some(user) if user.is_active => user,
            _ => {
                // Deleted or deactivated since login.
                tracing::info!(admin_user_id = %current.id, "dropping stale admin session");
                session.flush().await?;
                return Err(anonymous_rejection(parts));
            }
        };

        let principal = user.principal(users.permissions(user.id).await?);
        if !principal.has_site_access() {
            tracing::warn!(admin_user_id = %user.id, "non-staff user denied admin access");
            return Err(AuthRejection::Forbidden);
        }

        set_sentry_user(user.id.as_i32(), Some(user.email.as_str()));
        Ok(Self { user, principal })
    }
}

/// Start an authenticated session for `user`.
///
/// The session id is rotated first. Without `remember_me` the cookie lasts
/// until the browser closes.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn login(
    session: &Session,
    user: &AdminUser,
    remember_me: bool,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::CURRENT_ADMIN, CurrentAdmin::from(user))
        .await?;
    if !remember_me {
        session.set_expiry(Some(Expiry::OnSessionEnd));
    }
    Ok(())
}

/// Refresh the session copy of the user's identity after a profile change.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn refresh_current_admin(
    session: &Session,
    user: &AdminUser,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::CURRENT_ADMIN, CurrentAdmin::from(user))
        .await
}

/// End the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn logout(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await?;
    clear_sentry_user();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(uri: &str) -> Parts {
        Request::builder().uri(uri).body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_login_url_encodes_next() {
        assert_eq!(login_url("/"), "/login?next=%2F");
        assert_eq!(
            login_url("/accounts?q=a b"),
            "/login?next=%2Faccounts%3Fq%3Da%20b"
        );
    }

    #[test]
    fn test_anonymous_html_redirects_with_next() {
        match anonymous_rejection(&parts("/accounts/adminuser?page=2")) {
            AuthRejection::RedirectToLogin { next } => {
                assert_eq!(next, "/accounts/adminuser?page=2");
            }
            other => panic!("unexpected rejection: {other:?}"),
        }
    }

    #[test]
    fn test_anonymous_api_unauthorized() {
        assert!(matches!(
            anonymous_rejection(&parts("/api/menu")),
            AuthRejection::Unauthorized
        ));
    }

    #[test]
    fn test_rejection_responses() {
        let redirect = AuthRejection::RedirectToLogin {
            next: "/".to_string(),
        }
        .into_response();
        assert_eq!(redirect.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            redirect.headers().get("location").and_then(|v| v.to_str().ok()),
            Some("/login?next=%2F")
        );
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
