//! Login, logout and password reset handlers.
//!
//! These pages are reachable without signing in.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::Uri,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use lte_admin_core::{Email, route_names};

use super::paths;
use crate::{
    db::AdminUserRepository,
    error::AppError,
    filters,
    middleware::auth as session_auth,
    models::AdminUser,
    services::{AdminAuthService, AuthError, PasswordResetTokens},
    site::PageContext,
    state::AppState,
};

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Checkbox; present only when ticked.
    pub remember_me: Option<String>,
    pub next: Option<String>,
}

/// Password reset request form data.
#[derive(Debug, Deserialize)]
pub struct PasswordResetForm {
    pub email: String,
}

/// New password form data.
#[derive(Debug, Deserialize)]
pub struct SetPasswordForm {
    pub new_password1: String,
    pub new_password2: String,
}

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "lte/accounts/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub error: Option<String>,
    pub email: String,
    pub next: String,
}

/// Password reset request template.
#[derive(Template, WebTemplate)]
#[template(path = "lte/accounts/password_reset_form.html")]
pub struct PasswordResetTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub error: Option<String>,
}

/// Password reset sent template.
#[derive(Template, WebTemplate)]
#[template(path = "lte/accounts/password_reset_done.html")]
pub struct PasswordResetDoneTemplate {
    pub ctx: PageContext,
    pub title: String,
}

/// New password template. `valid_link` is false for bad or expired tokens.
#[derive(Template, WebTemplate)]
#[template(path = "lte/accounts/password_reset_confirm.html")]
pub struct PasswordResetConfirmTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub valid_link: bool,
    pub error: Option<String>,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(paths::LOGIN, get(login_page).post(login))
        .route(paths::LOGOUT, get(logout).post(logout))
        .route(
            paths::PASSWORD_RESET,
            get(password_reset_page).post(password_reset),
        )
        .route(paths::PASSWORD_RESET_DONE, get(password_reset_done))
        .route(
            paths::PASSWORD_RESET_CONFIRM,
            get(password_reset_confirm_page).post(password_reset_confirm),
        )
}

/// Accept only same-site absolute paths as a post-login target.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Display the login page.
///
/// GET /login
pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    uri: Uri,
) -> LoginTemplate {
    LoginTemplate {
        ctx: state.site().public_context(uri.path()),
        title: "Login".to_string(),
        error: None,
        email: String::new(),
        next: safe_next(query.next.as_deref()).unwrap_or_default().to_string(),
    }
}

/// Handle login form submission.
///
/// POST /login
#[instrument(skip(state, session, form, uri))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    uri: Uri,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let auth = AdminAuthService::new(state.pool());
    match auth.authenticate(&form.email, &form.password).await {
        Ok(user) => {
            let remember_me = form.remember_me.is_some();
            session_auth::login(&session, &user, remember_me).await?;

            let target = match safe_next(form.next.as_deref()) {
                Some(next) => next.to_string(),
                None => state.site().reverse(route_names::PROFILE, &[])?,
            };
            Ok(Redirect::to(&target).into_response())
        }
        Err(e) if e.is_user_facing() => {
            tracing::warn!(error = %e, "admin login failed");
            Ok(LoginTemplate {
                ctx: state.site().public_context(uri.path()),
                title: "Login".to_string(),
                error: Some(e.to_string()),
                email: form.email,
                next: safe_next(form.next.as_deref()).unwrap_or_default().to_string(),
            }
            .into_response())
        }
        Err(AuthError::Repository(e)) => Err(e.into()),
        Err(e) => Err(AppError::Internal(e.to_string())),
    }
}

/// Logout and clear session.
///
/// GET|POST /logout
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect, AppError> {
    session_auth::logout(&session).await?;
    Ok(Redirect::to(&state.site().reverse(route_names::LOGIN, &[])?))
}

// =============================================================================
// Password Reset
// =============================================================================

/// Display the password reset request form.
///
/// GET /password/reset
pub async fn password_reset_page(State(state): State<AppState>, uri: Uri) -> PasswordResetTemplate {
    PasswordResetTemplate {
        ctx: state.site().public_context(uri.path()),
        title: "Password reset".to_string(),
        error: None,
    }
}

/// Email a reset link if the address belongs to an active admin.
///
/// Always redirects to the done page so the form does not reveal which
/// addresses exist.
///
/// POST /password/reset
#[instrument(skip(state, form, uri))]
pub async fn password_reset(
    State(state): State<AppState>,
    uri: Uri,
    Form(form): Form<PasswordResetForm>,
) -> Result<Response, AppError> {
    let Ok(email) = Email::parse(&form.email) else {
        return Ok(PasswordResetTemplate {
            ctx: state.site().public_context(uri.path()),
            title: "Password reset".to_string(),
            error: Some("Enter a valid email address.".to_string()),
        }
        .into_response());
    };

    let user = AdminUserRepository::new(state.pool())
        .get_by_email(&email)
        .await?;
    match user {
        Some(user) if user.is_active => send_reset_email(&state, &user).await?,
        _ => tracing::info!("password reset requested for unknown or inactive address"),
    }

    let done = state.site().reverse(route_names::PASSWORD_RESET_DONE, &[])?;
    Ok(Redirect::to(&done).into_response())
}

async fn send_reset_email(state: &AppState, user: &AdminUser) -> Result<(), AppError> {
    let Some(mailer) = state.email() else {
        tracing::warn!(admin_user_id = %user.id, "SMTP not configured; reset email not sent");
        return Ok(());
    };

    let token = state.tokens().make_token(user, Utc::now());
    let path = state
        .site()
        .reverse(route_names::PASSWORD_RESET_CONFIRM, &[("token", token.as_str())])?;
    let reset_url = state.config().absolute_url(&path);

    if let Err(e) = mailer
        .send_password_reset(
            user.email.as_str(),
            &user.name,
            &state.site().branding().site_title,
            &reset_url,
        )
        .await
    {
        let event_id = sentry::capture_error(&e);
        tracing::error!(error = %e, sentry_event_id = %event_id, "failed to send reset email");
    }
    Ok(())
}

/// Reset email sent.
///
/// GET /password/reset/done
pub async fn password_reset_done(
    State(state): State<AppState>,
    uri: Uri,
) -> PasswordResetDoneTemplate {
    PasswordResetDoneTemplate {
        ctx: state.site().public_context(uri.path()),
        title: "Password reset".to_string(),
    }
}

/// Load the user a reset token belongs to, if the token is still valid.
async fn user_for_token(state: &AppState, token: &str) -> Result<Option<AdminUser>, AppError> {
    let Ok(id) = PasswordResetTokens::user_id(token) else {
        return Ok(None);
    };
    let Some(user) = AdminUserRepository::new(state.pool()).get_by_id(id).await? else {
        return Ok(None);
    };
    if !user.is_active {
        return Ok(None);
    }

    match state.tokens().check_token(&user, token, Utc::now()) {
        Ok(()) => Ok(Some(user)),
        Err(e) => {
            tracing::info!(admin_user_id = %user.id, error = %e, "rejected reset token");
            Ok(None)
        }
    }
}

/// Display the new password form.
///
/// GET /password/reset/{token}
pub async fn password_reset_confirm_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
    uri: Uri,
) -> Result<PasswordResetConfirmTemplate, AppError> {
    let valid_link = user_for_token(&state, &token).await?.is_some();
    Ok(PasswordResetConfirmTemplate {
        ctx: state.site().public_context(uri.path()),
        title: "Password reset confirm".to_string(),
        valid_link,
        error: None,
    })
}

/// Set the new password, log the user in and go to their profile.
///
/// POST /password/reset/{token}
#[instrument(skip(state, session, token, form, uri))]
pub async fn password_reset_confirm(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
    uri: Uri,
    Form(form): Form<SetPasswordForm>,
) -> Result<Response, AppError> {
    let render = |valid_link: bool, error: Option<String>| PasswordResetConfirmTemplate {
        ctx: state.site().public_context(uri.path()),
        title: "Password reset confirm".to_string(),
        valid_link,
        error,
    };

    let Some(user) = user_for_token(&state, &token).await? else {
        return Ok(render(false, None).into_response());
    };

    let auth = AdminAuthService::new(state.pool());
    match auth
        .set_password(&user, &form.new_password1, &form.new_password2)
        .await
    {
        Ok(()) => {}
        Err(e) if e.is_user_facing() => return Ok(render(true, Some(e.to_string())).into_response()),
        Err(AuthError::Repository(e)) => return Err(e.into()),
        Err(e) => return Err(AppError::Internal(e.to_string())),
    }

    let users = AdminUserRepository::new(state.pool());
    users.touch_last_login(user.id).await?;
    session_auth::login(&session, &user, true).await?;
    tracing::info!(admin_user_id = %user.id, "password reset completed");

    let profile = state.site().reverse(route_names::PROFILE, &[])?;
    Ok(Redirect::to(&profile).into_response())
}

#[cfg(test)]
mod tests {
    use super::safe_next;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/accounts")), Some("/accounts"));
        assert_eq!(safe_next(Some("/")), Some("/"));
        assert_eq!(safe_next(Some("//evil.test/")), None);
        assert_eq!(safe_next(Some("https://evil.test/")), None);
        assert_eq!(safe_next(Some("/\\evil.test")), None);
        assert_eq!(safe_next(Some("")), None);
        assert_eq!(safe_next(None), None);
    }
}
