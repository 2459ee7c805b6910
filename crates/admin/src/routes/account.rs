//! Profile and password change handlers for the signed-in user.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::State,
    http::Uri,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use lte_admin_core::route_names;

use super::paths;
use crate::{
    error::AppError,
    filters,
    middleware::{RequireStaff, auth as session_auth},
    services::{AdminAuthService, AuthError},
    site::PageContext,
    state::AppState,
};

/// Profile update form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
}

/// Password change form data.
#[derive(Debug, Deserialize)]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

/// Profile detail template.
#[derive(Template, WebTemplate)]
#[template(path = "lte/accounts/profile.html")]
pub struct ProfileTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub name: String,
    pub email: String,
    pub is_superuser: bool,
    pub last_login: String,
    pub joined: String,
    pub permissions: Vec<String>,
}

/// Profile update template.
#[derive(Template, WebTemplate)]
#[template(path = "lte/accounts/profile_update.html")]
pub struct ProfileUpdateTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub error: Option<String>,
    pub name: String,
    pub email: String,
}

/// Password change template.
#[derive(Template, WebTemplate)]
#[template(path = "lte/accounts/password_change.html")]
pub struct PasswordChangeTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub error: Option<String>,
}

/// Build the account router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(paths::PROFILE, get(profile))
        .route(paths::PROFILE_UPDATE, get(profile_update_page).post(profile_update))
        .route(
            paths::PASSWORD_CHANGE,
            get(password_change_page).post(password_change),
        )
}

/// Map a service error to a form message, or a server error.
fn form_error(err: AuthError) -> Result<String, AppError> {
    if err.is_user_facing() {
        return Ok(err.to_string());
    }
    match err {
        AuthError::Repository(e) => Err(e.into()),
        other => Err(AppError::Internal(other.to_string())),
    }
}

/// Profile detail for the signed-in user.
///
/// GET /profile
#[instrument(skip(staff, state, uri), fields(admin_user_id = %staff.user.id))]
pub async fn profile(staff: RequireStaff, State(state): State<AppState>, uri: Uri) -> ProfileTemplate {
    let user = &staff.user;
    ProfileTemplate {
        ctx: state.site().each_context(user, &staff.principal, uri.path()),
        title: "Profile".to_string(),
        name: user.name.clone(),
        email: user.email.to_string(),
        is_superuser: user.is_superuser,
        last_login: user.last_login.map_or_else(
            || "never".to_string(),
            |at| at.format("%Y-%m-%d %H:%M UTC").to_string(),
        ),
        joined: user.created_at.format("%Y-%m-%d").to_string(),
        permissions: staff.principal.permissions().map(str::to_string).collect(),
    }
}

/// Profile update form, pre-filled.
///
/// GET /profile/edit
pub async fn profile_update_page(
    staff: RequireStaff,
    State(state): State<AppState>,
    uri: Uri,
) -> ProfileUpdateTemplate {
    ProfileUpdateTemplate {
        ctx: state.site().each_context(&staff.user, &staff.principal, uri.path()),
        title: "Update Profile".to_string(),
        error: None,
        name: staff.user.name.clone(),
        email: staff.user.email.to_string(),
    }
}

/// Save name and email.
///
/// POST /profile/edit
#[instrument(skip(staff, state, session, uri, form), fields(admin_user_id = %staff.user.id))]
pub async fn profile_update(
    staff: RequireStaff,
    State(state): State<AppState>,
    session: Session,
    uri: Uri,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let auth = AdminAuthService::new(state.pool());
    match auth.update_profile(&staff.user, &form.name, &form.email).await {
        Ok(updated) => {
            session_auth::refresh_current_admin(&session, &updated).await?;
            let profile = state.site().reverse(route_names::PROFILE, &[])?;
            Ok(Redirect::to(&profile).into_response())
        }
        Err(e) => Ok(ProfileUpdateTemplate {
            ctx: state.site().each_context(&staff.user, &staff.principal, uri.path()),
            title: "Update Profile".to_string(),
            error: Some(form_error(e)?),
            name: form.name,
            email: form.email,
        }
        .into_response()),
    }
}

/// Password change form.
///
/// GET /password/change
pub async fn password_change_page(
    staff: RequireStaff,
    State(state): State<AppState>,
    uri: Uri,
) -> PasswordChangeTemplate {
    PasswordChangeTemplate {
        ctx: state.site().each_context(&staff.user, &staff.principal, uri.path()),
        title: "Change password".to_string(),
        error: None,
    }
}

/// Change the password. The current session stays signed in.
///
/// POST /password/change
#[instrument(skip(staff, state, uri, form), fields(admin_user_id = %staff.user.id))]
pub async fn password_change(
    staff: RequireStaff,
    State(state): State<AppState>,
    uri: Uri,
    Form(form): Form<PasswordChangeForm>,
) -> Result<Response, AppError> {
    let auth = AdminAuthService::new(state.pool());
    match auth
        .change_password(
            &staff.user,
            &form.old_password,
            &form.new_password1,
            &form.new_password2,
        )
        .await
    {
        Ok(()) => {
            let profile = state.site().reverse(route_names::PROFILE, &[])?;
            Ok(Redirect::to(&profile).into_response())
        }
        Err(e) => Ok(PasswordChangeTemplate {
            ctx: state.site().each_context(&staff.user, &staff.principal, uri.path()),
            title: "Change password".to_string(),
            error: Some(form_error(e)?),
        }
        .into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::RepositoryError;

    #[test]
    fn test_form_error_user_facing() {
        assert_eq!(
            form_error(AuthError::PasswordMismatch).ok().as_deref(),
            Some("The two password fields didn't match.")
        );
        assert_eq!(
            form_error(AuthError::EmailTaken).ok().as_deref(),
            Some("An admin with this email already exists.")
        );
    }

    #[test]
    fn test_form_error_server_side() {
        assert!(matches!(
            form_error(AuthError::Repository(RepositoryError::NotFound)),
            Err(AppError::Database(_))
        ));
        assert!(matches!(
            form_error(AuthError::PasswordHash),
            Err(AppError::Internal(_))
        ));
    }
}
