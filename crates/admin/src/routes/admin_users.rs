//! Change list for the built-in admin user entity.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Router, extract::State, http::Uri, routing::get};
use tracing::instrument;

use lte_admin_core::EntityKey;

use super::paths;
use crate::{
    db::AdminUserRepository,
    error::AppError,
    filters,
    middleware::RequireStaff,
    models::AdminUser,
    site::{ACCOUNTS_APP, ADMIN_USER_MODEL, PageContext},
    state::AppState,
};

/// One row of the change list.
#[derive(Debug, Clone)]
pub struct AdminUserRow {
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub last_login: String,
}

impl From<&AdminUser> for AdminUserRow {
    fn from(user: &AdminUser) -> Self {
        Self {
            email: user.email.to_string(),
            name: user.name.clone(),
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            last_login: user.last_login.map_or_else(
                || "-".to_string(),
                |at| at.format("%Y-%m-%d %H:%M").to_string(),
            ),
        }
    }
}

/// Admin user change list template.
#[derive(Template, WebTemplate)]
#[template(path = "lte/adminuser_list.html")]
pub struct AdminUserListTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub group_name: String,
    pub group_url: Option<String>,
    pub users: Vec<AdminUserRow>,
}

/// Build the admin user router.
pub fn router() -> Router<AppState> {
    Router::new().route(paths::ADMIN_USER_CHANGELIST, get(changelist))
}

/// List admin users. Requires view (or change) permission on the entity.
///
/// GET /accounts/adminuser
#[instrument(skip(staff, state, uri), fields(admin_user_id = %staff.user.id))]
pub async fn changelist(
    staff: RequireStaff,
    State(state): State<AppState>,
    uri: Uri,
) -> Result<AdminUserListTemplate, AppError> {
    let site = state.site();
    let key = EntityKey::new(ACCOUNTS_APP, ADMIN_USER_MODEL);
    let entry = site
        .registry()
        .get(&key)
        .ok_or_else(|| AppError::NotFound(key.to_string()))?;

    if !entry.admin.has_view_permission(&staff.principal, &entry.entity) {
        return Err(AppError::Forbidden(format!("cannot view {key}")));
    }

    let users = AdminUserRepository::new(state.pool()).list_all().await?;
    let group_name = site
        .registry()
        .catalog()
        .get(ACCOUNTS_APP)
        .map_or_else(|| ACCOUNTS_APP.to_string(), |g| g.verbose_name.clone());
    let group_url = site
        .reverse(
            lte_admin_core::route_names::APP_LIST,
            &[("app_label", ACCOUNTS_APP)],
        )
        .ok();

    Ok(AdminUserListTemplate {
        ctx: site.each_context(&staff.user, &staff.principal, uri.path()),
        title: format!("Select {} to view", entry.entity.verbose_name()),
        group_name,
        group_url,
        users: users.iter().map(AdminUserRow::from).collect(),
    })
}
