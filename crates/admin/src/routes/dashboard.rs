//! Dashboard and group index handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Path, State},
    http::Uri,
    routing::get,
};
use tracing::instrument;

use lte_admin_core::{AppSummary, MenuTree};

use super::paths;
use crate::{error::AppError, filters, middleware::RequireStaff, site::PageContext, state::AppState};

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "lte/index.html")]
pub struct IndexTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub app_list: MenuTree,
}

/// Group index template.
#[derive(Template, WebTemplate)]
#[template(path = "lte/app_index.html")]
pub struct AppIndexTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub app: AppSummary,
}

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(paths::INDEX, get(index))
        .route(paths::APP_LIST, get(app_index))
}

/// Dashboard listing every group and entity the user can act on.
///
/// GET /
#[instrument(skip(staff, state, uri), fields(admin_user_id = %staff.user.id))]
pub async fn index(staff: RequireStaff, State(state): State<AppState>, uri: Uri) -> IndexTemplate {
    let site = state.site();
    let ctx = site.each_context(&staff.user, &staff.principal, uri.path());

    IndexTemplate {
        title: site.branding().index_title.clone(),
        app_list: ctx.menu.clone(),
        ctx,
    }
}

/// Index page for one entity group.
///
/// GET /{app_label}
#[instrument(skip(staff, state, uri), fields(admin_user_id = %staff.user.id))]
pub async fn app_index(
    staff: RequireStaff,
    State(state): State<AppState>,
    Path(app_label): Path<String>,
    uri: Uri,
) -> Result<AppIndexTemplate, AppError> {
    let site = state.site();
    let app = site
        .menu_builder()
        .build_app_index(&staff.principal, &app_label)?;

    Ok(AppIndexTemplate {
        title: format!("{} administration", app.name),
        ctx: site.each_context(&staff.user, &staff.principal, uri.path()),
        app,
    })
}
