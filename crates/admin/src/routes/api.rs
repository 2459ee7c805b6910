//! JSON endpoints for client-side widgets.

use axum::{Json, Router, extract::State, routing::get};

use lte_admin_core::MenuTree;

use super::paths;
use crate::{middleware::RequireStaff, state::AppState};

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new().route(paths::API_MENU, get(menu))
}

/// The signed-in user's menu tree.
///
/// GET /api/menu
pub async fn menu(staff: RequireStaff, State(state): State<AppState>) -> Json<MenuTree> {
    Json(state.site().menu_builder().build_menu(&staff.principal))
}
