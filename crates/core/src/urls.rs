//! Named routes and URL reversing.
//!
//! Patterns use `{param}` placeholders, matching axum's path syntax, so the
//! same pattern string can be handed to the router and stored here.

use std::collections::HashMap;

use thiserror::Error;

use crate::registry::{EntityKey, RouteAction};

/// Route names used by the admin site.
pub mod route_names {
    use crate::registry::{EntityKey, RouteAction};

    pub const INDEX: &str = "admin:index";
    pub const APP_LIST: &str = "admin:app_list";
    pub const LOGIN: &str = "admin:login";
    pub const LOGOUT: &str = "admin:logout";
    pub const PROFILE: &str = "admin:profile";
    pub const PROFILE_UPDATE: &str = "admin:profile_update";
    pub const PASSWORD_CHANGE: &str = "admin:password_change";
    pub const PASSWORD_RESET: &str = "admin:password_reset";
    pub const PASSWORD_RESET_DONE: &str = "admin:password_reset_done";
    pub const PASSWORD_RESET_CONFIRM: &str = "admin:password_reset_confirm";

    /// `admin:{app_label}_{model_name}_{changelist|add}`
    #[must_use]
    pub fn entity(key: &EntityKey, action: RouteAction) -> String {
        format!(
            "admin:{}_{}_{}",
            key.app_label,
            key.model_name,
            action.suffix()
        )
    }
}

/// Failure to turn a route name into a URL.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReverseError {
    /// No route is registered under this name.
    #[error("no route named '{0}'")]
    RouteNotFound(String),

    /// The route needs a parameter that was not supplied.
    #[error("route '{route}' requires parameter '{param}'")]
    MissingParam { route: String, param: String },
}

/// Maps a symbolic route name and parameters to a URL.
pub trait LocationResolver {
    /// # Errors
    ///
    /// Returns [`ReverseError`] when the route is unknown or a parameter is missing.
    fn reverse(&self, name: &str, params: &[(&str, &str)]) -> Result<String, ReverseError>;

    /// Reverse a per-entity route (change list or add form).
    ///
    /// # Errors
    ///
    /// Same as [`reverse`](Self::reverse).
    fn reverse_entity(&self, key: &EntityKey, action: RouteAction) -> Result<String, ReverseError> {
        self.reverse(&route_names::entity(key, action), &[])
    }
}

/// Immutable table of named route patterns.
#[derive(Debug, Clone, Default)]
pub struct UrlTable {
    routes: HashMap<String, String>,
}

impl UrlTable {
    #[must_use]
    pub fn builder() -> UrlTableBuilder {
        UrlTableBuilder::new()
    }

    /// Pattern registered under `name`.
    #[must_use]
    pub fn pattern(&self, name: &str) -> Option<&str> {
        self.routes.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl LocationResolver for UrlTable {
    fn reverse(&self, name: &str, params: &[(&str, &str)]) -> Result<String, ReverseError> {
        let pattern = self
            .routes
            .get(name)
            .ok_or_else(|| ReverseError::RouteNotFound(name.to_owned()))?;

        let mut url = String::with_capacity(pattern.len());
        let mut rest = pattern.as_str();
        while let Some(open) = rest.find('{') {
            let (literal, tail) = rest.split_at(open);
            let Some(close) = tail.find('}') else {
                break;
            };
            let (placeholder, after) = tail.split_at(close + 1);
            let param = placeholder.trim_start_matches('{').trim_end_matches('}');
            let value = params
                .iter()
                .find_map(|&(key, value)| (key == param).then_some(value))
                .ok_or_else(|| ReverseError::MissingParam {
                    route: name.to_owned(),
                    param: param.to_owned(),
                })?;

            url.push_str(literal);
            url.push_str(&urlencoding::encode(value));
            rest = after;
        }
        url.push_str(rest);
        Ok(url)
    }
}

/// Builder for [`UrlTable`]. Later registrations under the same name win.
#[derive(Debug, Default)]
pub struct UrlTableBuilder {
    routes: HashMap<String, String>,
}

impl UrlTableBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn route(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.add(name, pattern);
        self
    }

    /// Non-consuming variant of [`route`](Self::route).
    pub fn add(&mut self, name: impl Into<String>, pattern: impl Into<String>) -> &mut Self {
        self.routes.insert(name.into(), pattern.into());
        self
    }

    #[must_use]
    pub fn build(self) -> UrlTable {
        UrlTable {
            routes: self.routes,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn table() -> UrlTable {
        UrlTable::builder()
            .route(route_names::INDEX, "/")
            .route(route_names::APP_LIST, "/{app_label}")
            .route("admin:blog_post_changelist", "/blog/post")
            .route("admin:pair", "/{a}/x/{b}/")
            .build()
    }

    #[test]
    fn test_reverse_static_route() {
        assert_eq!(table().reverse(route_names::INDEX, &[]).unwrap(), "/");
    }

    #[test]
    fn test_reverse_substitutes_params() {
        let urls = table();
        assert_eq!(
            urls.reverse(route_names::APP_LIST, &[("app_label", "blog")]).unwrap(),
            "/blog"
        );
        assert_eq!(
            urls.reverse("admin:pair", &[("b", "2"), ("a", "1")]).unwrap(),
            "/1/x/2/"
        );
    }

    #[test]
    fn test_reverse_percent_encodes_params() {
        assert_eq!(
            table()
                .reverse(route_names::APP_LIST, &[("app_label", "a b/c")])
                .unwrap(),
            "/a%20b%2Fc"
        );
    }

    #[test]
    fn test_reverse_unknown_route() {
        assert_eq!(
            table().reverse("admin:nope", &[]),
            Err(ReverseError::RouteNotFound("admin:nope".to_owned()))
        );
    }

    #[test]
    fn test_reverse_missing_param() {
        assert_eq!(
            table().reverse(route_names::APP_LIST, &[]),
            Err(ReverseError::MissingParam {
                route: route_names::APP_LIST.to_owned(),
                param: "app_label".to_owned(),
            })
        );
    }

    #[test]
    fn test_reverse_entity_routes() {
        let urls = table();
        let key = EntityKey::new("blog", "post");
        assert_eq!(
            urls.reverse_entity(&key, RouteAction::Changelist).unwrap(),
            "/blog/post"
        );
        assert!(matches!(
            urls.reverse_entity(&key, RouteAction::Add),
            Err(ReverseError::RouteNotFound(name)) if name == "admin:blog_post_add"
        ));
    }
}
