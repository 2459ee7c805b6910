//! The admin site: registry, named routes and branding, built once at startup.
//!
//! ```rust,ignore
//! let site = AdminSite::builder(branding).build()?;
//! let menu = site.menu_builder().build_menu(&principal);
//! ```

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use lte_admin_core::{
    EntityKey, EntityType, GroupCatalog, GroupConfig, LocationResolver, MenuBuilder, MenuTree,
    ModelAdmin, Principal, Registry, RegistryBuilder, RegistryError, ReverseError, RouteAction,
    UrlTable, UrlTableBuilder, route_names,
};

use crate::config::SiteBranding;
use crate::models::AdminUser;
use crate::routes::paths;

/// Group label of the built-in accounts entities.
pub const ACCOUNTS_APP: &str = "accounts";

/// Model name of the built-in admin user entity.
pub const ADMIN_USER_MODEL: &str = "adminuser";

/// Why an [`AdminSite`] could not be built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SiteError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The label would make the group index path shadow a fixed page.
    #[error("group label '{0}' is taken by a fixed admin path")]
    ReservedGroupLabel(String),
}

/// Admin for `accounts.adminuser`: default permission rules, change list only.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminUserAdmin;

impl ModelAdmin for AdminUserAdmin {
    fn route_actions(&self) -> &'static [RouteAction] {
        &[RouteAction::Changelist]
    }
}

/// Path served for a per-entity route.
#[must_use]
pub fn entity_path(key: &EntityKey, action: RouteAction) -> String {
    match action {
        RouteAction::Changelist => format!("/{}/{}", key.app_label, key.model_name),
        RouteAction::Add => format!("/{}/{}/add", key.app_label, key.model_name),
    }
}

/// Registry, route table and branding shared by every request.
#[derive(Debug)]
pub struct AdminSite {
    registry: Registry,
    urls: UrlTable,
    branding: SiteBranding,
}

impl AdminSite {
    /// Builder pre-loaded with the accounts group and the admin user entity.
    #[must_use]
    pub fn builder(branding: SiteBranding) -> AdminSiteBuilder {
        AdminSiteBuilder::new(branding)
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub const fn urls(&self) -> &UrlTable {
        &self.urls
    }

    #[must_use]
    pub const fn branding(&self) -> &SiteBranding {
        &self.branding
    }

    #[must_use]
    pub fn menu_builder(&self) -> MenuBuilder<'_> {
        MenuBuilder::new(&self.registry, &self.urls)
    }

    /// Reverse a named route.
    ///
    /// # Errors
    ///
    /// Returns [`ReverseError`] for an unknown route or missing parameter.
    pub fn reverse(&self, name: &str, params: &[(&str, &str)]) -> Result<String, ReverseError> {
        self.urls.reverse(name, params)
    }

    /// Context shared by every private page: branding, sidebar menu and the
    /// signed-in user.
    #[must_use]
    pub fn each_context(&self, user: &AdminUser, principal: &Principal, path: &str) -> PageContext {
        PageContext {
            menu: self.menu_builder().build_menu(principal),
            user: Some(UserBadge {
                name: user.name.clone(),
                email: user.email.to_string(),
                is_superuser: user.is_superuser,
            }),
            ..self.public_context(path)
        }
    }

    /// Context for pages reachable without signing in.
    #[must_use]
    pub fn public_context(&self, path: &str) -> PageContext {
        PageContext {
            site_title: self.branding.site_title.clone(),
            site_header: self.branding.site_header.clone(),
            current_path: path.to_string(),
            menu: MenuTree::new(),
            user: None,
        }
    }
}

/// Builds an [`AdminSite`].
pub struct AdminSiteBuilder {
    catalog: GroupCatalog,
    group_labels: Vec<String>,
    registrations: Vec<(EntityType, Arc<dyn ModelAdmin>)>,
    branding: SiteBranding,
}

impl AdminSiteBuilder {
    fn new(branding: SiteBranding) -> Self {
        let mut builder = Self {
            catalog: GroupCatalog::default(),
            group_labels: Vec::new(),
            registrations: Vec::new(),
            branding,
        };
        builder
            .group(GroupConfig::new(ACCOUNTS_APP, "Accounts"))
            .register(
                EntityType::new(ACCOUNTS_APP, ADMIN_USER_MODEL, "admin user")
                    .with_object_name("AdminUser"),
                Arc::new(AdminUserAdmin),
            );
        builder
    }

    /// Add an entity group.
    pub fn group(&mut self, config: GroupConfig) -> &mut Self {
        self.group_labels.push(config.label.clone());
        self.catalog.insert(config);
        self
    }

    /// Queue an entity type for registration. Errors surface in [`build`](Self::build).
    ///
    /// Every action in `admin.route_actions()` is added to the route table,
    /// so its handler must be mounted in the router.
    pub fn register(&mut self, entity: EntityType, admin: Arc<dyn ModelAdmin>) -> &mut Self {
        self.registrations.push((entity, admin));
        self
    }

    /// Build the registry and route table.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::ReservedGroupLabel`] for a group label used by a
    /// fixed path, or the [`RegistryError`] for a duplicate entity or an
    /// unknown group.
    pub fn build(self) -> Result<AdminSite, SiteError> {
        if let Some(label) = self
            .group_labels
            .into_iter()
            .find(|label| paths::is_reserved_segment(label))
        {
            return Err(SiteError::ReservedGroupLabel(label));
        }

        let mut registry = RegistryBuilder::new(self.catalog);
        let mut urls = UrlTableBuilder::new();
        for (name, pattern) in paths::NAMED {
            urls.add(*name, *pattern);
        }

        for (entity, admin) in self.registrations {
            for &action in admin.route_actions() {
                urls.add(
                    route_names::entity(entity.key(), action),
                    entity_path(entity.key(), action),
                );
            }
            registry.register(entity, admin)?;
        }

        let site = AdminSite {
            registry: registry.build(),
            urls: urls.build(),
            branding: self.branding,
        };
        tracing::info!(
            entities = site.registry.len(),
            routes = site.urls.len(),
            "admin site built"
        );
        Ok(site)
    }
}

/// Signed-in user shown in the navbar.
#[derive(Debug, Clone, Serialize)]
pub struct UserBadge {
    pub name: String,
    pub email: String,
    pub is_superuser: bool,
}

/// Values every page template receives.
#[derive(Debug, Clone, Serialize)]
pub struct PageContext {
    pub site_title: String,
    pub site_header: String,
    /// Request path, used to highlight the active sidebar entry.
    pub current_path: String,
    pub menu: MenuTree,
    pub user: Option<UserBadge>,
}

impl PageContext {
    /// Whether the sidebar entry at `url` is the current page or one of its parents.
    #[must_use]
    pub fn is_active(&self, url: &str) -> bool {
        if url == "/" {
            return self.current_path == "/";
        }
        self.current_path == url
            || self
                .current_path
                .strip_prefix(url)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lte_admin_core::DefaultModelAdmin;

    use super::*;
    use crate::models::admin_user::test_user;

    fn site() -> AdminSite {
        AdminSite::builder(SiteBranding::default()).build().unwrap()
    }

    #[test]
    fn test_site_registers_admin_user_changelist_only() {
        let site = site();
        let key = EntityKey::new(ACCOUNTS_APP, ADMIN_USER_MODEL);

        assert!(site.registry().get(&key).is_some());
        assert_eq!(
            site.urls()
                .reverse_entity(&key, RouteAction::Changelist)
                .unwrap(),
            "/accounts/adminuser"
        );
        assert!(matches!(
            site.urls().reverse_entity(&key, RouteAction::Add),
            Err(ReverseError::RouteNotFound(_))
        ));
    }

    #[test]
    fn test_named_routes_reverse() {
        let site = site();
        assert_eq!(site.reverse(route_names::INDEX, &[]).unwrap(), "/");
        assert_eq!(site.reverse(route_names::LOGIN, &[]).unwrap(), "/login");
        assert_eq!(
            site.reverse(route_names::APP_LIST, &[("app_label", "accounts")])
                .unwrap(),
            "/accounts"
        );
        assert_eq!(
            site.reverse(route_names::PASSWORD_RESET_CONFIRM, &[("token", "Nw-1-ab")])
                .unwrap(),
            "/password/reset/Nw-1-ab"
        );
    }

    #[test]
    fn test_default_admin_registers_no_entity_routes() {
        let mut builder = AdminSite::builder(SiteBranding::default());
        builder.group(GroupConfig::new("blog", "Blog")).register(
            EntityType::new("blog", "post", "post"),
            Arc::new(DefaultModelAdmin),
        );
        let site = builder.build().unwrap();

        assert_eq!(site.registry().len(), 2);
        let key = EntityKey::new("blog", "post");
        for action in [RouteAction::Changelist, RouteAction::Add] {
            assert!(matches!(
                site.urls().reverse_entity(&key, action),
                Err(ReverseError::RouteNotFound(_))
            ));
        }

        // Listed, but without a change-list link.
        let user = test_user();
        let ctx = site.each_context(&user, &user.principal(["blog.change_post"]), "/");
        assert_eq!(ctx.menu.len(), 1);
        assert_eq!(ctx.menu[0].models[0].name, "Posts");
        assert_eq!(ctx.menu[0].models[0].admin_url, None);
        assert_eq!(ctx.menu[0].app_url.as_deref(), Some("/blog"));
    }

    #[test]
    fn test_reserved_group_labels_fail_build() {
        for label in ["profile", "login", "password", "api", "static", "health"] {
            let mut builder = AdminSite::builder(SiteBranding::default());
            builder.group(GroupConfig::new(label, "Clash"));
            assert_eq!(
                builder.build().unwrap_err(),
                SiteError::ReservedGroupLabel(label.to_string()),
                "{label}"
            );
        }
    }

    #[test]
    fn test_unknown_group_fails_build() {
        let mut builder = AdminSite::builder(SiteBranding::default());
        builder.register(
            EntityType::new("shop", "order", "order"),
            Arc::new(DefaultModelAdmin),
        );
        assert!(matches!(
            builder.build(),
            Err(SiteError::Registry(RegistryError::UnknownGroup { .. }))
        ));
    }

    #[test]
    fn test_each_context_menu_follows_permissions() {
        let site = site();
        let user = test_user();

        let without = site.each_context(&user, &user.principal(Vec::<String>::new()), "/");
        assert!(without.menu.is_empty());
        assert_eq!(without.user.as_ref().unwrap().name, "Staff Member");

        let with = site.each_context(&user, &user.principal(["accounts.change_adminuser"]), "/");
        assert_eq!(with.menu.len(), 1);
        assert_eq!(with.menu[0].name, "Accounts");
        assert_eq!(with.menu[0].models[0].name, "Admin users");
        assert_eq!(
            with.menu[0].models[0].admin_url.as_deref(),
            Some("/accounts/adminuser")
        );
    }

    #[test]
    fn test_is_active() {
        let ctx = site().public_context("/accounts/adminuser");
        assert!(ctx.is_active("/accounts"));
        assert!(ctx.is_active("/accounts/adminuser"));
        assert!(!ctx.is_active("/"));
        assert!(!ctx.is_active("/acc"));
        assert!(site().public_context("/").is_active("/"));
    }
}
