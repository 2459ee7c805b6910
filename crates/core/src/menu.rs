//! Permission-filtered site menu and group index.
//!
//! [`MenuBuilder::build_menu`] walks the whole registry and produces the
//! sidebar/dashboard tree: groups sorted case-insensitively by display name,
//! entity types inside each group sorted case-sensitively. Entities the
//! principal cannot act on are left out without error.
//!
//! [`MenuBuilder::build_app_index`] does the same for a single group but is
//! strict: an unknown group, a denied entity or an empty result are errors the
//! caller turns into 404/403 responses.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::permissions::{PermissionSet, Principal};
use crate::registry::{EntityKey, Registry, RegistryEntry, RouteAction};
use crate::text::capfirst;
use crate::urls::{LocationResolver, route_names};

/// Why a group index could not be built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MenuError {
    /// The group label is not in the group catalog.
    #[error("no group registered with label '{0}'")]
    GroupNotRegistered(String),

    /// The principal lacks module access to an entity in the group.
    #[error("access to {0} denied")]
    AccessDenied(EntityKey),

    /// Nothing in the group is visible to the principal.
    #[error("group '{0}' has no entities to show")]
    PageNotFound(String),
}

/// One entity type as the principal sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    /// Capitalized plural display name.
    pub name: String,
    pub object_name: String,
    pub perms: PermissionSet,
    /// Change-list location, present only with `change` permission and a
    /// registered route.
    pub admin_url: Option<String>,
    /// Add-form location, only filled in by the group index.
    pub add_url: Option<String>,
}

/// One entity group with the entity types visible in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSummary {
    pub name: String,
    pub app_label: String,
    pub app_url: Option<String>,
    pub has_module_perms: bool,
    pub models: Vec<ModelSummary>,
}

/// The full site menu, in display order.
pub type MenuTree = Vec<AppSummary>;

/// Builds menus from a registry and a location resolver.
///
/// Holds only shared references; build a new one per request or keep one
/// around, either works.
#[derive(Clone, Copy)]
pub struct MenuBuilder<'a> {
    registry: &'a Registry,
    resolver: &'a dyn LocationResolver,
}

impl<'a> MenuBuilder<'a> {
    #[must_use]
    pub fn new(registry: &'a Registry, resolver: &'a dyn LocationResolver) -> Self {
        Self { registry, resolver }
    }

    /// Build the full site menu for `principal`.
    #[must_use]
    pub fn build_menu(&self, principal: &Principal) -> MenuTree {
        let mut apps: MenuTree = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for entry in self.registry.iter() {
            if !entry.admin.has_module_permission(principal, &entry.entity) {
                continue;
            }
            let Some(model) = self.summarize(entry, principal, false) else {
                continue;
            };

            let app_label = entry.entity.app_label();
            if let Some(app) = positions.get(app_label).and_then(|&i| apps.get_mut(i)) {
                app.models.push(model);
                continue;
            }

            positions.insert(app_label, apps.len());
            apps.push(AppSummary {
                name: self.group_name(app_label),
                app_label: app_label.to_owned(),
                app_url: self.app_url(app_label),
                has_module_perms: true,
                models: vec![model],
            });
        }

        apps.sort_by_cached_key(|app| app.name.to_lowercase());
        for app in &mut apps {
            sort_models(&mut app.models);
        }

        tracing::debug!(apps = apps.len(), "built admin menu");
        apps
    }

    /// Build the index page for one group.
    ///
    /// # Errors
    ///
    /// - [`MenuError::GroupNotRegistered`] if `app_label` is not in the catalog.
    /// - [`MenuError::AccessDenied`] on the first entity in the group the
    ///   principal has no module access to.
    /// - [`MenuError::PageNotFound`] if no entity in the group is visible.
    pub fn build_app_index(
        &self,
        principal: &Principal,
        app_label: &str,
    ) -> Result<AppSummary, MenuError> {
        let group = self
            .registry
            .catalog()
            .get(app_label)
            .ok_or_else(|| MenuError::GroupNotRegistered(app_label.to_owned()))?;

        let mut models = Vec::new();
        for entry in self.registry.entries_for(app_label) {
            if !entry.admin.has_module_permission(principal, &entry.entity) {
                return Err(MenuError::AccessDenied(entry.entity.key().clone()));
            }
            if let Some(model) = self.summarize(entry, principal, true) {
                models.push(model);
            }
        }

        if models.is_empty() {
            return Err(MenuError::PageNotFound(app_label.to_owned()));
        }
        sort_models(&mut models);

        Ok(AppSummary {
            name: group.verbose_name.clone(),
            app_label: app_label.to_owned(),
            app_url: None,
            has_module_perms: true,
            models,
        })
    }

    /// Summary for one entry, or `None` when no action is allowed.
    fn summarize(
        &self,
        entry: &RegistryEntry,
        principal: &Principal,
        with_add: bool,
    ) -> Option<ModelSummary> {
        let perms = entry.admin.get_model_perms(principal, &entry.entity);
        if !perms.any() {
            return None;
        }

        let key = entry.entity.key();
        let admin_url = if perms.change {
            self.entity_url(key, RouteAction::Changelist)
        } else {
            None
        };
        let add_url = if with_add && perms.add {
            self.entity_url(key, RouteAction::Add)
        } else {
            None
        };

        Some(ModelSummary {
            name: capfirst(entry.entity.verbose_name_plural()),
            object_name: entry.entity.object_name().to_owned(),
            perms,
            admin_url,
            add_url,
        })
    }

    fn entity_url(&self, key: &EntityKey, action: RouteAction) -> Option<String> {
        self.resolver
            .reverse_entity(key, action)
            .inspect_err(|e| tracing::debug!(entity = %key, error = %e, "omitting entity link"))
            .ok()
    }

    fn app_url(&self, app_label: &str) -> Option<String> {
        self.resolver
            .reverse(route_names::APP_LIST, &[("app_label", app_label)])
            .inspect_err(|e| tracing::warn!(app_label, error = %e, "group index route missing"))
            .ok()
    }

    /// Registration guarantees a catalog entry; fall back to the label anyway.
    fn group_name(&self, app_label: &str) -> String {
        self.registry
            .catalog()
            .get(app_label)
            .map_or_else(|| capfirst(app_label), |group| group.verbose_name.clone())
    }
}

/// Entity types sort by display name, case-sensitively.
fn sort_models(models: &mut [ModelSummary]) {
    models.sort_by(|a, b| a.name.cmp(&b.name));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::permissions::Action;
    use crate::registry::{
        DefaultModelAdmin, EntityType, GroupCatalog, GroupConfig, ModelAdmin, RegistryBuilder,
    };
    use crate::urls::{UrlTable, UrlTableBuilder};

    /// Admin that refuses module access outright.
    struct LockedAdmin;

    impl ModelAdmin for LockedAdmin {
        fn has_module_permission(&self, _: &Principal, _: &EntityType) -> bool {
            false
        }
    }

    /// Admin that grants module access and a fixed permission set.
    struct FixedAdmin(PermissionSet);

    impl ModelAdmin for FixedAdmin {
        fn has_module_permission(&self, _: &Principal, _: &EntityType) -> bool {
            true
        }

        fn get_model_perms(&self, _: &Principal, _: &EntityType) -> PermissionSet {
            self.0
        }
    }

    fn catalog() -> GroupCatalog {
        GroupCatalog::from_configs([
            GroupConfig::new("blog", "Blog"),
            GroupConfig::new("shop", "Shop"),
            GroupConfig::new("zoo", "zoo keeping"),
            GroupConfig::new("aa", "Aa group"),
            GroupConfig::new("ab", "AB group"),
        ])
    }

    fn urls() -> UrlTable {
        let mut builder = UrlTableBuilder::new();
        builder.add(route_names::APP_LIST, "/{app_label}");
        for (app, model) in [("blog", "article"), ("blog", "comment"), ("shop", "order")] {
            builder.add(format!("admin:{app}_{model}_changelist"), format!("/{app}/{model}"));
            builder.add(format!("admin:{app}_{model}_add"), format!("/{app}/{model}/add"));
        }
        builder.build()
    }

    fn blog_registry() -> Registry {
        let mut builder = RegistryBuilder::new(catalog());
        builder
            .register(EntityType::new("blog", "article", "article"), Arc::new(DefaultModelAdmin))
            .unwrap()
            .register(EntityType::new("blog", "comment", "comment"), Arc::new(DefaultModelAdmin))
            .unwrap();
        builder.build()
    }

    fn staff() -> crate::permissions::PrincipalBuilder {
        Principal::builder().staff(true)
    }

    #[test]
    fn test_empty_registry_builds_empty_menu() {
        let registry = RegistryBuilder::new(catalog()).build();
        let urls = urls();
        let menu = MenuBuilder::new(&registry, &urls).build_menu(&staff().superuser(true).build());
        assert!(menu.is_empty());
    }

    #[test]
    fn test_change_only_on_article() {
        let registry = blog_registry();
        let urls = urls();
        let principal = staff().permission("blog.change_article").build();

        let menu = MenuBuilder::new(&registry, &urls).build_menu(&principal);

        assert_eq!(menu.len(), 1);
        let blog = &menu[0];
        assert_eq!(blog.name, "Blog");
        assert_eq!(blog.app_label, "blog");
        assert_eq!(blog.app_url.as_deref(), Some("/blog"));
        assert_eq!(blog.models.len(), 1);
        let articles = &blog.models[0];
        assert_eq!(articles.name, "Articles");
        assert_eq!(articles.object_name, "Article");
        assert_eq!(articles.admin_url.as_deref(), Some("/blog/article"));
        assert_eq!(articles.add_url, None);
    }

    #[test]
    fn test_full_menu_never_fills_add_url() {
        let registry = blog_registry();
        let urls = urls();
        let principal = staff().superuser(true).build();

        let menu = MenuBuilder::new(&registry, &urls).build_menu(&principal);

        assert!(menu[0].models.iter().all(|m| m.add_url.is_none()));
        assert!(menu[0].models.iter().all(|m| m.admin_url.is_some()));
    }

    #[test]
    fn test_view_only_has_no_changelist_link() {
        let registry = blog_registry();
        let urls = urls();
        let principal = staff().permission("blog.view_comment").build();

        let menu = MenuBuilder::new(&registry, &urls).build_menu(&principal);

        let comments = &menu[0].models[0];
        assert_eq!(comments.name, "Comments");
        assert!(comments.perms.view);
        assert_eq!(comments.admin_url, None);
    }

    #[test]
    fn test_module_denial_is_silent() {
        let mut builder = RegistryBuilder::new(catalog());
        builder
            .register(EntityType::new("shop", "order", "order"), Arc::new(LockedAdmin))
            .unwrap()
            .register(EntityType::new("blog", "article", "article"), Arc::new(DefaultModelAdmin))
            .unwrap();
        let registry = builder.build();
        let urls = urls();

        let menu = MenuBuilder::new(&registry, &urls).build_menu(&staff().superuser(true).build());

        let labels: Vec<_> = menu.iter().map(|app| app.app_label.as_str()).collect();
        assert_eq!(labels, ["blog"]);
    }

    #[test]
    fn test_module_access_without_perms_shows_nothing() {
        let mut builder = RegistryBuilder::new(catalog());
        builder
            .register(
                EntityType::new("shop", "order", "order"),
                Arc::new(FixedAdmin(PermissionSet::default())),
            )
            .unwrap();
        let registry = builder.build();
        let urls = urls();

        let menu = MenuBuilder::new(&registry, &urls).build_menu(&staff().build());
        assert!(menu.is_empty());
    }

    #[test]
    fn test_unresolvable_changelist_keeps_summary() {
        let mut builder = RegistryBuilder::new(catalog());
        builder
            .register(
                EntityType::new("shop", "refund", "refund"),
                Arc::new(FixedAdmin(PermissionSet::all())),
            )
            .unwrap();
        let registry = builder.build();
        let urls = urls();

        let menu = MenuBuilder::new(&registry, &urls).build_menu(&staff().build());

        let refunds = &menu[0].models[0];
        assert_eq!(refunds.name, "Refunds");
        assert_eq!(refunds.admin_url, None);
    }

    #[test]
    fn test_missing_app_list_route_leaves_app_url_empty() {
        let registry = blog_registry();
        let urls = UrlTable::builder()
            .route("admin:blog_article_changelist", "/blog/article")
            .build();

        let menu = MenuBuilder::new(&registry, &urls).build_menu(&staff().superuser(true).build());

        assert_eq!(menu[0].app_url, None);
        assert_eq!(menu[0].models[0].admin_url.as_deref(), Some("/blog/article"));
    }

    #[test]
    fn test_groups_sort_case_insensitively_models_case_sensitively() {
        let all = || Arc::new(FixedAdmin(PermissionSet::all())) as Arc<dyn ModelAdmin>;
        let mut builder = RegistryBuilder::new(catalog());
        builder
            .register(EntityType::new("zoo", "keeper", "keeper"), all())
            .unwrap()
            .register(EntityType::new("ab", "first", "x").with_verbose_name_plural("Aa things"), all())
            .unwrap()
            .register(EntityType::new("ab", "second", "x").with_verbose_name_plural("AB things"), all())
            .unwrap()
            .register(EntityType::new("aa", "third", "x").with_verbose_name_plural("things"), all())
            .unwrap()
            .register(EntityType::new("blog", "post", "post"), all())
            .unwrap();
        let registry = builder.build();
        let urls = urls();

        let menu = MenuBuilder::new(&registry, &urls).build_menu(&staff().build());

        let groups: Vec<_> = menu.iter().map(|app| app.name.as_str()).collect();
        assert_eq!(groups, ["Aa group", "AB group", "Blog", "zoo keeping"]);

        let ab = menu.iter().find(|app| app.app_label == "ab").unwrap();
        let models: Vec<_> = ab.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(models, ["AB things", "Aa things"]);
    }

    #[test]
    fn test_every_listed_entry_is_actionable() {
        let mut builder = RegistryBuilder::new(catalog());
        builder
            .register(EntityType::new("blog", "article", "article"), Arc::new(DefaultModelAdmin))
            .unwrap()
            .register(EntityType::new("blog", "comment", "comment"), Arc::new(DefaultModelAdmin))
            .unwrap()
            .register(EntityType::new("shop", "order", "order"), Arc::new(DefaultModelAdmin))
            .unwrap()
            .register(
                EntityType::new("zoo", "keeper", "keeper"),
                Arc::new(FixedAdmin(PermissionSet::default())),
            )
            .unwrap();
        let registry = builder.build();
        let urls = urls();
        let principal = staff()
            .permissions(["blog.delete_comment", "shop.view_order"])
            .build();

        let menu = MenuBuilder::new(&registry, &urls).build_menu(&principal);

        assert_eq!(menu.len(), 2);
        for app in &menu {
            assert!(!app.models.is_empty());
            assert!(app.models.iter().all(|m| m.perms.any()));
        }
    }

    #[test]
    fn test_app_index_unknown_group() {
        let registry = blog_registry();
        let urls = urls();
        let result = MenuBuilder::new(&registry, &urls)
            .build_app_index(&staff().superuser(true).build(), "nonexistent");
        assert_eq!(result, Err(MenuError::GroupNotRegistered("nonexistent".to_owned())));
    }

    #[test]
    fn test_app_index_access_denied() {
        let mut builder = RegistryBuilder::new(catalog());
        builder
            .register(EntityType::new("shop", "order", "order"), Arc::new(DefaultModelAdmin))
            .unwrap();
        let registry = builder.build();
        let urls = urls();
        let principal = staff().permission("blog.view_article").build();

        let result = MenuBuilder::new(&registry, &urls).build_app_index(&principal, "shop");

        assert_eq!(result, Err(MenuError::AccessDenied(EntityKey::new("shop", "order"))));
    }

    #[test]
    fn test_app_index_group_without_entities() {
        let registry = blog_registry();
        let urls = urls();
        let result = MenuBuilder::new(&registry, &urls)
            .build_app_index(&staff().superuser(true).build(), "shop");
        assert_eq!(result, Err(MenuError::PageNotFound("shop".to_owned())));
    }

    #[test]
    fn test_app_index_all_entities_without_perms() {
        let mut builder = RegistryBuilder::new(catalog());
        builder
            .register(
                EntityType::new("shop", "order", "order"),
                Arc::new(FixedAdmin(PermissionSet::default())),
            )
            .unwrap();
        let registry = builder.build();
        let urls = urls();

        let result = MenuBuilder::new(&registry, &urls).build_app_index(&staff().build(), "shop");
        assert_eq!(result, Err(MenuError::PageNotFound("shop".to_owned())));
    }

    #[test]
    fn test_app_index_resolves_add_links() {
        let registry = blog_registry();
        let urls = urls();
        let principal = staff()
            .permissions([
                Action::Add.codename("blog", "article"),
                Action::Change.codename("blog", "article"),
                Action::Add.codename("blog", "comment"),
            ])
            .build();

        let app = MenuBuilder::new(&registry, &urls)
            .build_app_index(&principal, "blog")
            .unwrap();

        assert_eq!(app.name, "Blog");
        assert_eq!(app.app_url, None);
        let articles = &app.models[0];
        assert_eq!(articles.admin_url.as_deref(), Some("/blog/article"));
        assert_eq!(articles.add_url.as_deref(), Some("/blog/article/add"));
        let comments = &app.models[1];
        assert_eq!(comments.name, "Comments");
        assert_eq!(comments.admin_url, None);
        assert_eq!(comments.add_url.as_deref(), Some("/blog/comment/add"));
    }

    #[test]
    fn test_app_index_is_idempotent() {
        let registry = blog_registry();
        let urls = urls();
        let principal = staff().superuser(true).build();
        let builder = MenuBuilder::new(&registry, &urls);

        assert_eq!(
            builder.build_app_index(&principal, "blog"),
            builder.build_app_index(&principal, "blog")
        );
    }

    #[test]
    fn test_menu_serializes_for_templates() {
        let registry = blog_registry();
        let urls = urls();
        let menu = MenuBuilder::new(&registry, &urls)
            .build_menu(&staff().permission("blog.change_article").build());

        let json = serde_json::to_value(&menu).unwrap();
        assert_eq!(json[0]["models"][0]["admin_url"], "/blog/article");
        assert_eq!(json[0]["models"][0]["perms"]["change"], true);
        assert!(json[0]["models"][0]["add_url"].is_null());
    }
}
