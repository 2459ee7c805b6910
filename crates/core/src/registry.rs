//! Entity registry and the per-entity permission oracle.
//!
//! The registry pairs each [`EntityType`] with the [`ModelAdmin`] that answers
//! permission questions about it. It is populated once at startup through a
//! [`RegistryBuilder`] and is read-only afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::permissions::{Action, PermissionSet, Principal};
use crate::text::capfirst;

/// Errors raised while populating a [`Registry`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The same `(app_label, model_name)` was registered twice.
    #[error("entity {0} is already registered")]
    AlreadyRegistered(EntityKey),

    /// The entity's group has no entry in the group catalog.
    #[error("entity {entity} belongs to unknown group '{app_label}'")]
    UnknownGroup { entity: EntityKey, app_label: String },
}

/// Identifies an entity type: its group plus its name within the group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityKey {
    pub app_label: String,
    pub model_name: String,
}

impl EntityKey {
    #[must_use]
    pub fn new(app_label: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            app_label: app_label.into(),
            model_name: model_name.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label, self.model_name)
    }
}

/// A data model exposed through the admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityType {
    key: EntityKey,
    object_name: String,
    verbose_name: String,
    verbose_name_plural: String,
}

impl EntityType {
    /// Create an entity type.
    ///
    /// `model_name` is lowercased. The object name defaults to the capitalized
    /// model name and the plural display name to `verbose_name` plus `s`.
    #[must_use]
    pub fn new(
        app_label: impl Into<String>,
        model_name: impl Into<String>,
        verbose_name: impl Into<String>,
    ) -> Self {
        let model_name = model_name.into().to_lowercase();
        let verbose_name = verbose_name.into();
        Self {
            object_name: capfirst(&model_name),
            verbose_name_plural: format!("{verbose_name}s"),
            verbose_name,
            key: EntityKey::new(app_label, model_name),
        }
    }

    #[must_use]
    pub fn with_object_name(mut self, object_name: impl Into<String>) -> Self {
        self.object_name = object_name.into();
        self
    }

    #[must_use]
    pub fn with_verbose_name_plural(mut self, plural: impl Into<String>) -> Self {
        self.verbose_name_plural = plural.into();
        self
    }

    #[must_use]
    pub const fn key(&self) -> &EntityKey {
        &self.key
    }

    #[must_use]
    pub fn app_label(&self) -> &str {
        &self.key.app_label
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.key.model_name
    }

    #[must_use]
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    #[must_use]
    pub fn verbose_name(&self) -> &str {
        &self.verbose_name
    }

    #[must_use]
    pub fn verbose_name_plural(&self) -> &str {
        &self.verbose_name_plural
    }

    /// Permission codename for `action` on this entity type.
    #[must_use]
    pub fn codename(&self, action: Action) -> String {
        action.codename(self.app_label(), self.model_name())
    }
}

/// Human-readable configuration for one entity group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupConfig {
    pub label: String,
    pub verbose_name: String,
}

impl GroupConfig {
    #[must_use]
    pub fn new(label: impl Into<String>, verbose_name: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            verbose_name: verbose_name.into(),
        }
    }
}

/// Every entity group the site knows about, keyed by label.
#[derive(Debug, Clone, Default)]
pub struct GroupCatalog {
    groups: HashMap<String, GroupConfig>,
}

impl GroupCatalog {
    #[must_use]
    pub fn from_configs(configs: impl IntoIterator<Item = GroupConfig>) -> Self {
        Self {
            groups: configs
                .into_iter()
                .map(|config| (config.label.clone(), config))
                .collect(),
        }
    }

    /// Add or replace a group.
    pub fn insert(&mut self, config: GroupConfig) {
        self.groups.insert(config.label.clone(), config);
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<&GroupConfig> {
        self.groups.get(label)
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.groups.contains_key(label)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Per-entity routes an admin can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteAction {
    Changelist,
    Add,
}

impl RouteAction {
    /// Suffix used in route names: `admin:{app}_{model}_{suffix}`.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Changelist => "changelist",
            Self::Add => "add",
        }
    }
}

/// Permission oracle bound to one registered entity type.
///
/// Every method has a default following the codename convention, so a plain
/// `impl ModelAdmin for MyAdmin {}` behaves like [`DefaultModelAdmin`].
pub trait ModelAdmin: Send + Sync {
    /// Whether `principal` may see the entity's group at all.
    fn has_module_permission(&self, principal: &Principal, entity: &EntityType) -> bool {
        principal.has_module_perms(entity.app_label())
    }

    /// View is also implied by change.
    fn has_view_permission(&self, principal: &Principal, entity: &EntityType) -> bool {
        principal.has_perm(&entity.codename(Action::View))
            || principal.has_perm(&entity.codename(Action::Change))
    }

    fn has_add_permission(&self, principal: &Principal, entity: &EntityType) -> bool {
        principal.has_perm(&entity.codename(Action::Add))
    }

    fn has_change_permission(&self, principal: &Principal, entity: &EntityType) -> bool {
        principal.has_perm(&entity.codename(Action::Change))
    }

    fn has_delete_permission(&self, principal: &Principal, entity: &EntityType) -> bool {
        principal.has_perm(&entity.codename(Action::Delete))
    }

    /// All four action permissions for `principal` on `entity`.
    fn get_model_perms(&self, principal: &Principal, entity: &EntityType) -> PermissionSet {
        PermissionSet {
            add: self.has_add_permission(principal, entity),
            change: self.has_change_permission(principal, entity),
            delete: self.has_delete_permission(principal, entity),
            view: self.has_view_permission(principal, entity),
        }
    }

    /// Routes this admin serves. Only list actions whose handlers are
    /// mounted: routes not listed are never registered, so reversing them
    /// fails and the corresponding menu link is left out.
    fn route_actions(&self) -> &'static [RouteAction] {
        &[]
    }
}

/// Admin with every default behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultModelAdmin;

impl ModelAdmin for DefaultModelAdmin {}

/// One `(EntityType, ModelAdmin)` pair.
#[derive(Clone)]
pub struct RegistryEntry {
    pub entity: EntityType,
    pub admin: Arc<dyn ModelAdmin>,
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}

/// Immutable catalog of registered entity types, in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    catalog: GroupCatalog,
    entries: Vec<RegistryEntry>,
    index: HashMap<EntityKey, usize>,
}

impl Registry {
    #[must_use]
    pub const fn catalog(&self) -> &GroupCatalog {
        &self.catalog
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    /// Entries whose group is `app_label`, in registration order.
    pub fn entries_for<'a>(&'a self, app_label: &'a str) -> impl Iterator<Item = &'a RegistryEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.entity.app_label() == app_label)
    }

    #[must_use]
    pub fn get(&self, key: &EntityKey) -> Option<&RegistryEntry> {
        self.index.get(key).and_then(|&i| self.entries.get(i))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Append-only builder for a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new(catalog: GroupCatalog) -> Self {
        Self {
            registry: Registry {
                catalog,
                ..Registry::default()
            },
        }
    }

    /// Register `entity` with its admin.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownGroup`] if the entity's group is not in
    /// the catalog, or [`RegistryError::AlreadyRegistered`] on a duplicate key.
    pub fn register(
        &mut self,
        entity: EntityType,
        admin: Arc<dyn ModelAdmin>,
    ) -> Result<&mut Self, RegistryError> {
        let key = entity.key().clone();
        if !self.registry.catalog.contains(&key.app_label) {
            return Err(RegistryError::UnknownGroup {
                app_label: key.app_label.clone(),
                entity: key,
            });
        }
        if self.registry.index.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered(key));
        }

        tracing::debug!(entity = %key, "registered admin entity");
        self.registry.index.insert(key, self.registry.entries.len());
        self.registry.entries.push(RegistryEntry { entity, admin });
        Ok(self)
    }

    #[must_use]
    pub fn build(self) -> Registry {
        self.registry
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn catalog() -> GroupCatalog {
        GroupCatalog::from_configs([GroupConfig::new("blog", "Blog")])
    }

    #[test]
    fn test_entity_type_defaults() {
        let entity = EntityType::new("blog", "BlogPost", "blog post");
        assert_eq!(entity.model_name(), "blogpost");
        assert_eq!(entity.object_name(), "Blogpost");
        assert_eq!(entity.verbose_name_plural(), "blog posts");
        assert_eq!(entity.codename(Action::Add), "blog.add_blogpost");
    }

    #[test]
    fn test_register_preserves_order_and_indexes() {
        let mut builder = RegistryBuilder::new(catalog());
        builder
            .register(EntityType::new("blog", "post", "post"), Arc::new(DefaultModelAdmin))
            .unwrap()
            .register(EntityType::new("blog", "author", "author"), Arc::new(DefaultModelAdmin))
            .unwrap();
        let registry = builder.build();

        let names: Vec<_> = registry.iter().map(|e| e.entity.model_name()).collect();
        assert_eq!(names, ["post", "author"]);
        assert!(registry.get(&EntityKey::new("blog", "author")).is_some());
        assert_eq!(registry.entries_for("blog").count(), 2);
        assert_eq!(registry.entries_for("shop").count(), 0);
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut builder = RegistryBuilder::new(catalog());
        builder
            .register(EntityType::new("blog", "post", "post"), Arc::new(DefaultModelAdmin))
            .unwrap();
        let err = builder
            .register(EntityType::new("blog", "Post", "entry"), Arc::new(DefaultModelAdmin))
            .unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered(EntityKey::new("blog", "post")));
    }

    #[test]
    fn test_register_rejects_unknown_group() {
        let mut builder = RegistryBuilder::new(catalog());
        let err = builder
            .register(EntityType::new("shop", "order", "order"), Arc::new(DefaultModelAdmin))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownGroup { ref app_label, .. } if app_label == "shop"));
    }

    #[test]
    fn test_default_admin_perms() {
        let entity = EntityType::new("blog", "post", "post");
        let editor = Principal::builder().permission("blog.change_post").build();
        let perms = DefaultModelAdmin.get_model_perms(&editor, &entity);
        assert_eq!(
            perms,
            PermissionSet {
                add: false,
                change: true,
                delete: false,
                view: true,
            }
        );
        assert!(DefaultModelAdmin.has_module_permission(&editor, &entity));
    }

    #[test]
    fn test_default_admin_exposes_no_routes() {
        assert!(DefaultModelAdmin.route_actions().is_empty());
    }
}
