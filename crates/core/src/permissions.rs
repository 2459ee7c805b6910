//! Principals and per-entity permission sets.
//!
//! Permissions are plain codenames of the form `"{app_label}.{action}_{model_name}"`,
//! e.g. `blog.change_article`. A [`Principal`] carries the codenames it holds
//! together with the account flags the access gate looks at.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::AdminUserId;

/// An action that can be permitted on an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Add,
    Change,
    Delete,
}

impl Action {
    /// Every action, in the order permission sets list them.
    pub const ALL: [Self; 4] = [Self::Add, Self::Change, Self::Delete, Self::View];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Add => "add",
            Self::Change => "change",
            Self::Delete => "delete",
        }
    }

    /// Full permission codename for this action on `app_label.model_name`.
    #[must_use]
    pub fn codename(self, app_label: &str, model_name: &str) -> String {
        format!("{app_label}.{}_{model_name}", self.as_str())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one principal may do with one entity type.
///
/// Built per request and never cached: permissions can change between
/// requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub add: bool,
    pub change: bool,
    pub delete: bool,
    pub view: bool,
}

impl PermissionSet {
    /// A set granting every action.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            add: true,
            change: true,
            delete: true,
            view: true,
        }
    }

    #[must_use]
    pub const fn get(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Add => self.add,
            Action::Change => self.change,
            Action::Delete => self.delete,
        }
    }

    pub const fn set(&mut self, action: Action, allowed: bool) {
        match action {
            Action::View => self.view = allowed,
            Action::Add => self.add = allowed,
            Action::Change => self.change = allowed,
            Action::Delete => self.delete = allowed,
        }
    }

    /// Builder-style variant of [`set`](Self::set).
    #[must_use]
    pub const fn with(mut self, action: Action, allowed: bool) -> Self {
        self.set(action, allowed);
        self
    }

    /// True when at least one action is allowed.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.add || self.change || self.delete || self.view
    }

    /// `(action, allowed)` pairs in [`Action::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Action, bool)> + '_ {
        Action::ALL.into_iter().map(|action| (action, self.get(action)))
    }
}

/// The actor making an admin request.
///
/// Loaded fresh from storage for each request; the flags and permission
/// codenames are a snapshot for that request only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Option<AdminUserId>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    permissions: BTreeSet<String>,
}

impl Principal {
    #[must_use]
    pub fn builder() -> PrincipalBuilder {
        PrincipalBuilder::default()
    }

    /// An unauthenticated visitor: inactive, no flags, no permissions.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Whether this principal may enter the admin site at all.
    #[must_use]
    pub const fn has_site_access(&self) -> bool {
        self.is_active && self.is_staff
    }

    /// Whether the principal holds `codename` (`"app_label.action_model"`).
    ///
    /// Active superusers hold every permission; inactive principals hold none.
    #[must_use]
    pub fn has_perm(&self, codename: &str) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_superuser || self.permissions.contains(codename)
    }

    /// Whether the principal holds any permission in the `app_label` group.
    #[must_use]
    pub fn has_module_perms(&self, app_label: &str) -> bool {
        if !self.is_active {
            return false;
        }
        if self.is_superuser {
            return true;
        }
        self.permissions.iter().any(|perm| {
            perm.split_once('.')
                .is_some_and(|(label, _)| label == app_label)
        })
    }

    /// Held permission codenames, sorted.
    pub fn permissions(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(String::as_str)
    }
}

/// Builder for [`Principal`]. New principals start active.
#[derive(Debug)]
pub struct PrincipalBuilder {
    inner: Principal,
}

impl Default for PrincipalBuilder {
    fn default() -> Self {
        Self {
            inner: Principal {
                is_active: true,
                ..Principal::default()
            },
        }
    }
}

impl PrincipalBuilder {
    #[must_use]
    pub const fn id(mut self, id: AdminUserId) -> Self {
        self.inner.id = Some(id);
        self
    }

    #[must_use]
    pub const fn active(mut self, is_active: bool) -> Self {
        self.inner.is_active = is_active;
        self
    }

    #[must_use]
    pub const fn staff(mut self, is_staff: bool) -> Self {
        self.inner.is_staff = is_staff;
        self
    }

    #[must_use]
    pub const fn superuser(mut self, is_superuser: bool) -> Self {
        self.inner.is_superuser = is_superuser;
        self
    }

    #[must_use]
    pub fn permission(mut self, codename: impl Into<String>) -> Self {
        self.inner.permissions.insert(codename.into());
        self
    }

    #[must_use]
    pub fn permissions<I, S>(mut self, codenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner
            .permissions
            .extend(codenames.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn build(self) -> Principal {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codename_format() {
        assert_eq!(Action::Change.codename("blog", "article"), "blog.change_article");
        assert_eq!(Action::View.codename("shop", "order"), "shop.view_order");
    }

    #[test]
    fn test_permission_set_any() {
        assert!(!PermissionSet::default().any());
        assert!(PermissionSet::default().with(Action::Delete, true).any());
        assert!(PermissionSet::all().iter().all(|(_, allowed)| allowed));
    }

    #[test]
    fn test_site_access_requires_active_staff() {
        assert!(Principal::builder().staff(true).build().has_site_access());
        assert!(!Principal::builder().build().has_site_access());
        assert!(
            !Principal::builder()
                .staff(true)
                .active(false)
                .build()
                .has_site_access()
        );
        assert!(!Principal::anonymous().has_site_access());
    }

    #[test]
    fn test_superuser_holds_everything_while_active() {
        let root = Principal::builder().superuser(true).build();
        assert!(root.has_perm("blog.delete_article"));
        assert!(root.has_module_perms("anything"));

        let disabled = Principal::builder().superuser(true).active(false).build();
        assert!(!disabled.has_perm("blog.delete_article"));
        assert!(!disabled.has_module_perms("blog"));
    }

    #[test]
    fn test_module_perms_match_whole_label() {
        let editor = Principal::builder().permission("blog.view_article").build();
        assert!(editor.has_module_perms("blog"));
        assert!(!editor.has_module_perms("blo"));
        assert!(!editor.has_module_perms("shop"));
    }

    #[test]
    fn test_inactive_principal_has_no_permissions() {
        let user = Principal::builder()
            .active(false)
            .permission("blog.view_article")
            .build();
        assert!(!user.has_perm("blog.view_article"));
    }
}
