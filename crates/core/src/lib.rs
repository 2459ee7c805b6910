//! LTE Admin Core - entity registry, permissions and menu building.
//!
//! This crate holds the parts of the admin site that do not touch the network
//! or the database:
//! - [`registry`] - entity types, the group catalog and the [`ModelAdmin`] trait
//! - [`permissions`] - principals, actions and per-entity [`PermissionSet`]s
//! - [`urls`] - named route table used to reverse admin locations
//! - [`menu`] - the permission-filtered, sorted site menu and group index
//! - [`types`] - typed IDs and email addresses
//!
//! # Architecture
//!
//! Everything here is synchronous and request-scoped. The registry, group
//! catalog and route table are built once at startup and shared read-only;
//! menus and permission sets are rebuilt on every call.
//!
//! ```
//! use std::sync::Arc;
//!
//! use lte_admin_core::{
//!     DefaultModelAdmin, EntityType, GroupCatalog, GroupConfig, MenuBuilder, Principal,
//!     RegistryBuilder, UrlTableBuilder,
//! };
//!
//! let catalog = GroupCatalog::from_configs([GroupConfig::new("blog", "Blog")]);
//! let mut builder = RegistryBuilder::new(catalog);
//! builder
//!     .register(EntityType::new("blog", "article", "Article"), Arc::new(DefaultModelAdmin))
//!     .unwrap();
//! let registry = builder.build();
//! let urls = UrlTableBuilder::new()
//!     .route("admin:app_list", "/{app_label}")
//!     .route("admin:blog_article_changelist", "/blog/article")
//!     .build();
//!
//! let principal = Principal::builder()
//!     .staff(true)
//!     .permission("blog.change_article")
//!     .build();
//!
//! let menu = MenuBuilder::new(&registry, &urls).build_menu(&principal);
//! assert_eq!(menu.len(), 1);
//! assert_eq!(menu[0].models[0].name, "Articles");
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod menu;
pub mod permissions;
pub mod registry;
pub mod text;
pub mod types;
pub mod urls;

pub use menu::{AppSummary, MenuBuilder, MenuError, MenuTree, ModelSummary};
pub use permissions::{Action, PermissionSet, Principal, PrincipalBuilder};
pub use registry::{
    DefaultModelAdmin, EntityKey, EntityType, GroupCatalog, GroupConfig, ModelAdmin, Registry,
    RegistryBuilder, RegistryEntry, RegistryError, RouteAction,
};
pub use types::*;
pub use urls::{LocationResolver, ReverseError, UrlTable, UrlTableBuilder, route_names};
