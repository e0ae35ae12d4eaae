//! Theme configuration.
//!
//! Every field has a default matching the shipped theme, so `{}` is a valid
//! config and the JS shim only passes what it overrides.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::path::CanonicalPath;

pub const DEFAULT_NAV_STORAGE_KEY: &str = "github-readme-theme-nav-expanded";
pub const DEFAULT_SIDEBAR_STORAGE_KEY: &str = "github-readme-theme-sidebar-collapsed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeConfig {
    pub storage_key: String,
    pub sidebar_storage_key: String,
    pub policy: ExpansionPolicy,
    pub markup: MarkupContract,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_NAV_STORAGE_KEY.to_string(),
            sidebar_storage_key: DEFAULT_SIDEBAR_STORAGE_KEY.to_string(),
            policy: ExpansionPolicy::default(),
            markup: MarkupContract::default(),
        }
    }
}

impl ThemeConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_policy(mut self, policy: ExpansionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// How expansion cascades and how the active page is revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpansionPolicy {
    /// Collapsing a node also collapses and forgets every descendant, and only
    /// top-level entries may stay expanded across page loads.
    ///
    /// Depth counts from 0 at the top level, so "nested" means `depth > 0`:
    /// the second level and below when levels are counted from 1.
    pub cascade_collapse_descendants: bool,
    /// Expand the active page's ancestor chain after persisted state is applied.
    pub force_active_path_expansion: bool,
    /// Also write the forced ancestor chain into the persisted set.
    pub persist_active_path: bool,
    /// On the home page, start with a fully collapsed tree.
    pub collapse_on_home: bool,
    pub home_path: String,
}

impl Default for ExpansionPolicy {
    fn default() -> Self {
        Self::path_restoration()
    }
}

impl ExpansionPolicy {
    pub fn path_restoration() -> Self {
        Self {
            cascade_collapse_descendants: false,
            force_active_path_expansion: true,
            persist_active_path: false,
            collapse_on_home: false,
            home_path: "/".to_string(),
        }
    }

    pub fn single_level() -> Self {
        Self {
            cascade_collapse_descendants: true,
            force_active_path_expansion: false,
            ..Self::path_restoration()
        }
    }

    pub fn with_home_override(mut self) -> Self {
        self.collapse_on_home = true;
        self
    }

    pub fn is_home(&self, active: &CanonicalPath) -> bool {
        CanonicalPath::new(&self.home_path) == *active
    }
}

/// What the markup reader looks for in the rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkupContract {
    pub container_class: String,
    pub item_tag: String,
    pub toggle_class: String,
    pub site_container_class: String,
    pub sidebar_toggle_id: String,
    pub sidebar_toggle_mobile_id: String,
}

impl Default for MarkupContract {
    fn default() -> Self {
        Self {
            container_class: "sidebar-nav".to_string(),
            item_tag: "li".to_string(),
            toggle_class: "nav-toggle".to_string(),
            site_container_class: "site-container".to_string(),
            sidebar_toggle_id: "sidebar-toggle".to_string(),
            sidebar_toggle_mobile_id: "sidebar-toggle-mobile".to_string(),
        }
    }
}
