//! Navigation State
//!
//! The one object a page holds for its whole lifetime. `init` runs the full
//! initialization sequence synchronously, so no event can be dispatched
//! against a half-reconciled tree: there is no way to get a `NavigationState`
//! except through `init`.

use std::rc::Rc;

use serde::Serialize;

use crate::config::ThemeConfig;
use crate::engine::{ExpansionEngine, InitReport};
use crate::markup::{read_page, PageMarkup};
use crate::path::CanonicalPath;
use crate::sidebar::SidebarState;
use crate::storage::Storage;
use crate::store::PersistedSetStore;
use crate::tree::{NavTree, NodeId};

struct Navigation {
    tree: NavTree,
    store: PersistedSetStore,
}

pub struct NavigationState {
    config: ThemeConfig,
    navigation: Option<Navigation>,
    sidebar: Option<SidebarState>,
    active_page: Option<CanonicalPath>,
    report: InitReport,
}

impl NavigationState {
    /// Reconcile a page whose markup has already been read.
    pub fn init(
        config: ThemeConfig,
        storage: Rc<dyn Storage>,
        page: PageMarkup,
        active_path: Option<&str>,
    ) -> Self {
        let active_page = active_path.map(CanonicalPath::new);

        let sidebar = if page.sidebar.is_present() {
            Some(SidebarState::load(
                Rc::clone(&storage),
                &config.sidebar_storage_key,
            ))
        } else {
            log::debug!("[ThemeNative] No site container, sidebar toggle inert");
            None
        };

        let mut report = InitReport::default();
        let navigation = page.navigation.map(|mut tree| {
            let mut store = PersistedSetStore::load(Rc::clone(&storage), &config.storage_key);
            report = ExpansionEngine::new(&mut tree, &mut store, &config.policy)
                .initialize(active_page.as_ref());
            Navigation { tree, store }
        });

        Self {
            config,
            navigation,
            sidebar,
            active_page,
            report,
        }
    }

    /// Read the rendered page and reconcile it.
    pub fn from_html(
        config: ThemeConfig,
        storage: Rc<dyn Storage>,
        html: &str,
        active_path: Option<&str>,
    ) -> Self {
        let page = read_page(html, &config.markup);
        Self::init(config, storage, page, active_path)
    }

    /// Reconcile a hand-built tree. Sidebar is inert.
    pub fn with_tree(
        config: ThemeConfig,
        storage: Rc<dyn Storage>,
        tree: NavTree,
        active_path: Option<&str>,
    ) -> Self {
        let page = PageMarkup {
            navigation: Some(tree),
            ..PageMarkup::default()
        };
        Self::init(config, storage, page, active_path)
    }

    pub fn config(&self) -> &ThemeConfig {
        &self.config
    }

    pub fn active_page(&self) -> Option<&CanonicalPath> {
        self.active_page.as_ref()
    }

    pub fn report(&self) -> &InitReport {
        &self.report
    }

    pub fn tree(&self) -> Option<&NavTree> {
        self.navigation.as_ref().map(|n| &n.tree)
    }

    pub fn persisted(&self) -> Option<&PersistedSetStore> {
        self.navigation.as_ref().map(|n| &n.store)
    }

    pub fn sidebar(&self) -> Option<&SidebarState> {
        self.sidebar.as_ref()
    }

    pub(crate) fn sidebar_mut(&mut self) -> Option<&mut SidebarState> {
        self.sidebar.as_mut()
    }

    /// Engine bound to this page's tree, persisted set and policy.
    /// `None` when the page has no navigation.
    pub fn engine(&mut self) -> Option<ExpansionEngine<'_>> {
        let policy = &self.config.policy;
        self.navigation
            .as_mut()
            .map(|n| ExpansionEngine::new(&mut n.tree, &mut n.store, policy))
    }

    pub fn resolve(&self, path: &str) -> Option<NodeId> {
        self.tree()?.find_by_key(CanonicalPath::new(path).as_str())
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        match (self.tree(), self.resolve(path)) {
            (Some(tree), Some(id)) => tree.is_expanded(id),
            _ => false,
        }
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        let nodes = self
            .tree()
            .map(|tree| {
                tree.iter()
                    .map(|node| NodeSnapshot {
                        id: node.id,
                        key: node.key.as_ref().map(|k| k.as_str().to_string()),
                        label: node.label.clone(),
                        parent: node.parent,
                        depth: node.depth,
                        has_children: node.has_children(),
                        expanded: node.expanded,
                    })
                    .collect()
            })
            .unwrap_or_default();

        NavigationSnapshot {
            navigation_present: self.navigation.is_some(),
            active_node: self.report.active_node,
            home_override: self.report.home_override,
            nodes,
            persisted: self.persisted().map(|s| s.to_vec()).unwrap_or_default(),
            sidebar_collapsed: self.sidebar.as_ref().map(SidebarState::is_collapsed),
        }
    }
}

/// Everything the rendering layer needs for the first paint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationSnapshot {
    pub navigation_present: bool,
    pub active_node: Option<NodeId>,
    pub home_override: bool,
    pub nodes: Vec<NodeSnapshot>,
    pub persisted: Vec<String>,
    pub sidebar_collapsed: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub key: Option<String>,
    pub label: String,
    pub parent: Option<NodeId>,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
}
