//! # Theme Native: navigation state for the documentation theme
//!
//! ## Navigation Invariants
//!
//! 1. **Canonical Keys**: a navigation entry is identified by its link target with one
//!    trailing `/` stripped (empty → `/`). Entries without a navigable target have no key
//!    and are never persisted.
//!
//! 2. **Persisted Set**: the only durable navigation state is the set of expanded keys,
//!    stored as a JSON array under one storage key. Malformed values read as empty.
//!    Every mutation rewrites the whole value immediately.
//!
//! 3. **Initialization Order**: collapse everything → apply the persisted set → force
//!    the active page's ancestor chain open. The home override skips the last two.
//!    Initialization completes before any event can be dispatched.
//!
//! 4. **Ancestor Consistency**: no entry is expanded while an ancestor is collapsed.
//!
//! 5. **Inert Features**: a page without navigation markup or without the site
//!    container simply has no such feature. Nothing here fails a page.
//!
//! ## Policies
//!
//! - `ExpansionPolicy::path_restoration()` (default): toggles affect one entry; the
//!   active chain is always opened.
//! - `ExpansionPolicy::single_level()`: collapsing cascades to descendants and forgets
//!   them; nested entries never stay open across page loads.

mod bridge;
mod config;
mod engine;
mod error;
mod interaction;
mod markup;
mod path;
mod sidebar;
mod state;
mod storage;
mod store;
mod tree;

#[cfg(test)]
mod engine_tests;

pub use bridge::{
    config_from_json, reconcile_page, storage_from_json, DispatchResponse, PageSession,
    ReconcileResponse,
};
pub use config::{
    ExpansionPolicy, MarkupContract, ThemeConfig, DEFAULT_NAV_STORAGE_KEY,
    DEFAULT_SIDEBAR_STORAGE_KEY,
};
pub use engine::{ancestors_consistent, ChangeSet, ExpansionEngine, InitReport};
pub use error::{Result, ThemeError};
pub use interaction::{dispatch, initial_patches, patches_for, EventOutcome, NodePatch, UiEvent};
pub use markup::{is_navigable_href, read_navigation, read_page, PageMarkup, SidebarMarkup};
pub use path::{normalize, CanonicalPath, ROOT_PATH};
pub use sidebar::SidebarState;
pub use state::{NavigationSnapshot, NavigationState, NodeSnapshot};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{parse_persisted, PersistedSetStore};
pub use tree::{Ancestors, NavNode, NavTree, NavTreeBuilder, NodeId};

#[cfg(feature = "napi")]
pub use bridge::{
    load_expansion_set_native, normalize_path_native, reconcile_navigation_native,
    NavigationSession,
};
