//! Interaction Adapter
//!
//! Translates UI events into engine operations and engine change sets into
//! render patches. It holds no state; anything it cannot resolve (no
//! navigation on the page, unknown node) produces an empty outcome.

use serde::{Deserialize, Serialize};

use crate::engine::ChangeSet;
use crate::state::NavigationState;
use crate::tree::{NavTree, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UiEvent {
    /// Click on an entry's own link.
    LinkClick { node: NodeId },
    /// Click on an entry's disclosure control.
    ToggleClick { node: NodeId },
    /// Key press while the disclosure control has focus.
    ToggleKey { node: NodeId, key: String },
    SidebarToggle,
    Resize,
}

/// One visual flag the rendering layer must apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    pub node: NodeId,
    pub key: Option<String>,
    pub expanded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOutcome {
    pub prevent_default: bool,
    pub stop_propagation: bool,
    pub patches: Vec<NodePatch>,
    /// New sidebar state, when the event changed it.
    pub sidebar_collapsed: Option<bool>,
}

impl EventOutcome {
    /// The browser does its default thing; nothing changes.
    pub fn navigate() -> Self {
        Self::default()
    }

    pub fn allows_navigation(&self) -> bool {
        !self.prevent_default
    }
}

fn is_activation_key(key: &str) -> bool {
    matches!(key, "Enter" | " " | "Space" | "Spacebar")
}

pub fn patches_for(tree: &NavTree, changes: &ChangeSet) -> Vec<NodePatch> {
    changes
        .changed
        .iter()
        .filter_map(|id| tree.get(*id))
        .map(|node| NodePatch {
            node: node.id,
            key: node.key.as_ref().map(|k| k.as_str().to_string()),
            expanded: node.expanded,
        })
        .collect()
}

/// Patches for every expandable node, for the first paint after `init`.
pub fn initial_patches(state: &NavigationState) -> Vec<NodePatch> {
    let Some(tree) = state.tree() else {
        return Vec::new();
    };
    let all = ChangeSet {
        changed: tree
            .iter()
            .filter(|n| n.is_expandable())
            .map(|n| n.id)
            .collect(),
    };
    patches_for(tree, &all)
}

fn node_state(state: &NavigationState, id: NodeId) -> Option<(bool, bool)> {
    let node = state.tree()?.get(id)?;
    Some((node.is_expandable(), node.expanded))
}

fn run_toggle(state: &mut NavigationState, id: NodeId) -> Vec<NodePatch> {
    let Some(changes) = state.engine().map(|mut engine| engine.toggle(id)) else {
        return Vec::new();
    };
    state
        .tree()
        .map(|tree| patches_for(tree, &changes))
        .unwrap_or_default()
}

pub fn dispatch(state: &mut NavigationState, event: &UiEvent) -> EventOutcome {
    match event {
        UiEvent::LinkClick { node } => match node_state(state, *node) {
            // Collapsed parent: the click opens it instead of navigating.
            Some((true, false)) => EventOutcome {
                prevent_default: true,
                stop_propagation: false,
                patches: run_toggle(state, *node),
                sidebar_collapsed: None,
            },
            _ => EventOutcome::navigate(),
        },

        UiEvent::ToggleClick { node } => {
            if node_state(state, *node).is_none() {
                return EventOutcome::default();
            }
            EventOutcome {
                prevent_default: true,
                stop_propagation: true,
                patches: run_toggle(state, *node),
                sidebar_collapsed: None,
            }
        }

        UiEvent::ToggleKey { node, key } => {
            if !is_activation_key(key) {
                return EventOutcome::default();
            }
            dispatch(state, &UiEvent::ToggleClick { node: *node })
        }

        UiEvent::SidebarToggle => match state.sidebar_mut() {
            Some(sidebar) => EventOutcome {
                sidebar_collapsed: Some(sidebar.toggle()),
                ..EventOutcome::default()
            },
            None => EventOutcome::default(),
        },

        UiEvent::Resize => {
            let Some(active) = state.active_page().cloned() else {
                return EventOutcome::default();
            };
            if !state.config().policy.force_active_path_expansion {
                return EventOutcome::default();
            }
            let changes = state
                .engine()
                .map(|mut engine| engine.expand_ancestor_chain(&active))
                .unwrap_or_default();
            EventOutcome {
                patches: state
                    .tree()
                    .map(|tree| patches_for(tree, &changes))
                    .unwrap_or_default(),
                ..EventOutcome::default()
            }
        }
    }
}
