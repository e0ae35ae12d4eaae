//! Tree Node Model
//!
//! An arena of navigation entries built once per page load. Parent links are
//! plain indices, so structural queries never go back to the rendered markup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::path::{normalize, CanonicalPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct NavNode {
    pub id: NodeId,
    pub key: Option<CanonicalPath>,
    pub label: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub depth: usize,
    /// Whether the markup rendered a disclosure control for this entry.
    pub has_toggle: bool,
    pub expanded: bool,
    /// Held open by the active page's ancestor chain, not by the persisted set.
    pub forced: bool,
}

impl NavNode {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Only entries with children have anything to reveal.
    pub fn is_expandable(&self) -> bool {
        self.has_children()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NavTree {
    nodes: Vec<NavNode>,
    roots: Vec<NodeId>,
    by_key: HashMap<CanonicalPath, Vec<NodeId>>,
}

impl NavTree {
    pub fn builder() -> NavTreeBuilder {
        NavTreeBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> Option<&NavNode> {
        self.nodes.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut NavNode> {
        self.nodes.get_mut(id.0)
    }

    /// All nodes in document order.
    pub fn iter(&self) -> impl Iterator<Item = &NavNode> {
        self.nodes.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.get(id).map(|n| n.expanded).unwrap_or(false)
    }

    pub fn is_forced(&self, id: NodeId) -> bool {
        self.get(id).map(|n| n.forced).unwrap_or(false)
    }

    pub fn key(&self, id: NodeId) -> Option<&CanonicalPath> {
        self.get(id).and_then(|n| n.key.as_ref())
    }

    /// Every node whose key equals `key`, in document order.
    pub fn nodes_with_key(&self, key: &str) -> &[NodeId] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolve a key to a single node. When several entries share a key the
    /// last one in document order wins.
    pub fn find_by_key(&self, key: &str) -> Option<NodeId> {
        self.nodes_with_key(key).last().copied()
    }

    /// Parent chain from the direct parent up to a root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.get(id).and_then(|n| n.parent),
        }
    }

    /// Every descendant, depth-first in document order. Excludes `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.get(id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(node) = self.get(next) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.get(id).map(|n| n.depth).unwrap_or(0)
    }

    /// True iff every ancestor of `id` is expanded.
    pub fn is_revealed(&self, id: NodeId) -> bool {
        self.ancestors(id).all(|a| self.is_expanded(a))
    }

    /// Snapshot of the expanded flags, indexed by node.
    pub fn expanded_flags(&self) -> Vec<bool> {
        self.nodes.iter().map(|n| n.expanded).collect()
    }
}

pub struct Ancestors<'a> {
    tree: &'a NavTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.get(current).and_then(|n| n.parent);
        Some(current)
    }
}

/// Incremental construction in document order.
///
/// Nodes are opened as the walk enters an entry; the link target and label can
/// be attached later since the link usually appears after the entry opens.
#[derive(Debug, Default)]
pub struct NavTreeBuilder {
    pending: Vec<PendingNode>,
}

#[derive(Debug, Default)]
struct PendingNode {
    parent: Option<NodeId>,
    href: Option<String>,
    label: String,
    has_toggle: bool,
}

impl NavTreeBuilder {
    pub fn add_node(&mut self, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.pending.len());
        self.pending.push(PendingNode {
            parent: parent.filter(|p| p.0 < id.0),
            ..PendingNode::default()
        });
        id
    }

    /// Convenience for hand-built trees.
    pub fn add(&mut self, parent: Option<NodeId>, href: Option<&str>, label: &str) -> NodeId {
        let id = self.add_node(parent);
        if let Some(href) = href {
            self.set_href(id, href);
        }
        self.set_label(id, label);
        id
    }

    pub fn has_href(&self, id: NodeId) -> bool {
        self.pending
            .get(id.0)
            .map(|p| p.href.is_some())
            .unwrap_or(false)
    }

    pub fn set_href(&mut self, id: NodeId, href: &str) {
        if let Some(node) = self.pending.get_mut(id.0) {
            node.href = Some(href.to_string());
        }
    }

    pub fn set_label(&mut self, id: NodeId, label: &str) {
        if let Some(node) = self.pending.get_mut(id.0) {
            node.label = label.to_string();
        }
    }

    pub fn mark_toggle(&mut self, id: NodeId) {
        if let Some(node) = self.pending.get_mut(id.0) {
            node.has_toggle = true;
        }
    }

    pub fn build(self) -> NavTree {
        let mut tree = NavTree::default();

        for (index, pending) in self.pending.into_iter().enumerate() {
            let id = NodeId(index);
            let key = normalize(pending.href.as_deref());
            let depth = match pending.parent {
                Some(parent) => tree.nodes[parent.0].depth + 1,
                None => 0,
            };

            match pending.parent {
                Some(parent) => tree.nodes[parent.0].children.push(id),
                None => tree.roots.push(id),
            }
            if let Some(key) = &key {
                tree.by_key.entry(key.clone()).or_default().push(id);
            }

            tree.nodes.push(NavNode {
                id,
                key,
                label: pending.label.trim().to_string(),
                parent: pending.parent,
                children: Vec::new(),
                depth,
                has_toggle: pending.has_toggle,
                expanded: false,
                forced: false,
            });
        }

        tree
    }
}
