//! # Expansion Engine
//!
//! Every expand/collapse transition goes through here. The engine borrows the
//! tree, the persisted set and the policy for the duration of one operation;
//! it owns no state of its own.
//!
//! ## Invariants
//!
//! 1. **Ancestor consistency**: a node is never expanded while any ancestor is
//!    collapsed. Collapsing hides descendants; their persisted membership is
//!    kept (unless cascading) so they reopen with their parent.
//! 2. **Persistence mirrors intent**: outside the home override and the forced
//!    active chain, a revealed expandable node is expanded iff its key is in
//!    the persisted set.
//! 3. **Leaves never expand**: an entry without children has nothing to reveal.
//! 4. **Key equivalence**: entries sharing a canonical key move together.
//! 5. **Forced chain**: entries opened only for the active page are marked
//!    `forced`. Re-expanding them does not persist them, and they reopen
//!    whenever their parent does.

use std::collections::HashSet;

use crate::config::ExpansionPolicy;
use crate::path::CanonicalPath;
use crate::store::PersistedSetStore;
use crate::tree::{NavTree, NodeId};

/// Nodes whose visual flag changed during one operation, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub changed: Vec<NodeId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.changed.contains(&id)
    }

    fn between(before: &[bool], tree: &NavTree) -> Self {
        let changed = tree
            .iter()
            .filter(|node| before.get(node.id.index()).copied() != Some(node.expanded))
            .map(|node| node.id)
            .collect();
        Self { changed }
    }
}

/// What initialization decided, for logging and for the bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub active_node: Option<NodeId>,
    pub home_override: bool,
    pub restored: usize,
    pub purged: usize,
}

pub struct ExpansionEngine<'a> {
    tree: &'a mut NavTree,
    store: &'a mut PersistedSetStore,
    policy: &'a ExpansionPolicy,
}

impl<'a> ExpansionEngine<'a> {
    pub fn new(
        tree: &'a mut NavTree,
        store: &'a mut PersistedSetStore,
        policy: &'a ExpansionPolicy,
    ) -> Self {
        Self {
            tree,
            store,
            policy,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INITIALIZATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Reconcile every flag against the persisted set and the active page.
    ///
    /// Order matters: everything is collapsed first, then persisted state is
    /// applied, then the active chain is forced open.
    pub fn initialize(&mut self, active: Option<&CanonicalPath>) -> InitReport {
        let mut report = InitReport {
            active_node: active.and_then(|a| self.tree.find_by_key(a.as_str())),
            ..InitReport::default()
        };

        // Step 1
        for id in self.tree.ids().collect::<Vec<_>>() {
            self.set_flag(id, false);
            self.set_forced(id, false);
        }

        // Step 4 short-circuits 2 and 3
        if self.policy.collapse_on_home && active.is_some_and(|a| self.policy.is_home(a)) {
            report.home_override = true;
            log::debug!("[ThemeNative] Home page: navigation starts fully collapsed");
            return report;
        }

        // Step 2
        let (restored, purged) = self.apply_persisted();
        report.restored = restored;
        report.purged = purged;
        self.enforce_ancestor_consistency();

        // Step 3
        if self.policy.force_active_path_expansion {
            if let Some(active) = active {
                self.expand_ancestor_chain(active);
            }
        }

        log::debug!(
            "[ThemeNative] Navigation reconciled: {} restored, {} purged, active {:?}",
            report.restored,
            report.purged,
            report.active_node
        );
        report
    }

    fn apply_persisted(&mut self) -> (usize, usize) {
        let cascade = self.policy.cascade_collapse_descendants;
        let mut restored = 0;
        let mut nested: Vec<CanonicalPath> = Vec::new();
        let mut top_level: HashSet<CanonicalPath> = HashSet::new();

        for id in self.tree.ids().collect::<Vec<_>>() {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            let Some(key) = node.key.clone() else {
                continue;
            };
            if !node.is_expandable() || !self.store.contains(&key) {
                continue;
            }
            if cascade && node.depth > 0 {
                nested.push(key);
                continue;
            }
            top_level.insert(key);
            self.set_flag(id, true);
            restored += 1;
        }

        // Single-level policy: nested entries never survive a page load.
        let purge: Vec<CanonicalPath> = nested
            .into_iter()
            .filter(|key| !top_level.contains(key))
            .collect();
        let purged = if purge.is_empty() {
            0
        } else {
            self.store.remove_all(purge.iter())
        };

        (restored, purged)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSITIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Flip a node. Collapsing cascades when the policy says so.
    pub fn toggle(&mut self, id: NodeId) -> ChangeSet {
        let (expandable, expanded) = match self.tree.get(id) {
            Some(node) => (node.is_expandable(), node.expanded),
            None => return ChangeSet::default(),
        };
        if !expandable {
            return ChangeSet::default();
        }
        if expanded {
            let cascade = self.policy.cascade_collapse_descendants;
            self.collapse(id, cascade)
        } else {
            self.expand(id)
        }
    }

    /// Expand a node and reveal it: collapsed ancestors are opened and
    /// persisted too, and descendants remembered as expanded reopen.
    pub fn expand(&mut self, id: NodeId) -> ChangeSet {
        let before = self.tree.expanded_flags();
        let Some(node) = self.tree.get(id) else {
            return ChangeSet::default();
        };
        if !node.is_expandable() {
            return ChangeSet::default();
        }

        // Root first, so parents are open before their children are checked.
        let mut chain: Vec<NodeId> = std::iter::once(id)
            .chain(self.tree.ancestors(id))
            .collect();
        chain.reverse();

        // Already-open ancestors keep their persisted membership as it is, and
        // forced entries return to their forced state without being persisted.
        let keys: Vec<CanonicalPath> = chain
            .iter()
            .filter(|n| **n == id || !self.tree.is_expanded(**n))
            .filter(|n| !self.tree.is_forced(**n))
            .filter_map(|n| self.tree.key(*n).cloned())
            .collect();

        let targets: Vec<NodeId> = chain
            .iter()
            .flat_map(|n| {
                if self.tree.is_forced(*n) {
                    vec![*n]
                } else {
                    self.equivalents(*n)
                }
            })
            .collect();
        for target in targets {
            if chain.contains(&target) || self.tree.is_revealed(target) {
                self.set_flag(target, true);
            }
        }
        if !keys.is_empty() {
            self.store.add_all(keys.iter());
        }

        // Ancestors opened just now may hold other remembered subtrees.
        self.reveal_subtree(chain[0]);
        if !self.tree.is_forced(id) {
            for target in self.equivalents(id) {
                if target != id && self.tree.is_expanded(target) {
                    self.reveal_subtree(target);
                }
            }
        }
        self.enforce_ancestor_consistency();

        ChangeSet::between(&before, self.tree)
    }

    /// Collapse a node. Descendants are always hidden; with `cascade` they are
    /// also forgotten by the persisted set.
    pub fn collapse(&mut self, id: NodeId, cascade: bool) -> ChangeSet {
        let before = self.tree.expanded_flags();
        if self.tree.get(id).is_none() {
            return ChangeSet::default();
        }

        let mut forget: Vec<CanonicalPath> = Vec::new();
        if let Some(key) = self.tree.key(id) {
            forget.push(key.clone());
        }

        for target in self.equivalents(id) {
            self.set_flag(target, false);
            for descendant in self.tree.descendants(target) {
                self.set_flag(descendant, false);
                if cascade {
                    if let Some(key) = self.tree.key(descendant) {
                        forget.push(key.clone());
                    }
                }
            }
        }

        // One flush for the whole batch.
        if !forget.is_empty() {
            self.store.remove_all(forget.iter());
        }

        ChangeSet::between(&before, self.tree)
    }

    /// Force open every ancestor of the node matching `active`, and the node
    /// itself when it has children. Idempotent.
    pub fn expand_ancestor_chain(&mut self, active: &CanonicalPath) -> ChangeSet {
        let before = self.tree.expanded_flags();
        let Some(target) = self.tree.find_by_key(active.as_str()) else {
            log::debug!("[ThemeNative] Active path {} is not in the navigation", active);
            return ChangeSet::default();
        };

        let mut chain: Vec<NodeId> = self.tree.ancestors(target).collect();
        if self.tree.get(target).is_some_and(|n| n.is_expandable()) {
            chain.insert(0, target);
        }

        for id in &chain {
            self.set_flag(*id, true);
        }

        if self.policy.persist_active_path {
            let keys: Vec<CanonicalPath> = chain
                .iter()
                .filter_map(|id| self.tree.key(*id).cloned())
                .filter(|key| !self.store.contains(key))
                .collect();
            if !keys.is_empty() {
                self.store.add_all(keys.iter());
            }
        }

        for id in &chain {
            let persisted = self.tree.key(*id).is_some_and(|k| self.store.contains(k));
            self.set_forced(*id, !persisted);
        }

        // Siblings along the chain were hidden until now.
        if let Some(top) = chain.last() {
            self.reveal_subtree(*top);
        }
        self.enforce_ancestor_consistency();

        ChangeSet::between(&before, self.tree)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // HELPERS
    // ═══════════════════════════════════════════════════════════════════════════

    fn set_flag(&mut self, id: NodeId, expanded: bool) {
        if let Some(node) = self.tree.get_mut(id) {
            node.expanded = expanded && !node.children.is_empty();
        }
    }

    fn set_forced(&mut self, id: NodeId, forced: bool) {
        if let Some(node) = self.tree.get_mut(id) {
            node.forced = forced;
        }
    }

    /// `id` plus every other node with the same key.
    fn equivalents(&self, id: NodeId) -> Vec<NodeId> {
        match self.tree.key(id) {
            Some(key) => self.tree.nodes_with_key(key.as_str()).to_vec(),
            None => vec![id],
        }
    }

    fn should_restore(&self, id: NodeId) -> bool {
        let Some(node) = self.tree.get(id) else {
            return false;
        };
        if node.expanded || node.forced {
            return true;
        }
        if self.policy.cascade_collapse_descendants && node.depth > 0 {
            return false;
        }
        node.key.as_ref().is_some_and(|k| self.store.contains(k))
    }

    /// Reopen descendants of an expanded node that are remembered as expanded
    /// or belong to the forced chain. Stops at the first collapsed level.
    fn reveal_subtree(&mut self, id: NodeId) {
        let mut stack: Vec<NodeId> = match self.tree.get(id) {
            Some(node) if node.expanded => node.children.clone(),
            _ => return,
        };
        while let Some(child) = stack.pop() {
            if self.should_restore(child) {
                self.set_flag(child, true);
                if let Some(node) = self.tree.get(child) {
                    if node.expanded {
                        stack.extend(node.children.iter().copied());
                    }
                }
            } else {
                for hidden in self.tree.descendants(child) {
                    self.set_flag(hidden, false);
                }
            }
        }
    }

    /// Clear any expanded node that sits under a collapsed ancestor.
    ///
    /// Parents always precede children in the arena, so one forward pass is enough.
    fn enforce_ancestor_consistency(&mut self) {
        for id in self.tree.ids().collect::<Vec<_>>() {
            let hidden = match self.tree.get(id) {
                Some(node) => match node.parent {
                    Some(parent) => node.expanded && !self.tree.is_expanded(parent),
                    None => false,
                },
                None => false,
            };
            if hidden {
                self.set_flag(id, false);
            }
        }
    }
}

/// Every expanded node has only expanded ancestors.
pub fn ancestors_consistent(tree: &NavTree) -> bool {
    tree.iter()
        .filter(|node| node.expanded)
        .all(|node| tree.is_revealed(node.id))
}
