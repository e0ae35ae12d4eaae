//! Expansion engine behavior: initialization scenarios, cascade policy and the
//! consistency invariants.

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use proptest::prelude::*;

    use crate::config::{ExpansionPolicy, ThemeConfig};
    use crate::engine::{ancestors_consistent, ExpansionEngine};
    use crate::path::CanonicalPath;
    use crate::state::NavigationState;
    use crate::storage::{MemoryStorage, Storage};
    use crate::store::{parse_persisted, PersistedSetStore};
    use crate::tree::{NavTree, NodeId};

    const KEY: &str = crate::config::DEFAULT_NAV_STORAGE_KEY;

    /// ```text
    /// /guide
    ///   /guide/setup
    ///     /guide/setup/linux
    ///       /guide/setup/linux/arch
    ///   /guide/usage
    /// /docs
    ///   /docs/more
    ///     /other
    /// /
    /// ```
    fn site_tree() -> NavTree {
        let mut b = NavTree::builder();
        let guide = b.add(None, Some("/guide/"), "Guide");
        let setup = b.add(Some(guide), Some("/guide/setup/"), "Setup");
        let linux = b.add(Some(setup), Some("/guide/setup/linux"), "Linux");
        b.add(Some(linux), Some("/guide/setup/linux/arch"), "Arch");
        b.add(Some(guide), Some("/guide/usage"), "Usage");
        let docs = b.add(None, Some("/docs"), "Docs");
        let more = b.add(Some(docs), Some("/docs/more/"), "More");
        b.add(Some(more), Some("/other"), "Other");
        b.add(None, Some("/"), "Home");
        b.build()
    }

    fn state_with(
        policy: ExpansionPolicy,
        persisted: &str,
        active: Option<&str>,
    ) -> (Rc<MemoryStorage>, NavigationState) {
        let storage = Rc::new(MemoryStorage::with_item(KEY, persisted));
        let config = ThemeConfig::default().with_policy(policy);
        let state = NavigationState::with_tree(config, storage.clone(), site_tree(), active);
        (storage, state)
    }

    fn expanded_keys(state: &NavigationState) -> Vec<String> {
        state
            .tree()
            .unwrap()
            .iter()
            .filter(|n| n.expanded)
            .filter_map(|n| n.key.as_ref().map(|k| k.as_str().to_string()))
            .collect()
    }

    fn stored(storage: &MemoryStorage) -> Vec<String> {
        parse_persisted(storage.get_item(KEY).as_deref())
            .into_iter()
            .map(CanonicalPath::into_string)
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INITIALIZATION SCENARIOS
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_persisted_state_and_active_chain() {
        let (_, state) = state_with(
            ExpansionPolicy::path_restoration(),
            r#"["/guide", "/guide/setup"]"#,
            Some("/other"),
        );

        assert!(state.is_expanded("/guide"));
        assert!(state.is_expanded("/guide/setup"));
        assert!(state.is_expanded("/docs"));
        assert!(state.is_expanded("/docs/more"));
        assert!(!state.is_expanded("/guide/setup/linux"));
        // Leaves have nothing to reveal
        assert!(!state.is_expanded("/other"));
        assert!(ancestors_consistent(state.tree().unwrap()));
        assert_eq!(state.report().active_node, state.resolve("/other"));
    }

    #[test]
    fn test_forced_chain_is_not_persisted_by_default() {
        let (storage, _) = state_with(
            ExpansionPolicy::path_restoration(),
            r#"["/guide"]"#,
            Some("/other/"),
        );
        assert_eq!(stored(&storage), vec!["/guide"]);
    }

    #[test]
    fn test_forced_chain_persisted_when_configured() {
        let policy = ExpansionPolicy {
            persist_active_path: true,
            ..ExpansionPolicy::path_restoration()
        };
        let (storage, state) = state_with(policy, "[]", Some("/other"));
        assert_eq!(stored(&storage), vec!["/docs", "/docs/more"]);
        assert_eq!(state.persisted().unwrap().len(), 2);
    }

    #[test]
    fn test_home_override_collapses_everything() {
        let policy = ExpansionPolicy::path_restoration().with_home_override();
        let (storage, state) = state_with(policy, r#"["/guide"]"#, Some("/"));

        assert!(expanded_keys(&state).is_empty());
        assert!(state.report().home_override);
        // Persisted membership is left alone for the next non-home page
        assert_eq!(stored(&storage), vec!["/guide"]);
    }

    #[test]
    fn test_home_override_only_on_home() {
        let policy = ExpansionPolicy::path_restoration().with_home_override();
        let (_, state) = state_with(policy, r#"["/guide"]"#, Some("/guide/usage"));
        assert!(state.is_expanded("/guide"));
        assert!(!state.report().home_override);
    }

    #[test]
    fn test_malformed_persisted_value_starts_collapsed() {
        let (_, state) = state_with(ExpansionPolicy::path_restoration(), "{not json", None);
        assert!(expanded_keys(&state).is_empty());
        assert!(state.persisted().unwrap().is_empty());
    }

    #[test]
    fn test_active_entry_with_children_is_opened() {
        let (_, state) =
            state_with(ExpansionPolicy::path_restoration(), "[]", Some("/guide/setup"));
        assert_eq!(expanded_keys(&state), vec!["/guide", "/guide/setup"]);
    }

    #[test]
    fn test_unknown_active_path_is_ignored() {
        let (_, state) =
            state_with(ExpansionPolicy::path_restoration(), "[]", Some("/nowhere"));
        assert!(expanded_keys(&state).is_empty());
        assert_eq!(state.report().active_node, None);
    }

    #[test]
    fn test_orphaned_persisted_child_stays_hidden() {
        let (_, mut state) = state_with(
            ExpansionPolicy::path_restoration(),
            r#"["/guide/setup"]"#,
            None,
        );
        assert!(!state.is_expanded("/guide/setup"));
        assert!(ancestors_consistent(state.tree().unwrap()));

        // Opening the parent brings the remembered child back
        let guide = state.resolve("/guide").unwrap();
        let changes = state.engine().unwrap().toggle(guide);
        assert!(state.is_expanded("/guide/setup"));
        assert_eq!(changes.changed.len(), 2);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SINGLE-LEVEL POLICY
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_single_level_purges_nested_entries_on_load() {
        let (storage, state) = state_with(
            ExpansionPolicy::single_level(),
            r#"["/guide", "/guide/setup", "/guide/setup/linux"]"#,
            Some("/other"),
        );
        assert_eq!(expanded_keys(&state), vec!["/guide"]);
        assert_eq!(stored(&storage), vec!["/guide"]);
        assert_eq!(state.report().purged, 2);
        // No forced chain in the pure single-level policy
        assert!(!state.is_expanded("/docs"));
    }

    #[test]
    fn test_hybrid_policy_forces_chain_after_purge() {
        let policy = ExpansionPolicy {
            force_active_path_expansion: true,
            ..ExpansionPolicy::single_level()
        };
        let (storage, state) = state_with(
            policy,
            r#"["/guide/setup"]"#,
            Some("/guide/setup/linux/arch"),
        );
        assert_eq!(
            expanded_keys(&state),
            vec!["/guide", "/guide/setup", "/guide/setup/linux"]
        );
        assert!(stored(&storage).is_empty());
    }

    #[test]
    fn test_cascade_collapse_forgets_descendants() {
        let (storage, mut state) =
            state_with(ExpansionPolicy::single_level(), r#"["/guide"]"#, None);
        for path in ["/guide/setup", "/guide/setup/linux"] {
            let id = state.resolve(path).unwrap();
            state.engine().unwrap().toggle(id);
        }
        assert_eq!(
            stored(&storage),
            vec!["/guide", "/guide/setup", "/guide/setup/linux"]
        );

        let guide = state.resolve("/guide").unwrap();
        let changes = state.engine().unwrap().toggle(guide);

        assert_eq!(changes.changed.len(), 3);
        assert!(expanded_keys(&state).is_empty());
        assert!(stored(&storage).is_empty());

        // Re-opening reveals direct children only
        state.engine().unwrap().toggle(guide);
        assert_eq!(expanded_keys(&state), vec!["/guide"]);
    }

    #[test]
    fn test_non_cascading_collapse_remembers_descendants() {
        let (storage, mut state) = state_with(
            ExpansionPolicy::path_restoration(),
            r#"["/guide", "/guide/setup"]"#,
            None,
        );
        let guide = state.resolve("/guide").unwrap();

        state.engine().unwrap().collapse(guide, false);
        assert!(expanded_keys(&state).is_empty());
        assert_eq!(stored(&storage), vec!["/guide/setup"]);

        state.engine().unwrap().expand(guide);
        assert_eq!(expanded_keys(&state), vec!["/guide", "/guide/setup"]);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSITIONS
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_toggle_twice_restores_state() {
        let (storage, mut state) = state_with(
            ExpansionPolicy::path_restoration(),
            r#"["/guide", "/guide/setup"]"#,
            None,
        );
        let flags = state.tree().unwrap().expanded_flags();
        let persisted = stored(&storage);

        let guide = state.resolve("/guide").unwrap();
        state.engine().unwrap().toggle(guide);
        assert!(!state.is_expanded("/guide"));
        state.engine().unwrap().toggle(guide);

        assert_eq!(state.tree().unwrap().expanded_flags(), flags);
        assert_eq!(stored(&storage), persisted);
    }

    #[test]
    fn test_toggle_twice_restores_forced_chain() {
        let (storage, mut state) =
            state_with(ExpansionPolicy::path_restoration(), "[]", Some("/other"));
        let flags = state.tree().unwrap().expanded_flags();
        let raw = storage.get_item(KEY);

        let docs = state.resolve("/docs").unwrap();
        state.engine().unwrap().toggle(docs);
        assert!(!state.is_expanded("/docs"));
        assert!(!state.is_expanded("/docs/more"));

        state.engine().unwrap().toggle(docs);
        assert!(state.is_expanded("/docs/more"));
        assert_eq!(state.tree().unwrap().expanded_flags(), flags);
        assert_eq!(storage.get_item(KEY), raw);
    }

    #[test]
    fn test_remembered_entry_on_forced_chain_stays_remembered() {
        let (storage, mut state) = state_with(
            ExpansionPolicy::path_restoration(),
            r#"["/docs"]"#,
            Some("/other"),
        );
        let docs = state.resolve("/docs").unwrap();
        assert!(!state.tree().unwrap().is_forced(docs));

        state.engine().unwrap().toggle(docs);
        assert!(stored(&storage).is_empty());
        state.engine().unwrap().toggle(docs);
        assert_eq!(stored(&storage), vec!["/docs"]);
        assert!(state.is_expanded("/docs/more"));
    }

    #[test]
    fn test_toggle_leaf_is_noop() {
        let (storage, mut state) = state_with(ExpansionPolicy::path_restoration(), "[]", None);
        let usage = state.resolve("/guide/usage").unwrap();
        assert!(state.engine().unwrap().toggle(usage).is_empty());
        assert!(stored(&storage).is_empty());
        assert!(state.engine().unwrap().toggle(NodeId(999)).is_empty());
    }

    #[test]
    fn test_expanding_hidden_entry_reveals_its_chain() {
        let (storage, mut state) = state_with(ExpansionPolicy::path_restoration(), "[]", None);
        let linux = state.resolve("/guide/setup/linux").unwrap();
        state.engine().unwrap().expand(linux);

        assert_eq!(
            expanded_keys(&state),
            vec!["/guide", "/guide/setup", "/guide/setup/linux"]
        );
        assert_eq!(
            stored(&storage),
            vec!["/guide", "/guide/setup", "/guide/setup/linux"]
        );
    }

    #[test]
    fn test_ancestor_chain_is_idempotent() {
        let (_, mut state) =
            state_with(ExpansionPolicy::path_restoration(), "[]", Some("/other"));
        let active = CanonicalPath::new("/other");
        let again = state.engine().unwrap().expand_ancestor_chain(&active);
        assert!(again.is_empty());
    }

    #[test]
    fn test_duplicate_keys_move_together() {
        let mut b = NavTree::builder();
        let first = b.add(None, Some("/dup"), "First");
        b.add(Some(first), Some("/dup/a"), "A");
        let second = b.add(None, Some("/dup/"), "Second");
        b.add(Some(second), Some("/dup/b"), "B");
        let mut tree = b.build();

        let storage = Rc::new(MemoryStorage::new());
        let mut store = PersistedSetStore::load(storage, KEY);
        let policy = ExpansionPolicy::path_restoration();
        let mut engine = ExpansionEngine::new(&mut tree, &mut store, &policy);

        let report = engine.initialize(Some(&CanonicalPath::new("/dup")));
        assert_eq!(report.active_node, Some(second));

        engine.toggle(first);
        drop(engine);
        assert!(tree.is_expanded(first));
        assert!(tree.is_expanded(second));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PROPERTIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Node i gets a parent among 0..i when its flag says so.
    fn arbitrary_site() -> impl Strategy<Value = (NavTree, Vec<String>)> {
        prop::collection::vec(
            (any::<prop::sample::Index>(), any::<bool>(), any::<bool>()),
            1..24,
        )
        .prop_map(|shapes| {
            let mut b = NavTree::builder();
            let mut persisted = Vec::new();
            for (i, (parent, nested, remembered)) in shapes.into_iter().enumerate() {
                let parent = (nested && i > 0).then(|| NodeId(parent.index(i)));
                let href = format!("/n{}/", i);
                b.add(parent, Some(&href), &href);
                if remembered {
                    persisted.push(format!("/n{}", i));
                }
            }
            (b.build(), persisted)
        })
    }

    fn init_engine_state(
        tree: NavTree,
        persisted: &[String],
        policy: ExpansionPolicy,
        active: Option<&str>,
    ) -> (Rc<MemoryStorage>, NavigationState) {
        let raw = serde_json::to_string(persisted).unwrap();
        let storage = Rc::new(MemoryStorage::with_item(KEY, &raw));
        let config = ThemeConfig::default().with_policy(policy);
        let state = NavigationState::with_tree(config, storage.clone(), tree, active);
        (storage, state)
    }

    proptest! {
        #[test]
        fn prop_toggling_keeps_ancestors_consistent(
            (tree, persisted) in arbitrary_site(),
            active in any::<prop::sample::Index>(),
            clicks in prop::collection::vec(any::<prop::sample::Index>(), 0..16),
            single_level in any::<bool>(),
        ) {
            let len = tree.len();
            let active = format!("/n{}", active.index(len));
            let policy = if single_level {
                ExpansionPolicy::single_level()
            } else {
                ExpansionPolicy::path_restoration()
            };
            let (_, mut state) = init_engine_state(tree, &persisted, policy, Some(&active));
            prop_assert!(ancestors_consistent(state.tree().unwrap()));

            for click in clicks {
                let id = NodeId(click.index(len));
                state.engine().unwrap().toggle(id);
                prop_assert!(ancestors_consistent(state.tree().unwrap()));
            }
        }

        #[test]
        fn prop_double_toggle_is_identity(
            (tree, persisted) in arbitrary_site(),
            active in prop::option::of(any::<prop::sample::Index>()),
            pick in any::<prop::sample::Index>(),
        ) {
            let active = active.map(|a| format!("/n{}", a.index(tree.len())));
            let (storage, mut state) = init_engine_state(
                tree,
                &persisted,
                ExpansionPolicy::path_restoration(),
                active.as_deref(),
            );

            let revealed: Vec<NodeId> = {
                let tree = state.tree().unwrap();
                tree.ids().filter(|id| tree.is_revealed(*id)).collect()
            };
            let id = revealed[pick.index(revealed.len())];

            let flags = state.tree().unwrap().expanded_flags();
            let before = stored(&storage);
            state.engine().unwrap().toggle(id);
            state.engine().unwrap().toggle(id);

            prop_assert_eq!(state.tree().unwrap().expanded_flags(), flags);
            prop_assert_eq!(stored(&storage), before);
        }

        #[test]
        fn prop_cascade_collapse_clears_subtree(
            (tree, persisted) in arbitrary_site(),
            pick in any::<prop::sample::Index>(),
            opens in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
        ) {
            let len = tree.len();
            let (storage, mut state) =
                init_engine_state(tree, &persisted, ExpansionPolicy::single_level(), None);
            for open in opens {
                state.engine().unwrap().expand(NodeId(open.index(len)));
            }

            let id = NodeId(pick.index(len));
            state.engine().unwrap().collapse(id, true);

            let tree = state.tree().unwrap();
            let remaining = parse_persisted(storage.get_item(KEY).as_deref());
            for descendant in tree.descendants(id) {
                prop_assert!(!tree.is_expanded(descendant));
                let key = tree.key(descendant).unwrap();
                prop_assert!(!remaining.contains(key));
            }
            prop_assert!(!tree.is_expanded(id));
        }
    }
}
