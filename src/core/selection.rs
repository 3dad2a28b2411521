/*
 * Selection state for the folder tree. `SelectionSet` stores the checked node keys
 * and `SelectionReconciler` keeps it consistent when nodes are toggled:
 * checking a node checks its whole subtree, and every ancestor is then
 * re-evaluated bottom-up so that a directory is present exactly when all of its
 * children are (recursively) fully selected. Partial ("indeterminate") selection
 * is always derived, never stored.
 *
 * Rapid repeated clicks are debounced. An accepted click applies an eager
 * single-node toggle right away and queues the full reconciliation on an explicit
 * FIFO queue, which the owner drains with `run_pending`.
 */
use crate::core::tree_model::TreeModel;
use crate::core::versioning;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

pub const DEFAULT_TOGGLE_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSet {
    keys: HashSet<String>,
    version: u64,
}

impl Default for SelectionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionSet {
    pub fn new() -> Self {
        SelectionSet {
            keys: HashSet::new(),
            version: versioning::next_version(),
        }
    }

    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectionSet {
            keys: keys.into_iter().map(Into::into).collect(),
            version: versioning::next_version(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /* Returns true when the key was not present before. */
    pub fn insert(&mut self, key: &str) -> bool {
        let inserted = self.keys.insert(key.to_string());
        if inserted {
            self.version = versioning::next_version();
        }
        inserted
    }

    /* Returns true when the key was present before. */
    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.keys.remove(key);
        if removed {
            self.version = versioning::next_version();
        }
        removed
    }

    pub fn clear(&mut self) {
        if !self.keys.is_empty() {
            self.keys.clear();
            self.version = versioning::next_version();
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.keys.iter().cloned().collect();
        keys.sort();
        keys
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Checked,
    Unchecked,
    Indeterminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Scheduled,
    Debounced,
    UnknownNode,
}

#[derive(Debug, Clone, Copy)]
pub struct ReconcilerConfig {
    pub debounce: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        ReconcilerConfig {
            debounce: DEFAULT_TOGGLE_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ReconcileTask {
    key: String,
    checked: bool,
}

#[derive(Debug)]
pub struct SelectionReconciler {
    selection: SelectionSet,
    config: ReconcilerConfig,
    last_accepted_at: Option<Instant>,
    pending: VecDeque<ReconcileTask>,
}

impl Default for SelectionReconciler {
    fn default() -> Self {
        Self::new(ReconcilerConfig::default())
    }
}

impl SelectionReconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        SelectionReconciler {
            selection: SelectionSet::new(),
            config,
            last_accepted_at: None,
            pending: VecDeque::new(),
        }
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /*
     * Replaces the selection wholesale, e.g. when restoring a saved selection.
     * Pending reconciliations belong to the old selection and are dropped.
     */
    pub fn replace_selection(&mut self, selection: SelectionSet) {
        self.selection = selection;
        self.pending.clear();
    }

    pub fn clear(&mut self) {
        self.selection.clear();
        self.pending.clear();
    }

    /*
     * Checks or unchecks `key` together with its whole subtree, then re-evaluates
     * every ancestor bottom-up. Unknown keys are ignored. Returns true when the
     * selection changed.
     */
    pub fn toggle(&mut self, tree: &TreeModel, key: &str, checked: bool) -> bool {
        if !tree.contains(key) {
            log::debug!("SelectionReconciler: Ignoring toggle for unknown key {key:?}.");
            return false;
        }
        let before = self.selection.version();

        let mut subtree = vec![key.to_string()];
        subtree.extend(tree.descendant_keys(key));
        for node_key in &subtree {
            if checked {
                self.selection.insert(node_key);
            } else {
                self.selection.remove(node_key);
            }
        }

        self.propagate_to_ancestors(tree, key);

        let changed = self.selection.version() != before;
        log::trace!(
            "SelectionReconciler: Toggled {key:?} to {checked} ({} nodes in subtree, changed: {changed}).",
            subtree.len()
        );
        changed
    }

    /*
     * Debounced entry point for UI clicks. A click within the debounce window of the
     * previously accepted one is dropped. Otherwise the clicked node alone is
     * updated immediately and the full reconciliation is queued.
     */
    pub fn request_toggle(
        &mut self,
        tree: &TreeModel,
        key: &str,
        checked: bool,
        now: Instant,
    ) -> ToggleOutcome {
        if !tree.contains(key) {
            log::debug!("SelectionReconciler: Ignoring toggle request for unknown key {key:?}.");
            return ToggleOutcome::UnknownNode;
        }
        if let Some(last) = self.last_accepted_at {
            if now.saturating_duration_since(last) < self.config.debounce {
                log::debug!(
                    "SelectionReconciler: Dropping toggle for {key:?}; previous one was {:?} ago.",
                    now.saturating_duration_since(last)
                );
                return ToggleOutcome::Debounced;
            }
        }
        self.last_accepted_at = Some(now);

        if checked {
            self.selection.insert(key);
        } else {
            self.selection.remove(key);
        }
        self.pending.push_back(ReconcileTask {
            key: key.to_string(),
            checked,
        });
        ToggleOutcome::Scheduled
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /*
     * Runs queued reconciliations in the order they were accepted, against the tree
     * as it is now. Returns the number of tasks executed.
     */
    pub fn run_pending(&mut self, tree: &TreeModel) -> usize {
        let mut executed = 0;
        while let Some(task) = self.pending.pop_front() {
            self.toggle(tree, &task.key, task.checked);
            executed += 1;
        }
        if executed > 0 {
            log::debug!("SelectionReconciler: Ran {executed} queued reconciliation(s).");
        }
        executed
    }

    fn propagate_to_ancestors(&mut self, tree: &TreeModel, key: &str) {
        let mut memo = HashMap::new();
        for ancestor in tree.ancestors(key) {
            if self.fully_selected_memo(tree, &ancestor, &mut memo) {
                self.selection.insert(&ancestor);
            } else {
                self.selection.remove(&ancestor);
            }
        }
    }

    /*
     * Recomputes every non-empty directory bottom-up. Leaf membership is taken as
     * authoritative; directory membership is derived from it. Empty directories
     * keep whatever state they have.
     */
    pub fn reconcile_all(&mut self, tree: &TreeModel) {
        let mut memo = HashMap::new();
        for dir_key in tree.directory_keys_post_order() {
            if tree.children_keys(&dir_key).is_empty() {
                continue;
            }
            if self.fully_selected_memo(tree, &dir_key, &mut memo) {
                self.selection.insert(&dir_key);
            } else {
                self.selection.remove(&dir_key);
            }
        }
        log::debug!(
            "SelectionReconciler: Full reconciliation left {} selected keys.",
            self.selection.len()
        );
    }

    /*
     * A file or an empty directory is fully selected when its key is in the set.
     * A directory with children is fully selected when every child is; its own
     * membership in the set is not consulted.
     */
    pub fn is_fully_selected(&self, tree: &TreeModel, key: &str) -> bool {
        let mut memo = HashMap::new();
        self.fully_selected_memo(tree, key, &mut memo)
    }

    fn fully_selected_memo(
        &self,
        tree: &TreeModel,
        key: &str,
        memo: &mut HashMap<String, bool>,
    ) -> bool {
        if let Some(known) = memo.get(key) {
            return *known;
        }
        let children = tree.children_keys(key);
        let result = if children.is_empty() {
            self.selection.contains(key)
        } else {
            children
                .iter()
                .all(|child| self.fully_selected_memo(tree, child, memo))
        };
        memo.insert(key.to_string(), result);
        result
    }

    /*
     * True when the node has children, is not itself selected, and some but not all
     * of its descendants are selected.
     */
    pub fn is_indeterminate(&self, tree: &TreeModel, key: &str) -> bool {
        if tree.children_keys(key).is_empty() || self.selection.contains(key) {
            return false;
        }
        let descendants = tree.descendant_keys(key);
        let selected = descendants
            .iter()
            .filter(|d| self.selection.contains(d))
            .count();
        selected > 0 && selected < descendants.len()
    }

    pub fn check_state(&self, tree: &TreeModel, key: &str) -> CheckState {
        if self.selection.contains(key) {
            CheckState::Checked
        } else if self.is_indeterminate(tree, key) {
            CheckState::Indeterminate
        } else {
            CheckState::Unchecked
        }
    }

    /* Selected file keys in tree order. Dangling keys are not reported. */
    pub fn selected_leaf_keys(&self, tree: &TreeModel) -> Vec<String> {
        tree.leaf_keys()
            .into_iter()
            .filter(|k| self.selection.contains(k))
            .collect()
    }
}
