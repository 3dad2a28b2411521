/*
 * Session-level state for the folder explorer. `FolderSession` owns the tree, the
 * token index, the selection reconciler and the token accountant, and applies
 * folder-source responses to them.
 *
 * Responses may arrive out of order. Every request is tagged with a `RenderId`
 * from `begin_request`; a response whose id is older than the newest applied one
 * is discarded. Fetch failures never clear data: the previous tree and counts
 * stay in place and a `Notification` is queued for the front-end.
 */
use crate::app_logic::tree_rows::TreeRow;
use crate::core::{
    CheckState, FolderPayload, FolderSourceError, FolderSourceOperations, ReconcilerConfig,
    SelectionReconciler, SelectionSet, ToggleOutcome, TokenAccountant, TokenIndex, TokenTally,
    TreeModel,
};
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Notification {
            severity,
            message: message.into(),
        }
    }
}

/* What happened to a response handed to the session. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Stale,
}

pub struct FolderSession {
    tree: TreeModel,
    index: TokenIndex,
    reconciler: SelectionReconciler,
    accountant: TokenAccountant,
    next_render_id: u64,
    latest_applied: Option<RenderId>,
    notifications: Vec<Notification>,
}

impl Default for FolderSession {
    fn default() -> Self {
        Self::new(ReconcilerConfig::default())
    }
}

impl FolderSession {
    pub fn new(config: ReconcilerConfig) -> Self {
        FolderSession {
            tree: TreeModel::default(),
            index: TokenIndex::new(),
            reconciler: SelectionReconciler::new(config),
            accountant: TokenAccountant::new(),
            next_render_id: 1,
            latest_applied: None,
            notifications: Vec::new(),
        }
    }

    pub fn tree(&self) -> &TreeModel {
        &self.tree
    }

    pub fn token_index(&self) -> &TokenIndex {
        &self.index
    }

    pub fn selection(&self) -> &SelectionSet {
        self.reconciler.selection()
    }

    pub fn begin_request(&mut self) -> RenderId {
        let id = RenderId(self.next_render_id);
        self.next_render_id += 1;
        id
    }

    fn accept(&mut self, render_id: RenderId, what: &str) -> bool {
        if self.latest_applied.is_some_and(|latest| render_id < latest) {
            log::debug!(
                "FolderSession: Discarding stale {what} for {render_id:?} (latest applied {:?}).",
                self.latest_applied
            );
            return false;
        }
        self.latest_applied = Some(render_id);
        true
    }

    /*
     * Replaces the tree and estimated counts. Accurate counts from the payload are
     * merged on top. The selection is kept as-is, including keys that no longer
     * exist in the new tree.
     */
    pub fn apply_folder_payload(
        &mut self,
        render_id: RenderId,
        payload: FolderPayload,
    ) -> ApplyOutcome {
        if !self.accept(render_id, "folder payload") {
            return ApplyOutcome::Stale;
        }
        if payload.is_empty() {
            self.notifications
                .push(Notification::new(Severity::Info, "No folders found."));
        }
        self.tree = TreeModel::from_wire(payload.tree);
        self.index.replace_estimated(payload.token_counts);
        self.index.merge_accurate(payload.accurate_token_counts);
        log::debug!(
            "FolderSession: Applied folder payload {render_id:?} with {} nodes.",
            self.tree.len()
        );
        ApplyOutcome::Applied
    }

    pub fn apply_accurate_counts(
        &mut self,
        render_id: RenderId,
        counts: HashMap<String, i64>,
    ) -> ApplyOutcome {
        if !self.accept(render_id, "accurate counts") {
            return ApplyOutcome::Stale;
        }
        log::debug!(
            "FolderSession: Merging {} accurate counts for {render_id:?}.",
            counts.len()
        );
        self.index.merge_accurate(counts);
        ApplyOutcome::Applied
    }

    /* Keeps the current data and queues an error notification. */
    pub fn apply_fetch_failure(
        &mut self,
        render_id: RenderId,
        error: &FolderSourceError,
    ) -> ApplyOutcome {
        if !self.accept(render_id, "fetch failure") {
            return ApplyOutcome::Stale;
        }
        log::error!("FolderSession: Fetch for {render_id:?} failed: {error}");
        self.notifications.push(Notification::new(
            Severity::Error,
            format!("Failed to load folders: {error}"),
        ));
        ApplyOutcome::Applied
    }

    /*
     * Runs one fetch cycle against `source`: the folder tree, then (when
     * `accurate` is set) accurate counts for every file of the new tree.
     */
    pub fn refresh_from(
        &mut self,
        source: &dyn FolderSourceOperations,
        refresh: bool,
        accurate: bool,
    ) -> ApplyOutcome {
        let render_id = self.begin_request();
        let outcome = match source.fetch_folders(refresh) {
            Ok(payload) => self.apply_folder_payload(render_id, payload),
            Err(e) => return self.apply_fetch_failure(render_id, &e),
        };
        if !accurate || outcome == ApplyOutcome::Stale {
            return outcome;
        }

        let leaf_keys = self.tree.leaf_keys();
        let counts_id = self.begin_request();
        match source.fetch_accurate_token_counts(&leaf_keys) {
            Ok(counts) => self.apply_accurate_counts(counts_id, counts),
            Err(e) => {
                log::warn!("FolderSession: Accurate count fetch failed: {e}");
                self.notifications.push(Notification::new(
                    Severity::Warning,
                    format!("Could not compute accurate token counts: {e}"),
                ));
                ApplyOutcome::Applied
            }
        }
    }

    pub fn toggle(&mut self, key: &str, checked: bool) -> bool {
        self.reconciler.toggle(&self.tree, key, checked)
    }

    pub fn request_toggle(&mut self, key: &str, checked: bool, now: Instant) -> ToggleOutcome {
        self.reconciler.request_toggle(&self.tree, key, checked, now)
    }

    pub fn run_pending(&mut self) -> usize {
        self.reconciler.run_pending(&self.tree)
    }

    pub fn replace_selection(&mut self, selection: SelectionSet) {
        self.reconciler.replace_selection(selection);
    }

    pub fn reconcile_all(&mut self) {
        self.reconciler.reconcile_all(&self.tree);
    }

    pub fn check_state(&self, key: &str) -> CheckState {
        self.reconciler.check_state(&self.tree, key)
    }

    pub fn tally(&mut self, key: &str) -> TokenTally {
        self.accountant
            .tally(&self.tree, self.reconciler.selection(), &self.index, key)
    }

    pub fn included_total(&mut self) -> TokenTally {
        self.accountant
            .tally_roots(&self.tree, self.reconciler.selection(), &self.index)
    }

    pub fn selected_files(&self) -> Vec<String> {
        self.reconciler.selected_leaf_keys(&self.tree)
    }

    /* Display rows in pre-order, one per tree node. */
    pub fn tree_rows(&mut self) -> Vec<TreeRow> {
        let keys: Vec<String> = self
            .tree
            .roots()
            .iter()
            .flat_map(|root| {
                std::iter::once(root.key().to_string()).chain(self.tree.descendant_keys(root.key()))
            })
            .collect();

        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(node) = self.tree.node(&key) else {
                continue;
            };
            let title = node.title().to_string();
            let is_dir = node.is_dir();
            let depth = self.tree.depth(&key).unwrap_or(0);
            let check = self.check_state(&key);
            let tally = self.tally(&key);
            rows.push(TreeRow {
                key,
                title,
                depth,
                is_dir,
                check,
                tally,
            });
        }
        rows
    }

    pub fn has_notifications(&self) -> bool {
        !self.notifications.is_empty()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}
