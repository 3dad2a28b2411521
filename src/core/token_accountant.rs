/*
 * Computes the `{included, total}` token tallies shown next to every node of the
 * folder tree. Files take their effective count from the `TokenIndex`; directories
 * sum their children. A selected directory includes its whole total, otherwise it
 * includes the sum of what its children include. Tool-backed files contribute no
 * tokens and are counted separately so the UI can flag them.
 *
 * Results are memoized per node. The memo is valid for exactly one combination of
 * tree, selection and index versions; when any of them moves on, the whole memo is
 * discarded before the next lookup.
 */
use crate::core::selection::SelectionSet;
use crate::core::token_index::{LeafTokens, TokenIndex};
use crate::core::tree_model::{TreeModel, TreeNode};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenTally {
    pub included: u64,
    pub total: u64,
    pub tool_backed_files: usize,
}

impl TokenTally {
    fn add(&mut self, other: TokenTally) {
        self.included = self.included.saturating_add(other.included);
        self.total = self.total.saturating_add(other.total);
        self.tool_backed_files = self.tool_backed_files.saturating_add(other.tool_backed_files);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheStamp {
    tree: u64,
    selection: u64,
    index: u64,
}

impl CacheStamp {
    fn of(tree: &TreeModel, selection: &SelectionSet, index: &TokenIndex) -> Self {
        CacheStamp {
            tree: tree.version(),
            selection: selection.version(),
            index: index.version(),
        }
    }
}

#[derive(Debug, Default)]
pub struct TokenAccountant {
    cache: HashMap<String, TokenTally>,
    stamp: Option<CacheStamp>,
    hits: u64,
    misses: u64,
}

impl TokenAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        self.cache.clear();
        self.stamp = None;
    }

    fn ensure_fresh(&mut self, stamp: CacheStamp) {
        if self.stamp != Some(stamp) {
            if !self.cache.is_empty() {
                log::trace!(
                    "TokenAccountant: Stamp changed; discarding {} memoized tallies.",
                    self.cache.len()
                );
            }
            self.cache.clear();
            self.stamp = Some(stamp);
        }
    }

    /* Tally for one node. Unknown keys yield an all-zero tally. */
    pub fn tally(
        &mut self,
        tree: &TreeModel,
        selection: &SelectionSet,
        index: &TokenIndex,
        key: &str,
    ) -> TokenTally {
        self.ensure_fresh(CacheStamp::of(tree, selection, index));
        match tree.node(key) {
            Some(node) => self.tally_node(node, selection, index),
            None => TokenTally::default(),
        }
    }

    /* Sum over all root nodes: the figures for the whole folder. */
    pub fn tally_roots(
        &mut self,
        tree: &TreeModel,
        selection: &SelectionSet,
        index: &TokenIndex,
    ) -> TokenTally {
        self.ensure_fresh(CacheStamp::of(tree, selection, index));
        let mut sum = TokenTally::default();
        for root in tree.roots() {
            sum.add(self.tally_node(root, selection, index));
        }
        sum
    }

    fn tally_node(
        &mut self,
        node: &TreeNode,
        selection: &SelectionSet,
        index: &TokenIndex,
    ) -> TokenTally {
        if let Some(cached) = self.cache.get(node.key()) {
            self.hits += 1;
            return *cached;
        }
        self.misses += 1;

        let tally = match node {
            TreeNode::File { key, .. } => leaf_tally(key, selection, index),
            TreeNode::Directory { key, children, .. } => {
                let mut sum = TokenTally::default();
                for child in children {
                    sum.add(self.tally_node(child, selection, index));
                }
                if selection.contains(key) {
                    sum.included = sum.total;
                }
                sum
            }
        };
        self.cache.insert(node.key().to_string(), tally);
        tally
    }

    /*
     * Computes a tally without touching any memo. Used to cross-check the cached
     * path and by callers that only need a one-off figure.
     */
    pub fn compute_uncached(
        tree: &TreeModel,
        selection: &SelectionSet,
        index: &TokenIndex,
        key: &str,
    ) -> TokenTally {
        fn walk(node: &TreeNode, selection: &SelectionSet, index: &TokenIndex) -> TokenTally {
            match node {
                TreeNode::File { key, .. } => leaf_tally(key, selection, index),
                TreeNode::Directory { key, children, .. } => {
                    let mut sum = TokenTally::default();
                    for child in children {
                        sum.add(walk(child, selection, index));
                    }
                    if selection.contains(key) {
                        sum.included = sum.total;
                    }
                    sum
                }
            }
        }
        tree.node(key)
            .map(|node| walk(node, selection, index))
            .unwrap_or_default()
    }

    pub fn cache_stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

fn leaf_tally(key: &str, selection: &SelectionSet, index: &TokenIndex) -> TokenTally {
    match index.leaf_tokens(key) {
        LeafTokens::Counted(count) => TokenTally {
            included: if selection.contains(key) { count } else { 0 },
            total: count,
            tool_backed_files: 0,
        },
        LeafTokens::ToolBacked => TokenTally {
            included: 0,
            total: 0,
            tool_backed_files: 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::selection::SelectionReconciler;
    use crate::core::tree_model::TreeNode;

    fn example() -> (TreeModel, TokenIndex) {
        let tree = TreeModel::new(vec![TreeNode::directory(
            "a",
            "a",
            vec![
                TreeNode::file("a/b.txt", "b.txt"),
                TreeNode::file("a/c.txt", "c.txt"),
            ],
        )]);
        let index = TokenIndex::from_estimated(
            [("a/b.txt".to_string(), 100), ("a/c.txt".to_string(), 50)]
                .into_iter()
                .collect(),
        );
        (tree, index)
    }

    fn wider() -> (TreeModel, TokenIndex) {
        let tree = TreeModel::new(vec![
            TreeNode::directory(
                "p",
                "p",
                vec![
                    TreeNode::directory(
                        "p/q",
                        "q",
                        vec![
                            TreeNode::file("p/q/one.rs", "one.rs"),
                            TreeNode::file("p/q/manual.pdf", "manual.pdf"),
                        ],
                    ),
                    TreeNode::file("p/two.rs", "two.rs"),
                    TreeNode::directory("p/empty", "empty", vec![]),
                ],
            ),
            TreeNode::file("top.md", "top.md"),
        ]);
        let index = TokenIndex::from_estimated(
            [
                ("p/q/one.rs".to_string(), 30),
                ("p/q/manual.pdf".to_string(), -1),
                ("p/two.rs".to_string(), 70),
                ("top.md".to_string(), 5),
            ]
            .into_iter()
            .collect(),
        );
        (tree, index)
    }

    #[test]
    fn test_huge_counts_saturate_instead_of_overflowing() {
        let tree = TreeModel::new(vec![TreeNode::directory(
            "big",
            "big",
            vec![
                TreeNode::file("big/a.bin", "a.bin"),
                TreeNode::file("big/b.bin", "b.bin"),
                TreeNode::file("big/c.bin", "c.bin"),
            ],
        )]);
        let index = TokenIndex::from_estimated(HashMap::from([
            ("big/a.bin".to_string(), i64::MAX),
            ("big/b.bin".to_string(), i64::MAX),
            ("big/c.bin".to_string(), i64::MAX),
        ]));
        let selection = SelectionSet::from_keys(["big", "big/a.bin", "big/b.bin", "big/c.bin"]);
        let mut accountant = TokenAccountant::new();

        let tally = accountant.tally(&tree, &selection, &index, "big");

        assert_eq!(tally.total, u64::MAX);
        assert_eq!(tally.included, u64::MAX);
    }

    #[test]
    fn test_example_partial_then_full_selection() {
        // Arrange
        crate::initialize_logging();
        let (tree, index) = example();
        let mut reconciler = SelectionReconciler::default();
        let mut accountant = TokenAccountant::new();

        // Act & Assert: b.txt only
        reconciler.toggle(&tree, "a/b.txt", true);
        let partial = accountant.tally(&tree, reconciler.selection(), &index, "a");
        assert_eq!(partial.included, 100);
        assert_eq!(partial.total, 150);
        assert!(reconciler.is_indeterminate(&tree, "a"));

        // Act & Assert: c.txt too
        reconciler.toggle(&tree, "a/c.txt", true);
        let full = accountant.tally(&tree, reconciler.selection(), &index, "a");
        assert_eq!(full.included, 150);
        assert_eq!(full.total, 150);
        assert!(reconciler.selection().contains("a"));
    }

    #[test]
    fn test_directory_total_is_sum_of_children_regardless_of_selection() {
        let (tree, index) = wider();
        let mut reconciler = SelectionReconciler::default();
        let mut accountant = TokenAccountant::new();

        for (key, checked) in [("p/q/one.rs", true), ("p", true), ("p/two.rs", false)] {
            reconciler.toggle(&tree, key, checked);
            for dir in tree.directory_keys_post_order() {
                let dir_tally = accountant.tally(&tree, reconciler.selection(), &index, &dir);
                let children_total: u64 = tree
                    .children_keys(&dir)
                    .iter()
                    .map(|c| accountant.tally(&tree, reconciler.selection(), &index, c).total)
                    .sum();
                assert_eq!(dir_tally.total, children_total, "dir {dir}");
            }
        }
    }

    #[test]
    fn test_tool_backed_files_are_flagged_not_summed() {
        let (tree, index) = wider();
        let mut reconciler = SelectionReconciler::default();
        let mut accountant = TokenAccountant::new();
        reconciler.toggle(&tree, "p/q", true);

        let q = accountant.tally(&tree, reconciler.selection(), &index, "p/q");
        let pdf = accountant.tally(&tree, reconciler.selection(), &index, "p/q/manual.pdf");

        assert_eq!(q.total, 30);
        assert_eq!(q.included, 30);
        assert_eq!(q.tool_backed_files, 1);
        assert_eq!(pdf, TokenTally { included: 0, total: 0, tool_backed_files: 1 });
    }

    #[test]
    fn test_unknown_key_and_empty_tree_yield_zero() {
        let (tree, index) = wider();
        let selection = SelectionSet::new();
        let mut accountant = TokenAccountant::new();

        assert_eq!(
            accountant.tally(&tree, &selection, &index, "missing"),
            TokenTally::default()
        );
        let empty = TreeModel::default();
        assert_eq!(
            accountant.tally_roots(&empty, &selection, &index),
            TokenTally::default()
        );
    }

    #[test]
    fn test_roots_sum_everything() {
        let (tree, index) = wider();
        let mut reconciler = SelectionReconciler::default();
        let mut accountant = TokenAccountant::new();
        reconciler.toggle(&tree, "top.md", true);
        reconciler.toggle(&tree, "p/two.rs", true);

        let sum = accountant.tally_roots(&tree, reconciler.selection(), &index);

        assert_eq!(sum.total, 105);
        assert_eq!(sum.included, 75);
        assert_eq!(sum.tool_backed_files, 1);
    }

    #[test]
    fn test_cache_hits_until_any_version_changes() {
        let (tree, mut index) = wider();
        let mut reconciler = SelectionReconciler::default();
        let mut accountant = TokenAccountant::new();

        accountant.tally(&tree, reconciler.selection(), &index, "p");
        let (_, misses_first) = accountant.cache_stats();
        accountant.tally(&tree, reconciler.selection(), &index, "p");
        let (hits, misses_second) = accountant.cache_stats();
        assert_eq!(misses_first, misses_second);
        assert_eq!(hits, 1);

        reconciler.toggle(&tree, "p/two.rs", true);
        let after_selection = accountant.tally(&tree, reconciler.selection(), &index, "p");
        assert_eq!(after_selection.included, 70);

        index.merge_accurate([("p/two.rs".to_string(), 90)].into_iter().collect());
        let after_overlay = accountant.tally(&tree, reconciler.selection(), &index, "p");
        assert_eq!(after_overlay.included, 90);
        assert_eq!(after_overlay.total, 120);
    }

    #[test]
    fn test_memoized_results_match_recomputation() {
        let (tree, index) = wider();
        let mut reconciler = SelectionReconciler::default();
        let mut accountant = TokenAccountant::new();
        reconciler.toggle(&tree, "p/q/one.rs", true);
        reconciler.toggle(&tree, "top.md", true);

        // Warm the cache bottom-up, then read everything again from it.
        for key in tree.directory_keys_post_order() {
            accountant.tally(&tree, reconciler.selection(), &index, &key);
        }
        let mut all_keys = tree.leaf_keys();
        all_keys.extend(tree.directory_keys_post_order());
        for key in all_keys {
            assert_eq!(
                accountant.tally(&tree, reconciler.selection(), &index, &key),
                TokenAccountant::compute_uncached(&tree, reconciler.selection(), &index, &key),
                "key {key}"
            );
        }
        assert!(accountant.cached_entries() > 0);
    }
}
