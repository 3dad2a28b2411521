/*
 * Defines the in-memory representation of a scanned folder: `TreeNode`, a tagged
 * union of files and directories, and `TreeModel`, which owns the root nodes plus a
 * key index for constant-time parent/child lookups. The model is immutable once
 * built; a folder refresh produces a brand new `TreeModel` with a fresh version.
 *
 * The JSON wire shape (`{ key, title, children? }`) is handled by `WireTreeNode`:
 * a node with a `children` array (even an empty one) is a directory.
 */
use crate::core::versioning;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    File {
        key: String,
        title: String,
    },
    Directory {
        key: String,
        title: String,
        children: Vec<TreeNode>,
    },
}

impl TreeNode {
    pub fn file(key: impl Into<String>, title: impl Into<String>) -> Self {
        TreeNode::File {
            key: key.into(),
            title: title.into(),
        }
    }

    pub fn directory(
        key: impl Into<String>,
        title: impl Into<String>,
        children: Vec<TreeNode>,
    ) -> Self {
        TreeNode::Directory {
            key: key.into(),
            title: title.into(),
            children,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            TreeNode::File { key, .. } | TreeNode::Directory { key, .. } => key,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            TreeNode::File { title, .. } | TreeNode::Directory { title, .. } => title,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, TreeNode::Directory { .. })
    }

    /* Children of a directory; files always report an empty slice. */
    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::File { .. } => &[],
            TreeNode::Directory { children, .. } => children,
        }
    }
}

/*
 * Mirrors the JSON object returned by the folder endpoints. Kept separate from
 * `TreeNode` so the duck-typed `children` field is resolved exactly once, at the
 * boundary.
 */
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireTreeNode {
    pub key: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<WireTreeNode>>,
}

impl From<WireTreeNode> for TreeNode {
    fn from(wire: WireTreeNode) -> Self {
        match wire.children {
            None => TreeNode::File {
                key: wire.key,
                title: wire.title,
            },
            Some(children) => TreeNode::Directory {
                key: wire.key,
                title: wire.title,
                children: children.into_iter().map(TreeNode::from).collect(),
            },
        }
    }
}

impl From<&TreeNode> for WireTreeNode {
    fn from(node: &TreeNode) -> Self {
        WireTreeNode {
            key: node.key().to_string(),
            title: node.title().to_string(),
            children: match node {
                TreeNode::File { .. } => None,
                TreeNode::Directory { children, .. } => {
                    Some(children.iter().map(WireTreeNode::from).collect())
                }
            },
        }
    }
}

#[derive(Debug, Clone)]
struct NodeEntry {
    parent: Option<String>,
    children: Vec<String>,
    is_dir: bool,
    depth: usize,
    // Index path from the roots, used to reach the owning `TreeNode`.
    location: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct TreeModel {
    roots: Vec<TreeNode>,
    entries: HashMap<String, NodeEntry>,
    version: u64,
}

impl Default for TreeModel {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl TreeModel {
    /*
     * Builds the model and its key index from the given roots. Keys are expected to
     * be unique; if a key repeats, the first occurrence wins and the duplicate
     * (with its subtree) is left out of the index.
     */
    pub fn new(roots: Vec<TreeNode>) -> Self {
        let mut entries = HashMap::new();
        let mut location = Vec::new();
        Self::index_recursive(&roots, None, 0, &mut location, &mut entries);
        log::debug!(
            "TreeModel: Indexed {} nodes under {} roots.",
            entries.len(),
            roots.len()
        );
        TreeModel {
            roots,
            entries,
            version: versioning::next_version(),
        }
    }

    pub fn from_wire(roots: Vec<WireTreeNode>) -> Self {
        Self::new(roots.into_iter().map(TreeNode::from).collect())
    }

    fn index_recursive(
        nodes: &[TreeNode],
        parent: Option<&str>,
        depth: usize,
        location: &mut Vec<usize>,
        entries: &mut HashMap<String, NodeEntry>,
    ) {
        for (i, node) in nodes.iter().enumerate() {
            if entries.contains_key(node.key()) {
                log::warn!(
                    "TreeModel: Duplicate key {:?} ignored; keeping first occurrence.",
                    node.key()
                );
                continue;
            }
            location.push(i);
            entries.insert(
                node.key().to_string(),
                NodeEntry {
                    parent: parent.map(str::to_string),
                    children: node.children().iter().map(|c| c.key().to_string()).collect(),
                    is_dir: node.is_dir(),
                    depth,
                    location: location.clone(),
                },
            );
            Self::index_recursive(
                node.children(),
                Some(node.key()),
                depth + 1,
                location,
                entries,
            );
            location.pop();
        }
    }

    pub fn roots(&self) -> &[TreeNode] {
        &self.roots
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn node(&self, key: &str) -> Option<&TreeNode> {
        let entry = self.entries.get(key)?;
        let (first, rest) = entry.location.split_first()?;
        let mut node = self.roots.get(*first)?;
        for i in rest {
            node = node.children().get(*i)?;
        }
        Some(node)
    }

    pub fn is_dir(&self, key: &str) -> Option<bool> {
        self.entries.get(key).map(|e| e.is_dir)
    }

    pub fn depth(&self, key: &str) -> Option<usize> {
        self.entries.get(key).map(|e| e.depth)
    }

    pub fn parent(&self, key: &str) -> Option<&str> {
        self.entries.get(key)?.parent.as_deref()
    }

    pub fn children_keys(&self, key: &str) -> &[String] {
        self.entries
            .get(key)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    /* Ancestors of `key`, nearest parent first. */
    pub fn ancestors(&self, key: &str) -> Vec<String> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(key);
        while let Some(parent_key) = current {
            ancestors.push(parent_key.to_string());
            current = self.parent(parent_key);
        }
        ancestors
    }

    /* All descendants of `key` in pre-order, excluding `key` itself. */
    pub fn descendant_keys(&self, key: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<&str> = self
            .children_keys(key)
            .iter()
            .rev()
            .map(String::as_str)
            .collect();
        while let Some(current) = stack.pop() {
            out.push(current.to_string());
            stack.extend(self.children_keys(current).iter().rev().map(String::as_str));
        }
        out
    }

    /* Every file key in tree order. */
    pub fn leaf_keys(&self) -> Vec<String> {
        fn collect(nodes: &[TreeNode], out: &mut Vec<String>) {
            for node in nodes {
                match node {
                    TreeNode::File { key, .. } => out.push(key.clone()),
                    TreeNode::Directory { children, .. } => collect(children, out),
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.roots, &mut out);
        out
    }

    /*
     * Directory keys ordered so that every directory comes after all of its
     * descendant directories. Used for bottom-up recomputation.
     */
    pub fn directory_keys_post_order(&self) -> Vec<String> {
        fn collect(nodes: &[TreeNode], out: &mut Vec<String>) {
            for node in nodes {
                if let TreeNode::Directory { key, children, .. } = node {
                    collect(children, out);
                    out.push(key.clone());
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.roots, &mut out);
        out
    }

    pub fn to_wire(&self) -> Vec<WireTreeNode> {
        self.roots.iter().map(WireTreeNode::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> TreeModel {
        TreeModel::new(vec![
            TreeNode::directory(
                "a",
                "a",
                vec![
                    TreeNode::file("a/b.txt", "b.txt"),
                    TreeNode::directory(
                        "a/sub",
                        "sub",
                        vec![TreeNode::file("a/sub/c.rs", "c.rs")],
                    ),
                    TreeNode::directory("a/empty", "empty", vec![]),
                ],
            ),
            TreeNode::file("readme.md", "readme.md"),
        ])
    }

    #[test]
    fn test_index_lookups() {
        let tree = sample_tree();

        assert_eq!(tree.len(), 6);
        assert_eq!(tree.is_dir("a"), Some(true));
        assert_eq!(tree.is_dir("a/b.txt"), Some(false));
        assert_eq!(tree.is_dir("missing"), None);
        assert_eq!(tree.parent("a/sub/c.rs"), Some("a/sub"));
        assert_eq!(tree.parent("a"), None);
        assert_eq!(tree.depth("a/sub/c.rs"), Some(2));
        assert_eq!(tree.node("a/sub/c.rs").map(|n| n.title()), Some("c.rs"));
        assert!(tree.node("nope").is_none());
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let tree = sample_tree();
        assert_eq!(tree.ancestors("a/sub/c.rs"), vec!["a/sub", "a"]);
        assert!(tree.ancestors("readme.md").is_empty());
    }

    #[test]
    fn test_descendants_and_leaves() {
        let tree = sample_tree();
        assert_eq!(
            tree.descendant_keys("a"),
            vec!["a/b.txt", "a/sub", "a/sub/c.rs", "a/empty"]
        );
        assert!(tree.descendant_keys("a/b.txt").is_empty());
        assert_eq!(tree.leaf_keys(), vec!["a/b.txt", "a/sub/c.rs", "readme.md"]);
    }

    #[test]
    fn test_directory_keys_post_order_puts_children_first() {
        let tree = sample_tree();
        assert_eq!(tree.directory_keys_post_order(), vec!["a/sub", "a/empty", "a"]);
    }

    #[test]
    fn test_wire_children_presence_decides_kind() {
        let json = r#"[
            {"key": "src", "title": "src", "children": [
                {"key": "src/main.rs", "title": "main.rs"}
            ]},
            {"key": "empty", "title": "empty", "children": []},
            {"key": "notes.txt", "title": "notes.txt"}
        ]"#;
        let wire: Vec<WireTreeNode> = serde_json::from_str(json).unwrap();

        let tree = TreeModel::from_wire(wire.clone());

        assert_eq!(tree.is_dir("src"), Some(true));
        assert_eq!(tree.is_dir("empty"), Some(true));
        assert_eq!(tree.is_dir("notes.txt"), Some(false));
        assert_eq!(tree.to_wire(), wire);
    }

    #[test]
    fn test_duplicate_keys_keep_first() {
        let tree = TreeModel::new(vec![
            TreeNode::file("x", "first"),
            TreeNode::file("x", "second"),
        ]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.node("x").map(|n| n.title()), Some("first"));
    }

    #[test]
    fn test_rebuilt_tree_gets_new_version() {
        let first = sample_tree();
        let second = sample_tree();
        assert_ne!(first.version(), second.version());
    }
}
