/*
 * A `FolderSourceOperations` implementation backed by a local directory.
 * `CoreLocalFolderSource` walks the root with the `ignore` crate (honoring
 * .gitignore/.ignore files, skipping hidden entries, applying user exclude
 * patterns) and builds the tree keyed by root-relative `/` paths, directories
 * first and then alphabetical at every level.
 *
 * Every scan attaches an estimated token count to each file. Accurate counts are
 * computed on request and cached per file by content checksum, so unchanged files
 * are never re-tokenized until a refresh drops the cache. Files with a
 * tool-backed extension, and files that cannot be read as UTF-8 text, report the
 * tool-backed sentinel instead of a count.
 */
use crate::core::checksum_utils;
use crate::core::folder_source::{
    FolderPayload, FolderSourceError, FolderSourceOperations, Result,
};
use crate::core::path_utils;
use crate::core::token_index::TOOL_BACKED_SENTINEL;
use crate::core::tokenizer_utils::{
    CharHeuristicTokenCounter, CoreTikTokenCounter, TokenCounterOperations,
};
use crate::core::tree_model::{TreeNode, WireTreeNode};
use ignore::{WalkBuilder, overrides::OverrideBuilder};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub const DEFAULT_TOOL_BACKED_EXTENSIONS: [&str; 4] = ["pdf", "docx", "xlsx", "pptx"];

/*
 * Cached accurate count for one file, valid while the file content hashes to
 * `checksum`.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct FileTokenDetails {
    pub checksum: String,
    pub token_count: usize,
}

/* Intermediate node used while assembling the tree from walker entries. */
#[derive(Debug)]
struct ScannedEntry {
    key: String,
    title: String,
    is_dir: bool,
    children: Vec<ScannedEntry>,
}

impl ScannedEntry {
    fn into_tree_node(self) -> TreeNode {
        if self.is_dir {
            TreeNode::directory(
                self.key,
                self.title,
                self.children
                    .into_iter()
                    .map(ScannedEntry::into_tree_node)
                    .collect(),
            )
        } else {
            TreeNode::file(self.key, self.title)
        }
    }
}

pub struct CoreLocalFolderSource {
    root: PathBuf,
    exclude_patterns: Vec<String>,
    tool_backed_extensions: Vec<String>,
    estimator: Arc<dyn TokenCounterOperations>,
    accurate_counter: Arc<dyn TokenCounterOperations>,
    accurate_cache: Mutex<HashMap<String, FileTokenDetails>>,
}

impl CoreLocalFolderSource {
    pub fn new(root: &Path, exclude_patterns: Vec<String>) -> Self {
        Self::with_counters(
            root,
            exclude_patterns,
            Arc::new(CharHeuristicTokenCounter::new()),
            Arc::new(CoreTikTokenCounter::new()),
        )
    }

    pub fn with_counters(
        root: &Path,
        exclude_patterns: Vec<String>,
        estimator: Arc<dyn TokenCounterOperations>,
        accurate_counter: Arc<dyn TokenCounterOperations>,
    ) -> Self {
        CoreLocalFolderSource {
            root: root.to_path_buf(),
            exclude_patterns,
            tool_backed_extensions: DEFAULT_TOOL_BACKED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            estimator,
            accurate_counter,
            accurate_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_tool_backed_extensions(&mut self, extensions: Vec<String>) {
        self.tool_backed_extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_tool_backed(&self, key: &str) -> bool {
        path_utils::key_extension(key)
            .is_some_and(|ext| self.tool_backed_extensions.iter().any(|e| *e == ext))
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, FileTokenDetails>> {
        match self.accurate_cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("CoreLocalFolderSource: Accurate count cache was poisoned; reusing it.");
                poisoned.into_inner()
            }
        }
    }

    fn build_walker(&self) -> ignore::Walk {
        let mut walker_builder = WalkBuilder::new(&self.root);
        walker_builder
            .standard_filters(true)
            .parents(true)
            .git_global(false)
            .git_ignore(true)
            .git_exclude(true)
            .ignore(true)
            .hidden(true)
            .sort_by_file_path(|a, b| a.cmp(b));

        if !self.exclude_patterns.is_empty() {
            let mut override_builder = OverrideBuilder::new(&self.root);
            for pattern in &self.exclude_patterns {
                let trimmed = pattern.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                // Overrides are whitelists; a leading '!' turns them into excludes.
                let override_pattern = match trimmed.strip_prefix('!') {
                    Some(negated) if !negated.trim().is_empty() => negated.trim().to_string(),
                    Some(_) => continue,
                    None => format!("!{trimmed}"),
                };
                if let Err(err) = override_builder.add(&override_pattern) {
                    log::warn!("CoreLocalFolderSource: Invalid exclude pattern '{pattern}': {err}");
                }
            }
            match override_builder.build() {
                Ok(overrides) => {
                    walker_builder.overrides(overrides);
                }
                Err(err) => log::warn!(
                    "CoreLocalFolderSource: Failed to build overrides for exclude patterns: {err}"
                ),
            }
        }
        walker_builder.build()
    }

    /* Walks the root and assembles the sorted tree. */
    fn scan_tree(&self) -> Result<Vec<TreeNode>> {
        if !self.root.is_dir() {
            return Err(FolderSourceError::InvalidRoot(self.root.clone()));
        }
        log::debug!("CoreLocalFolderSource: Scanning {:?}.", self.root);

        let mut entries: HashMap<PathBuf, ScannedEntry> = HashMap::new();
        let mut discovery_order: Vec<PathBuf> = Vec::new();

        for entry_result in self.build_walker() {
            let entry = entry_result?;
            let path = entry.path().to_path_buf();
            let Some(key) = path_utils::tree_key_for(&self.root, &path) else {
                continue;
            };
            let title = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            entries.insert(
                path.clone(),
                ScannedEntry {
                    key,
                    title,
                    is_dir,
                    children: Vec::new(),
                },
            );
            discovery_order.push(path);
        }

        // Deepest entries first, so each directory is complete before it moves.
        for child_path in discovery_order.iter().rev() {
            let Some(parent_path) = child_path.parent() else {
                continue;
            };
            if parent_path == self.root {
                continue;
            }
            if let Some(child) = entries.remove(child_path) {
                if let Some(parent) = entries.get_mut(parent_path) {
                    parent.children.push(child);
                } else {
                    log::error!(
                        "CoreLocalFolderSource: Parent {parent_path:?} missing for {child_path:?}; keeping it top-level."
                    );
                    entries.insert(child_path.clone(), child);
                }
            }
        }

        let mut top_level: Vec<ScannedEntry> = entries.into_values().collect();
        sort_entries_recursively(&mut top_level);
        log::debug!(
            "CoreLocalFolderSource: Scan complete with {} top-level entries.",
            top_level.len()
        );
        Ok(top_level
            .into_iter()
            .map(ScannedEntry::into_tree_node)
            .collect())
    }

    fn estimate_for(&self, key: &str) -> i64 {
        if self.is_tool_backed(key) {
            return TOOL_BACKED_SENTINEL;
        }
        let Some(path) = path_utils::path_for_tree_key(&self.root, key) else {
            return TOOL_BACKED_SENTINEL;
        };
        match fs::read_to_string(path) {
            Ok(text) => self.estimator.count_tokens(&text) as i64,
            Err(e) => {
                log::debug!(
                    "CoreLocalFolderSource: No text for {key:?} ({e}); marking tool-backed."
                );
                TOOL_BACKED_SENTINEL
            }
        }
    }

    /*
     * Accurate count for one file key, using the checksum cache. `None` when the
     * key does not name a readable file under the root.
     */
    fn accurate_for(&self, key: &str) -> Option<i64> {
        let path = path_utils::path_for_tree_key(&self.root, key)?;
        if !path.is_file() {
            log::debug!("CoreLocalFolderSource: {key:?} is not a file; skipping accurate count.");
            return None;
        }
        if self.is_tool_backed(key) {
            return Some(TOOL_BACKED_SENTINEL);
        }
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("CoreLocalFolderSource: Could not read {path:?}: {e}");
                self.lock_cache().remove(key);
                return Some(TOOL_BACKED_SENTINEL);
            }
        };
        let checksum = checksum_utils::checksum_for_text(&text);

        let mut cache = self.lock_cache();
        if let Some(details) = cache.get(key) {
            if details.checksum == checksum {
                return Some(details.token_count as i64);
            }
        }
        let token_count = self.accurate_counter.count_tokens(&text);
        cache.insert(
            key.to_string(),
            FileTokenDetails {
                checksum,
                token_count,
            },
        );
        Some(token_count as i64)
    }
}

impl FolderSourceOperations for CoreLocalFolderSource {
    fn fetch_folders(&self, refresh: bool) -> Result<FolderPayload> {
        if refresh {
            let mut cache = self.lock_cache();
            log::debug!(
                "CoreLocalFolderSource: Refresh requested; dropping {} cached accurate counts.",
                cache.len()
            );
            cache.clear();
        }
        let roots = self.scan_tree()?;
        let tree: Vec<WireTreeNode> = roots.iter().map(WireTreeNode::from).collect();

        let mut token_counts = HashMap::new();
        let mut stack: Vec<&TreeNode> = roots.iter().collect();
        while let Some(node) = stack.pop() {
            match node {
                TreeNode::File { key, .. } => {
                    token_counts.insert(key.clone(), self.estimate_for(key));
                }
                TreeNode::Directory { children, .. } => stack.extend(children.iter()),
            }
        }

        Ok(FolderPayload {
            tree,
            token_counts,
            accurate_token_counts: HashMap::new(),
        })
    }

    fn fetch_accurate_token_counts(&self, paths: &[String]) -> Result<HashMap<String, i64>> {
        let counts: HashMap<String, i64> = paths
            .iter()
            .filter_map(|key| self.accurate_for(key).map(|count| (key.clone(), count)))
            .collect();
        log::debug!(
            "CoreLocalFolderSource: Accurate counts for {} of {} requested files.",
            counts.len(),
            paths.len()
        );
        Ok(counts)
    }
}

fn sort_entries_recursively(entries: &mut [ScannedEntry]) {
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.title.cmp(&b.title)));
    for entry in entries.iter_mut() {
        if entry.is_dir && !entry.children.is_empty() {
            sort_entries_recursively(&mut entry.children);
        }
    }
}
