/*
 * Per-file token counts as delivered by the folder source. Two layers are kept:
 * the estimated counts that arrive with every folder scan, and an optional
 * "accurate" overlay fetched on demand. The effective count for a file is the
 * accurate one when present and positive, otherwise the estimate, otherwise zero.
 *
 * A stored value of `TOOL_BACKED_SENTINEL` (-1) marks a file whose content is
 * produced by a tool at request time and therefore has no static count.
 */
use crate::core::versioning;
use std::collections::HashMap;

pub const TOOL_BACKED_SENTINEL: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafTokens {
    Counted(u64),
    ToolBacked,
}

#[derive(Debug, Clone)]
pub struct TokenIndex {
    estimated: HashMap<String, i64>,
    accurate: HashMap<String, i64>,
    version: u64,
}

impl Default for TokenIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenIndex {
    pub fn new() -> Self {
        TokenIndex {
            estimated: HashMap::new(),
            accurate: HashMap::new(),
            version: versioning::next_version(),
        }
    }

    pub fn from_estimated(estimated: HashMap<String, i64>) -> Self {
        let mut index = Self::new();
        index.replace_estimated(estimated);
        index
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /* Replaces the estimated layer wholesale and drops the accurate overlay. */
    pub fn replace_estimated(&mut self, estimated: HashMap<String, i64>) {
        log::debug!(
            "TokenIndex: Replacing estimated counts ({} entries); clearing {} accurate overrides.",
            estimated.len(),
            self.accurate.len()
        );
        self.estimated = estimated;
        self.accurate.clear();
        self.version = versioning::next_version();
    }

    /* Merges accurate counts into the overlay; later values win per path. */
    pub fn merge_accurate(&mut self, accurate: HashMap<String, i64>) {
        if accurate.is_empty() {
            return;
        }
        log::debug!("TokenIndex: Merging {} accurate counts.", accurate.len());
        self.accurate.extend(accurate);
        self.version = versioning::next_version();
    }

    pub fn clear_accurate(&mut self) {
        if !self.accurate.is_empty() {
            self.accurate.clear();
            self.version = versioning::next_version();
        }
    }

    pub fn estimated(&self, path: &str) -> Option<i64> {
        self.estimated.get(path).copied()
    }

    pub fn accurate(&self, path: &str) -> Option<i64> {
        self.accurate.get(path).copied()
    }

    pub fn has_accurate_counts(&self) -> bool {
        !self.accurate.is_empty()
    }

    pub fn len(&self) -> usize {
        self.estimated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimated.is_empty()
    }

    /*
     * Resolves the effective count for a file. A positive accurate count wins, then
     * a positive estimate. If neither is positive but either layer carries the
     * sentinel, the file is tool-backed. Anything else, including unknown paths
     * and stray negative values, counts as zero.
     */
    pub fn leaf_tokens(&self, path: &str) -> LeafTokens {
        let accurate = self.accurate(path);
        let estimated = self.estimated(path);

        if let Some(count) = accurate.filter(|c| *c > 0) {
            return LeafTokens::Counted(count as u64);
        }
        if let Some(count) = estimated.filter(|c| *c > 0) {
            return LeafTokens::Counted(count as u64);
        }
        if accurate == Some(TOOL_BACKED_SENTINEL) || estimated == Some(TOOL_BACKED_SENTINEL) {
            return LeafTokens::ToolBacked;
        }
        if let Some(odd) = estimated.filter(|c| *c < 0 && *c != TOOL_BACKED_SENTINEL) {
            log::warn!("TokenIndex: Unexpected negative count {odd} for {path:?}; using 0.");
        }
        LeafTokens::Counted(0)
    }
}
