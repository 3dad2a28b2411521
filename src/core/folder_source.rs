/*
 * The boundary to whatever produces folder data: a backend folder endpoint, a
 * local directory scan, or a saved JSON payload. A source hands back the folder
 * tree together with per-file estimated token counts, and can be asked
 * separately for accurate counts of specific files.
 *
 * The session handles every failure the same way (keep the previous data, tell
 * the user), so the error variants only distinguish what goes into a message.
 */
use crate::core::tree_model::WireTreeNode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum FolderSourceError {
    Io(io::Error),
    Parse(serde_json::Error),
    Ignore(ignore::Error),
    InvalidRoot(PathBuf),
}

impl From<io::Error> for FolderSourceError {
    fn from(err: io::Error) -> Self {
        FolderSourceError::Io(err)
    }
}

impl From<serde_json::Error> for FolderSourceError {
    fn from(err: serde_json::Error) -> Self {
        FolderSourceError::Parse(err)
    }
}

impl From<ignore::Error> for FolderSourceError {
    fn from(err: ignore::Error) -> Self {
        FolderSourceError::Ignore(err)
    }
}

impl std::fmt::Display for FolderSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FolderSourceError::Io(e) => write!(f, "I/O error: {e}"),
            FolderSourceError::Parse(e) => write!(f, "Could not parse folder data: {e}"),
            FolderSourceError::Ignore(e) => write!(f, "Ignore pattern processing error: {e}"),
            FolderSourceError::InvalidRoot(p) => write!(f, "Not a directory: {p:?}"),
        }
    }
}

impl std::error::Error for FolderSourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FolderSourceError::Io(e) => Some(e),
            FolderSourceError::Parse(e) => Some(e),
            FolderSourceError::Ignore(e) => Some(e),
            FolderSourceError::InvalidRoot(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FolderSourceError>;

/*
 * One folder response: the tree plus estimated counts keyed by node key. Accurate
 * counts are only present when the source was asked to include them.
 */
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderPayload {
    #[serde(default)]
    pub tree: Vec<WireTreeNode>,
    #[serde(default, alias = "tokenCounts")]
    pub token_counts: HashMap<String, i64>,
    #[serde(default, alias = "accurateTokenCounts")]
    pub accurate_token_counts: HashMap<String, i64>,
}

impl FolderPayload {
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

pub trait FolderSourceOperations: Send + Sync {
    /* Fetches the folder tree; `refresh` asks the source to drop any cached scan. */
    fn fetch_folders(&self, refresh: bool) -> Result<FolderPayload>;

    /* Accurate counts for the given file keys. Unknown keys are left out. */
    fn fetch_accurate_token_counts(&self, paths: &[String]) -> Result<HashMap<String, i64>>;

    /* Folder tree with accurate counts for every file filled in. */
    fn fetch_folders_with_accurate_tokens(&self) -> Result<FolderPayload> {
        let mut payload = self.fetch_folders(false)?;
        let keys = leaf_keys_of(&payload.tree);
        payload.accurate_token_counts = self.fetch_accurate_token_counts(&keys)?;
        Ok(payload)
    }
}

fn leaf_keys_of(nodes: &[WireTreeNode]) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack: Vec<&WireTreeNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        match &node.children {
            None => out.push(node.key.clone()),
            Some(children) => stack.extend(children.iter().rev()),
        }
    }
    out
}

/* Reads a payload previously saved from a folder endpoint. */
pub struct JsonFolderSource {
    payload_path: PathBuf,
}

impl JsonFolderSource {
    pub fn new(payload_path: &Path) -> Self {
        JsonFolderSource {
            payload_path: payload_path.to_path_buf(),
        }
    }

    fn read_payload(&self) -> Result<FolderPayload> {
        let reader = BufReader::new(File::open(&self.payload_path)?);
        let payload: FolderPayload = serde_json::from_reader(reader)?;
        log::debug!(
            "JsonFolderSource: Read {} root nodes and {} counts from {:?}.",
            payload.tree.len(),
            payload.token_counts.len(),
            self.payload_path
        );
        Ok(payload)
    }
}

impl FolderSourceOperations for JsonFolderSource {
    fn fetch_folders(&self, _refresh: bool) -> Result<FolderPayload> {
        let mut payload = self.read_payload()?;
        payload.accurate_token_counts.clear();
        Ok(payload)
    }

    fn fetch_accurate_token_counts(&self, paths: &[String]) -> Result<HashMap<String, i64>> {
        let payload = self.read_payload()?;
        Ok(paths
            .iter()
            .filter_map(|p| {
                payload
                    .accurate_token_counts
                    .get(p)
                    .map(|count| (p.clone(), *count))
            })
            .collect())
    }
}
