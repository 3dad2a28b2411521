/*
 * The platform-agnostic part of the crate: the folder tree model, selection
 * reconciliation, token indexing and accounting, and the scroll-follow state
 * machine, together with the folder sources and settings persistence that feed
 * them. Nothing here renders anything; `app_logic` drives these types.
 */
pub mod checksum_utils;
pub mod config;
pub mod file_system;
pub mod folder_source;
pub mod path_utils;
pub mod scroll_follower;
pub mod selection;
pub mod token_accountant;
pub mod token_index;
pub mod tokenizer_utils;
pub mod tree_model;
pub mod versioning;

pub use config::{CoreSettingsManager, SettingsError, SettingsManagerOperations, Theme, UiSettings};

pub use file_system::CoreLocalFolderSource;
pub use folder_source::{FolderPayload, FolderSourceError, FolderSourceOperations, JsonFolderSource};

pub use scroll_follower::{
    FollowerConfig, LayoutDirection, ScrollDecision, ScrollFollower, ViewportMetrics,
};

pub use selection::{
    CheckState, ReconcilerConfig, SelectionReconciler, SelectionSet, ToggleOutcome,
};

pub use token_accountant::{TokenAccountant, TokenTally};
pub use token_index::{LeafTokens, TokenIndex};

pub use tokenizer_utils::{CharHeuristicTokenCounter, CoreTikTokenCounter, TokenCounterOperations};

pub use tree_model::{TreeModel, TreeNode, WireTreeNode};
