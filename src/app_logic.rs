/*
 * Application-level state objects that a front-end drives: `FolderSession` for the
 * folder explorer (tree, selection, token tallies, fetch cycle and notifications)
 * and `ChatViewport` for the scroll-following chat list. `tree_rows` turns a
 * session into display rows.
 */
pub mod chat_viewport;
pub mod folder_session;
pub mod tree_rows;

pub use chat_viewport::ChatViewport;
pub use folder_session::{ApplyOutcome, FolderSession, Notification, RenderId, Severity};
pub use tree_rows::{TreeRow, format_row, format_total};
