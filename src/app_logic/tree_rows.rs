/*
 * Flat, display-ready rows for the folder tree, and their plain-text rendering
 * for terminal output.
 */
use crate::core::{CheckState, TokenTally};
use std::fmt::Write;

pub const INDENT_PER_LEVEL: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub key: String,
    pub title: String,
    pub depth: usize,
    pub is_dir: bool,
    pub check: CheckState,
    pub tally: TokenTally,
}

pub fn check_marker(check: CheckState) -> &'static str {
    match check {
        CheckState::Checked => "[x]",
        CheckState::Indeterminate => "[-]",
        CheckState::Unchecked => "[ ]",
    }
}

/*
 * `  [-] src/  120/450` style line. Directories get a trailing slash; nodes with
 * tool-backed files are flagged with how many there are.
 */
pub fn format_row(row: &TreeRow) -> String {
    let mut line = String::new();
    let indent = " ".repeat(row.depth * INDENT_PER_LEVEL);
    let suffix = if row.is_dir { "/" } else { "" };
    let _ = write!(
        line,
        "{indent}{} {}{suffix}  {}/{}",
        check_marker(row.check),
        row.title,
        row.tally.included,
        row.tally.total
    );
    match (row.is_dir, row.tally.tool_backed_files) {
        (_, 0) => {}
        (false, _) => line.push_str("  (tool)"),
        (true, n) => {
            let _ = write!(line, "  ({n} tool)");
        }
    }
    line
}

pub fn format_total(total: &TokenTally) -> String {
    format!("Total: {}/{} tokens", total.included, total.total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(depth: usize, is_dir: bool, check: CheckState, tally: TokenTally) -> TreeRow {
        TreeRow {
            key: "k".to_string(),
            title: "src".to_string(),
            depth,
            is_dir,
            check,
            tally,
        }
    }

    #[test]
    fn test_directory_row() {
        let tally = TokenTally {
            included: 100,
            total: 150,
            tool_backed_files: 0,
        };
        assert_eq!(
            format_row(&row(1, true, CheckState::Indeterminate, tally)),
            "  [-] src/  100/150"
        );
    }

    #[test]
    fn test_tool_backed_markers() {
        let file = TokenTally {
            included: 0,
            total: 0,
            tool_backed_files: 1,
        };
        assert_eq!(
            format_row(&row(0, false, CheckState::Checked, file)),
            "[x] src  0/0  (tool)"
        );
        let dir = TokenTally {
            tool_backed_files: 3,
            ..file
        };
        assert_eq!(
            format_row(&row(0, true, CheckState::Unchecked, dir)),
            "[ ] src/  0/0  (3 tool)"
        );
    }

    #[test]
    fn test_total_line() {
        let total = TokenTally {
            included: 7,
            total: 9,
            tool_backed_files: 0,
        };
        assert_eq!(format_total(&total), "Total: 7/9 tokens");
    }
}
