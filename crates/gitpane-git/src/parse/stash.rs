use super::non_empty_lines;
use gitpane_core::domain::{CommitId, StashEntry};

/// `--format` argument matching [`parse_stashes`].
pub const STASH_FORMAT: &str = "--format=%gd|%H|%gs";

/// `stash list --format=%gd|%H|%gs`
///
/// The index comes from the `stash@{N}` selector when present, otherwise
/// from the line's position.
pub fn parse_stashes(output: &str) -> Vec<StashEntry> {
    let mut entries = Vec::new();
    for (position, line) in non_empty_lines(output).enumerate() {
        let mut parts = line.splitn(3, '|');
        let (Some(selector), Some(id)) = (parts.next(), parts.next()) else {
            continue;
        };
        let id = id.trim();
        if id.is_empty() {
            continue;
        }
        let message = parts.next().unwrap_or_default().to_string();
        entries.push(StashEntry {
            index: parse_selector_index(selector).unwrap_or(position),
            id: CommitId(id.to_string()),
            message,
        });
    }
    entries
}

fn parse_selector_index(selector: &str) -> Option<usize> {
    let start = selector.rfind("@{")? + 2;
    let end = selector[start..].find('}')? + start;
    selector[start..end].parse::<usize>().ok()
}
