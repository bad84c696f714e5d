//! Pure parsers turning `git` output into domain records.
//!
//! Every parser is total: empty or unrecognised input produces an empty
//! result instead of an error.

mod log;
mod refs;
mod stash;
mod status;
mod submodules;
mod tree;

pub use log::{LOG_FORMAT, parse_commit_line, parse_commits, parse_decorations};
pub use refs::{
    parse_branch_list, parse_branches, parse_current_branch, parse_default_branch,
    parse_remote_branches, parse_remotes, parse_tags,
};
pub use stash::{STASH_FORMAT, parse_stashes};
pub use status::{parse_name_status, parse_name_status_line, parse_untracked};
pub use submodules::parse_submodules;
pub use tree::parse_tree;

use std::path::PathBuf;

/// Substring-based failure check on combined tool output.
pub fn is_failure(output: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| output.contains(marker))
}

/// Undoes git's C-style path quoting (`core.quotePath`): a field wrapped in
/// `"` has its octal and backslash escapes decoded. Other text is taken as is.
pub fn unquote_path(field: &str) -> PathBuf {
    PathBuf::from(unquote(field))
}

fn unquote(field: &str) -> String {
    let Some(inner) = field
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return field.to_string();
    };

    let bytes = inner.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 == bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let escaped = match bytes[i + 1] {
            b'n' => Some(b'\n'),
            b't' => Some(b'\t'),
            b'r' => Some(b'\r'),
            b'a' => Some(0x07),
            b'b' => Some(0x08),
            b'f' => Some(0x0c),
            b'v' => Some(0x0b),
            b'"' => Some(b'"'),
            b'\\' => Some(b'\\'),
            _ => None,
        };
        if let Some(byte) = escaped {
            out.push(byte);
            i += 2;
        } else if let Some(byte) = octal_escape(&bytes[i + 1..]) {
            out.push(byte);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// `\NNN` with the first digit at most 3, so the value fits in a byte.
fn octal_escape(digits: &[u8]) -> Option<u8> {
    let &[a @ b'0'..=b'3', b @ b'0'..=b'7', c @ b'0'..=b'7', ..] = digits else {
        return None;
    };
    Some(((a - b'0') << 6) | ((b - b'0') << 3) | (c - b'0'))
}

fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}
