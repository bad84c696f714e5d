use super::unquote_path;
use gitpane_core::domain::{CommitId, Submodule};

/// `submodule status`: `<marker><sha> <path>[ (<describe>)]`.
pub fn parse_submodules(output: &str) -> Vec<Submodule> {
    output.lines().filter_map(parse_submodule_line).collect()
}

fn parse_submodule_line(line: &str) -> Option<Submodule> {
    let line = line.trim_end();
    let mut chars = line.chars();
    let status = chars.next()?;
    if !matches!(status, ' ' | '-' | '+' | 'U') {
        return None;
    }

    let (sha, rest) = chars.as_str().split_once(' ')?;
    if sha.is_empty() || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let path = match rest.rfind(" (") {
        Some(idx) if rest.ends_with(')') => &rest[..idx],
        _ => rest,
    };
    if path.is_empty() {
        return None;
    }

    Some(Submodule {
        path: unquote_path(path),
        id: CommitId(sha.to_string()),
        status,
    })
}
