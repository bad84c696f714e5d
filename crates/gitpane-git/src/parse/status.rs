use super::{non_empty_lines, unquote_path};
use gitpane_core::domain::{ChangedFile, FileStatusKind};

/// `diff [--cached] --name-status`
pub fn parse_name_status(output: &str, staged: bool) -> Vec<ChangedFile> {
    output
        .lines()
        .filter_map(|line| parse_name_status_line(line, staged))
        .collect()
}

/// One `status<TAB>path` line; renames and copies (`R100<TAB>old<TAB>new`)
/// resolve to the destination path. Quoted paths are decoded.
pub fn parse_name_status_line(line: &str, staged: bool) -> Option<ChangedFile> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    let mut parts = line.split('\t');
    let status = parts.next()?.trim();
    let code = status.chars().next()?;
    let status = FileStatusKind::from_code(code);

    let path = match status {
        FileStatusKind::Renamed | FileStatusKind::Copied => {
            let old = parts.next()?;
            parts.next().unwrap_or(old)
        }
        _ => parts.next()?,
    };
    if path.is_empty() {
        return None;
    }

    Some(ChangedFile {
        path: unquote_path(path),
        status,
        staged,
    })
}

/// `ls-files --others --exclude-standard`
pub fn parse_untracked(output: &str) -> Vec<ChangedFile> {
    non_empty_lines(output)
        .map(|path| ChangedFile {
            path: unquote_path(path),
            status: FileStatusKind::Untracked,
            staged: false,
        })
        .collect()
}
