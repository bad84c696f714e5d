use super::non_empty_lines;
use gitpane_core::domain::{GitRef, RefKind};

/// `branch --format=%(refname:short)`
pub fn parse_branches(output: &str) -> Vec<GitRef> {
    non_empty_lines(output)
        .filter(|line| !line.starts_with('('))
        .map(|line| GitRef::new(line, RefKind::LocalBranch))
        .collect()
}

/// `branch -r --format=%(refname:short)`
///
/// Skips the symbolic `<remote>/HEAD` entry, which newer git versions
/// print as the bare remote name.
pub fn parse_remote_branches(output: &str) -> Vec<GitRef> {
    non_empty_lines(output)
        .filter(|line| line.contains('/') && !line.ends_with("/HEAD"))
        .map(|line| GitRef::new(line, RefKind::RemoteBranch))
        .collect()
}

/// `remote`
pub fn parse_remotes(output: &str) -> Vec<String> {
    non_empty_lines(output).map(str::to_string).collect()
}

/// `tag -l --sort=-version:refname`; order is preserved.
pub fn parse_tags(output: &str) -> Vec<GitRef> {
    non_empty_lines(output)
        .map(|line| GitRef::new(line, RefKind::Tag))
        .collect()
}

/// `symbolic-ref --short HEAD`; `None` for a detached HEAD or a failed call.
pub fn parse_current_branch(output: &str) -> Option<String> {
    let line = non_empty_lines(output).next()?;
    if line.starts_with("fatal") || line.starts_with("error") || line.contains(' ') {
        return None;
    }
    Some(line.to_string())
}

/// `symbolic-ref refs/remotes/origin/HEAD` (`refs/remotes/origin/main` -> `main`).
pub fn parse_default_branch(output: &str) -> Option<String> {
    let line = non_empty_lines(output).next()?;
    let rest = line.strip_prefix("refs/remotes/")?;
    let (_, branch) = rest.split_once('/')?;
    if branch.is_empty() {
        return None;
    }
    Some(branch.to_string())
}

/// `branch --list <names>` output, with the `*`/`+` markers stripped.
pub fn parse_branch_list(output: &str) -> Vec<String> {
    non_empty_lines(output)
        .map(|line| line.trim_start_matches(['*', '+']).trim())
        .filter(|name| !name.is_empty() && !name.starts_with('('))
        .map(str::to_string)
        .collect()
}
