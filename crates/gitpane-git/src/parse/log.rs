use gitpane_core::domain::{Commit, CommitId, GitRef, RefKind};

/// `--format` argument matching [`parse_commit_line`].
pub const LOG_FORMAT: &str = "--format=%H|%h|%s|%an|%ae|%aI|%P|%D";

const FIELD_COUNT: usize = 8;
const MIN_FIELDS: usize = 6;

pub fn parse_commits(output: &str) -> Vec<Commit> {
    output.lines().filter_map(parse_commit_line).collect()
}

/// Parses one `%H|%h|%s|%an|%ae|%aI|%P|%D` line.
///
/// Lines with fewer than six fields are rejected. A subject containing `|`
/// splits into extra fields; those are folded back into the subject.
pub fn parse_commit_line(line: &str) -> Option<Commit> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields: Vec<&str> = line.split('|').collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let subject = if fields.len() > FIELD_COUNT {
        let extra = fields.len() - FIELD_COUNT;
        let subject = fields[2..=2 + extra].join("|");
        fields.drain(3..=2 + extra);
        subject
    } else {
        fields[2].to_string()
    };

    let id = fields[0].trim();
    if id.is_empty() {
        return None;
    }

    let parent_ids = fields
        .get(6)
        .map(|parents| {
            parents
                .split_whitespace()
                .map(|p| CommitId(p.to_string()))
                .collect()
        })
        .unwrap_or_default();
    let refs = fields
        .get(7)
        .map(|decorations| parse_decorations(decorations))
        .unwrap_or_default();

    Some(Commit {
        id: CommitId(id.to_string()),
        short_id: fields[1].to_string(),
        subject,
        author_name: fields[3].to_string(),
        author_email: fields[4].to_string(),
        date: fields[5].to_string(),
        parent_ids,
        refs,
    })
}

/// Decodes `%D` decorations (`HEAD -> main, tag: v1.0, origin/main`).
///
/// Anything containing `/` that is not a `HEAD ->` or `tag:` entry is taken
/// to be a remote branch, so a local branch named `feature/x` is reported as
/// remote.
pub fn parse_decorations(text: &str) -> Vec<GitRef> {
    let mut refs = Vec::new();
    for raw in text.split(',') {
        let item = raw.trim();
        if item.is_empty() || item == "HEAD" {
            continue;
        }
        if let Some(branch) = item.strip_prefix("HEAD -> ") {
            let branch = branch.trim();
            if !branch.is_empty() {
                refs.push(GitRef::new(branch, RefKind::LocalBranch));
            }
        } else if let Some(tag) = item.strip_prefix("tag: ") {
            let tag = tag.trim();
            if !tag.is_empty() {
                refs.push(GitRef::new(tag, RefKind::Tag));
            }
        } else if item.contains('/') {
            if item.ends_with("/HEAD") {
                continue;
            }
            refs.push(GitRef::new(item, RefKind::RemoteBranch));
        } else {
            refs.push(GitRef::new(item, RefKind::LocalBranch));
        }
    }
    refs
}
