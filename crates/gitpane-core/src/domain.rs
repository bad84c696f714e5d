use chrono::{DateTime, FixedOffset};
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RefKind {
    LocalBranch,
    RemoteBranch,
    Tag,
    Stash,
    Head,
    Other,
}

/// A named pointer to a commit.
///
/// Two refs are the same ref when their name and kind match; the target is
/// informational and does not take part in equality.
#[derive(Clone, Debug)]
pub struct GitRef {
    pub name: String,
    pub kind: RefKind,
    pub target: Option<String>,
}

impl GitRef {
    pub fn new(name: impl Into<String>, kind: RefKind) -> Self {
        Self {
            name: name.into(),
            kind,
            target: None,
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self::new(name, RefKind::LocalBranch)
    }

    pub fn remote_branch(name: impl Into<String>) -> Self {
        Self::new(name, RefKind::RemoteBranch)
    }

    pub fn tag(name: impl Into<String>) -> Self {
        Self::new(name, RefKind::Tag)
    }

    /// Name without the remote prefix for remote branches (`origin/main` -> `main`).
    pub fn display_name(&self) -> &str {
        match self.kind {
            RefKind::RemoteBranch => self
                .name
                .split_once('/')
                .map(|(_, rest)| rest)
                .unwrap_or(&self.name),
            _ => &self.name,
        }
    }

    /// Remote part of a remote-branch name, if it has one.
    pub fn remote(&self) -> Option<&str> {
        if self.kind != RefKind::RemoteBranch {
            return None;
        }
        let (remote, rest) = self.name.split_once('/')?;
        if remote.is_empty() || rest.is_empty() {
            return None;
        }
        Some(remote)
    }
}

impl PartialEq for GitRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

impl Eq for GitRef {}

impl Hash for GitRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.kind.hash(state);
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CommitId(pub String);

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Commit {
    pub id: CommitId,
    pub short_id: String,
    pub subject: String,
    pub author_name: String,
    pub author_email: String,
    /// Author date as printed by `%aI`.
    pub date: String,
    pub parent_ids: Vec<CommitId>,
    pub refs: Vec<GitRef>,
}

impl Commit {
    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(self.date.trim()).ok()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FileStatusKind {
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    Untracked,
    Unmerged,
    TypeChanged,
}

impl FileStatusKind {
    pub fn from_code(code: char) -> Self {
        match code {
            'A' => Self::Added,
            'D' => Self::Deleted,
            'R' => Self::Renamed,
            'C' => Self::Copied,
            'U' => Self::Unmerged,
            'T' => Self::TypeChanged,
            '?' => Self::Untracked,
            _ => Self::Modified,
        }
    }
}

/// One side of a path's change. A partially staged file shows up twice, once
/// with `staged == true` and once with `staged == false`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ChangedFile {
    pub path: PathBuf,
    pub status: FileStatusKind,
    pub staged: bool,
}

impl ChangedFile {
    pub fn is_untracked(&self) -> bool {
        self.status == FileStatusKind::Untracked
    }

    pub fn same_entry(&self, other: &ChangedFile) -> bool {
        self.path == other.path && self.staged == other.staged
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RepoStatus {
    pub staged: Vec<ChangedFile>,
    pub unstaged: Vec<ChangedFile>,
}

impl RepoStatus {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty()
    }
}

/// Only valid right after listing: any pop/drop/apply shifts the indices.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StashEntry {
    pub index: usize,
    pub id: CommitId,
    pub message: String,
}

impl StashEntry {
    pub fn selector(&self) -> String {
        stash_selector(self.index)
    }
}

pub fn stash_selector(index: usize) -> String {
    format!("stash@{{{index}}}")
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Submodule {
    pub path: PathBuf,
    pub id: CommitId,
    pub status: char,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TreeEntry {
    pub mode: String,
    pub kind: String,
    pub object: String,
    pub size: Option<u64>,
    pub path: PathBuf,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TagPage {
    pub loaded: Vec<GitRef>,
    pub total: usize,
}

impl TagPage {
    pub fn has_more(&self) -> bool {
        self.loaded.len() < self.total
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommitWindow {
    pub commits: Vec<Commit>,
    pub requested_limit: usize,
    pub has_more: bool,
}

impl CommitWindow {
    pub fn from_page(commits: Vec<Commit>, requested_limit: usize) -> Self {
        let has_more = commits.len() >= requested_limit;
        Self {
            commits,
            requested_limit,
            has_more,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum HistoryScope {
    #[default]
    All,
    LocalAndRemote,
    Ref(String),
}

impl HistoryScope {
    pub fn args(&self) -> Vec<String> {
        match self {
            Self::All => vec!["--all".to_string()],
            Self::LocalAndRemote => vec!["--branches".to_string(), "--remotes".to_string()],
            Self::Ref(name) => vec![name.clone()],
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DiffTarget {
    Commit { id: CommitId },
    WorkingTree { path: PathBuf, staged: bool },
    Refs { from: String, to: String },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diff {
    pub target: DiffTarget,
    pub lines: Vec<DiffLine>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub text: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DiffLineKind {
    Header,
    Hunk,
    Add,
    Remove,
    Context,
}

impl Diff {
    pub fn from_unified(target: DiffTarget, text: &str) -> Self {
        let mut lines = Vec::new();

        for raw in text.lines() {
            let kind = if raw.starts_with("@@") {
                DiffLineKind::Hunk
            } else if raw.starts_with("diff ")
                || raw.starts_with("index ")
                || raw.starts_with("--- ")
                || raw.starts_with("+++ ")
                || raw.starts_with("new file mode ")
                || raw.starts_with("deleted file mode ")
                || raw.starts_with("similarity index ")
                || raw.starts_with("rename from ")
                || raw.starts_with("rename to ")
                || raw.starts_with("Binary files ")
            {
                DiffLineKind::Header
            } else if raw.starts_with('+') {
                DiffLineKind::Add
            } else if raw.starts_with('-') {
                DiffLineKind::Remove
            } else {
                DiffLineKind::Context
            };

            lines.push(DiffLine {
                kind,
                text: raw.to_string(),
            });
        }

        Self { target, lines }
    }

    pub fn added_lines(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.kind == DiffLineKind::Add)
            .count()
    }

    pub fn removed_lines(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.kind == DiffLineKind::Remove)
            .count()
    }
}
