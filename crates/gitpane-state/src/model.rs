use gitpane_core::domain::*;
use std::path::PathBuf;
use std::time::SystemTime;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum InitPhase {
    #[default]
    Uninitialized,
    EssentialsLoaded,
    FullyLoaded,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandLogEntry {
    pub time: SystemTime,
    pub ok: bool,
    pub command: String,
    pub output: String,
}

/// Published view of one repository. Collections are replaced wholesale on
/// every reload; nothing is patched in place.
#[derive(Clone, Debug, Default)]
pub struct RepoState {
    pub workdir: PathBuf,
    pub git_dir: PathBuf,
    pub is_bare: bool,

    pub phase: InitPhase,
    pub initializing: bool,

    pub current_branch: Option<String>,
    pub default_branch: Option<String>,
    pub branches: Vec<GitRef>,
    pub remote_branches: Vec<GitRef>,
    pub remotes: Vec<String>,
    pub tags: TagPage,

    pub history_scope: HistoryScope,
    pub commits: CommitWindow,

    pub status: RepoStatus,
    pub stashes: Vec<StashEntry>,
    pub submodules: Vec<Submodule>,

    pub diff_target: Option<DiffTarget>,
    pub diff_rev: u64,
    pub diff: Loadable<Diff>,

    pub live_reload: bool,
    pub last_error: Option<String>,
    pub command_log: Vec<CommandLogEntry>,
}

impl RepoState {
    pub fn new(workdir: PathBuf, git_dir: PathBuf, is_bare: bool) -> Self {
        Self {
            workdir,
            git_dir,
            is_bare,
            initializing: true,
            ..Self::default()
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase == InitPhase::FullyLoaded && !self.initializing
    }

    pub fn is_detached(&self) -> bool {
        self.current_branch.as_deref() == Some("HEAD")
    }

    pub fn push_command_log(&mut self, entry: CommandLogEntry, limit: usize) {
        self.command_log.push(entry);
        if self.command_log.len() > limit {
            let overflow = self.command_log.len() - limit;
            self.command_log.drain(..overflow);
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Loadable<T> {
    #[default]
    NotLoaded,
    Loading,
    Ready(T),
    Error(String),
}

impl<T> Loadable<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }
}
