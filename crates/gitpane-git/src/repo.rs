use gitpane_core::error::{Error, ErrorKind};
use gitpane_core::services::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// An opened repository: its working tree and metadata directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RepoHandle {
    workdir: PathBuf,
    git_dir: PathBuf,
    is_bare: bool,
}

impl RepoHandle {
    /// Accepts either a working tree or the metadata directory itself.
    pub fn open(path: &Path) -> Result<Self> {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let (workdir, git_dir) = if looks_like_git_dir(&path) {
            let workdir = match path.parent() {
                Some(parent) if path.file_name().is_some_and(|n| n == ".git") => {
                    parent.to_path_buf()
                }
                _ => path.clone(),
            };
            (workdir, path)
        } else {
            let Some(git_dir) = resolve_git_dir(&path) else {
                return Err(Error::new(ErrorKind::NotARepository(path)));
            };
            if !git_dir.is_dir() {
                return Err(Error::new(ErrorKind::NotARepository(path)));
            }
            (path, git_dir)
        };

        let is_bare = read_bare_flag(&git_dir);
        Ok(Self {
            workdir,
            git_dir,
            is_bare,
        })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn is_bare(&self) -> bool {
        self.is_bare
    }
}

fn looks_like_git_dir(path: &Path) -> bool {
    path.join("HEAD").is_file() && path.join("objects").is_dir()
}

/// Locates the metadata directory of a working tree, following `.git` files
/// (`gitdir: <path>`) used by linked worktrees and submodules. The result is
/// canonical when the directory exists.
pub fn resolve_git_dir(workdir: &Path) -> Option<PathBuf> {
    let dot_git = workdir.join(".git");
    let md = fs::metadata(&dot_git).ok()?;

    if md.is_dir() {
        return Some(canonical(dot_git));
    }

    if !md.is_file() {
        return None;
    }

    let contents = fs::read_to_string(&dot_git).ok()?;
    let line = contents.lines().next()?.trim();
    let gitdir = line.strip_prefix("gitdir:")?.trim();
    if gitdir.is_empty() {
        return None;
    }

    let path = PathBuf::from(gitdir);
    if path.is_absolute() {
        Some(canonical(path))
    } else {
        Some(canonical(workdir.join(path)))
    }
}

fn canonical(path: PathBuf) -> PathBuf {
    path.canonicalize().unwrap_or(path)
}

fn read_bare_flag(git_dir: &Path) -> bool {
    let Ok(config) = fs::read_to_string(git_dir.join("config")) else {
        return false;
    };
    parse_bare_flag(&config)
}

fn parse_bare_flag(config: &str) -> bool {
    let mut in_core = false;
    for line in config.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_core = line.trim_start_matches('[').trim_end_matches(']').trim() == "core";
            continue;
        }
        if !in_core {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("bare") {
            return value.trim().eq_ignore_ascii_case("true");
        }
    }
    false
}
