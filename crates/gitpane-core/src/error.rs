use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Raw tool output attached to a failed command, if any.
    pub fn output(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::Command { output, .. } => Some(output),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io(err.kind()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("i/o error: {0:?}")]
    Io(std::io::ErrorKind),
    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),
    #[error("{op} failed: {output}")]
    Command { op: GitOp, output: String },
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error("file watcher: {0}")]
    Watch(String),
}

/// The mutating operation a command failure belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum GitOp {
    Stage,
    Unstage,
    Discard,
    Commit,
    Checkout,
    CreateBranch,
    CreateTag,
    DeleteRef,
    Fetch,
    Pull,
    Push,
    StashPush,
    StashPop,
    StashApply,
    StashDrop,
}

impl GitOp {
    pub fn label(self) -> &'static str {
        match self {
            Self::Stage => "stage",
            Self::Unstage => "unstage",
            Self::Discard => "discard",
            Self::Commit => "commit",
            Self::Checkout => "checkout",
            Self::CreateBranch => "create branch",
            Self::CreateTag => "create tag",
            Self::DeleteRef => "delete ref",
            Self::Fetch => "fetch",
            Self::Pull => "pull",
            Self::Push => "push",
            Self::StashPush => "stash",
            Self::StashPop => "stash pop",
            Self::StashApply => "stash apply",
            Self::StashDrop => "stash drop",
        }
    }

    /// Substrings in combined output that mark this operation as failed.
    pub fn failure_markers(self) -> &'static [&'static str] {
        match self {
            Self::Pull => &["fatal", "error", "CONFLICT"],
            Self::Push => &["fatal", "error", "rejected"],
            Self::StashPop | Self::StashApply => &["CONFLICT", "fatal", "error"],
            _ => &["fatal", "error"],
        }
    }
}

impl fmt::Display for GitOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_error_carries_raw_output() {
        let err = Error::new(ErrorKind::Command {
            op: GitOp::Checkout,
            output: "error: pathspec 'nope' did not match".into(),
        });
        assert_eq!(err.output(), Some("error: pathspec 'nope' did not match"));
        assert_eq!(
            err.to_string(),
            "checkout failed: error: pathspec 'nope' did not match"
        );
    }

    #[test]
    fn push_and_pull_have_extra_markers() {
        assert!(GitOp::Push.failure_markers().contains(&"rejected"));
        assert!(GitOp::Pull.failure_markers().contains(&"CONFLICT"));
        assert!(!GitOp::Stage.failure_markers().contains(&"CONFLICT"));
    }
}
