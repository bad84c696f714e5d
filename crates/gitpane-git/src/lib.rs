pub mod parse;
mod repo;
mod runner;

pub use repo::{RepoHandle, resolve_git_dir};
pub use runner::CliRunner;
