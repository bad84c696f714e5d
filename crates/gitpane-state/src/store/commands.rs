use super::{Shared, argv, path_arg};
use crate::model::CommandLogEntry;
use crate::msg::Topic;
use gitpane_core::domain::*;
use gitpane_core::error::{Error, ErrorKind, GitOp};
use gitpane_core::services::{CommandOutput, Result};
use gitpane_git::parse::{is_failure, parse_current_branch};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// What to reload after a successful mutation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum Reload {
    Head,
    Refs,
    Index,
    Commits,
    Stashes,
}

const NO_UPSTREAM_MARKERS: &[&str] = &["no upstream branch", "has no upstream"];

fn with_paths(mut args: Vec<String>, paths: &[PathBuf]) -> Vec<String> {
    args.push("--".to_string());
    args.extend(paths.iter().map(|p| path_arg(p)));
    args
}

/// Relative and free of `..`, so it can only name something inside the
/// working tree.
fn is_workdir_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

fn remove_untracked(workdir: &Path, paths: &[PathBuf]) {
    for path in paths {
        if !is_workdir_relative(path) {
            log::warn!("refusing to delete {}", path.display());
            continue;
        }
        let full = workdir.join(path);
        let res = if full.is_dir() {
            fs::remove_dir_all(&full)
        } else {
            fs::remove_file(&full)
        };
        if let Err(e) = res {
            log::debug!("could not delete {}: {e}", full.display());
        }
    }
}

impl Shared {
    /// Classifies combined output with the operation's failure markers and
    /// records the attempt in the command log.
    fn classify(&self, op: GitOp, out: CommandOutput) -> Result<CommandOutput> {
        let text = out.combined();
        let failed = is_failure(&text, op.failure_markers());
        let error = failed.then(|| format!("{op} failed: {text}"));
        self.record(&out, !failed, text.clone(), error);

        if failed {
            log::warn!("`{}` failed: {text}", out.command);
            return Err(Error::new(ErrorKind::Command { op, output: text }));
        }
        log::debug!("`{}` ok", out.command);
        Ok(out)
    }

    /// Appends to the command log; `error` also becomes `last_error`.
    fn record(&self, out: &CommandOutput, ok: bool, text: String, error: Option<String>) {
        let entry = CommandLogEntry {
            time: SystemTime::now(),
            ok,
            command: out.command.clone(),
            output: text,
        };
        let limit = self.config.command_log_limit;
        self.publish(Topic::CommandLog, move |state| {
            state.push_command_log(entry, limit);
            if let Some(error) = error {
                state.last_error = Some(error);
            }
        });
    }

    async fn run_op(&self, op: GitOp, args: Vec<String>) -> Result<CommandOutput> {
        let out = self.git_output(args).await;
        self.classify(op, out)
    }

    /// Fire-and-forget reload, tracked for `settle`.
    pub(super) fn schedule_reload(self: &Arc<Self>, reloads: &'static [Reload]) {
        let shared = Arc::clone(self);
        self.spawn_tracked(async move {
            for reload in reloads {
                match reload {
                    Reload::Head => {
                        shared.load_current_branch().await;
                    }
                    Reload::Refs => shared.load_refs().await,
                    Reload::Index => shared.reload_index().await,
                    Reload::Commits => {
                        shared.load_commits().await;
                    }
                    Reload::Stashes => shared.load_stashes().await,
                }
            }
        });
    }

    pub(super) async fn stage(self: &Arc<Self>, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        self.run_op(GitOp::Stage, with_paths(argv(["add"]), paths))
            .await?;
        self.schedule_reload(&[Reload::Index]);
        Ok(())
    }

    pub(super) async fn unstage(self: &Arc<Self>, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        self.run_op(GitOp::Unstage, with_paths(argv(["reset", "HEAD"]), paths))
            .await?;
        self.schedule_reload(&[Reload::Index]);
        Ok(())
    }

    /// Tracked files are restored with `checkout --`; untracked files are
    /// deleted from the working tree, ignoring individual delete failures.
    pub(super) async fn discard(self: &Arc<Self>, files: &[ChangedFile]) -> Result<()> {
        let (untracked, tracked): (Vec<&ChangedFile>, Vec<&ChangedFile>) =
            files.iter().partition(|file| file.is_untracked());

        if !untracked.is_empty() {
            let workdir = self.repo.workdir().to_path_buf();
            let paths = untracked
                .iter()
                .map(|file| file.path.clone())
                .collect::<Vec<_>>();
            self.executor
                .run(move || remove_untracked(&workdir, &paths))
                .await;
        }

        let result = if tracked.is_empty() {
            Ok(())
        } else {
            let paths = tracked
                .iter()
                .map(|file| file.path.clone())
                .collect::<Vec<_>>();
            self.run_op(GitOp::Discard, with_paths(argv(["checkout"]), &paths))
                .await
                .map(|_| ())
        };

        if result.is_ok() || !untracked.is_empty() {
            self.schedule_reload(&[Reload::Index]);
        }
        result
    }

    pub(super) async fn commit(self: &Arc<Self>, message: &str, amend: bool) -> Result<()> {
        let mut args = argv(["commit", "-m", message]);
        if amend {
            args.push("--amend".to_string());
        }
        self.run_op(GitOp::Commit, args).await?;
        self.schedule_reload(&[Reload::Index, Reload::Commits, Reload::Head]);
        Ok(())
    }

    pub(super) async fn checkout(self: &Arc<Self>, name: &str) -> Result<()> {
        self.run_op(GitOp::Checkout, argv(["checkout", name]))
            .await?;
        self.schedule_reload(&[Reload::Head, Reload::Refs, Reload::Commits]);
        Ok(())
    }

    pub(super) async fn create_branch(
        self: &Arc<Self>,
        name: &str,
        start_point: Option<&str>,
    ) -> Result<()> {
        let mut args = argv(["branch", name]);
        args.extend(start_point.map(str::to_string));
        self.run_op(GitOp::CreateBranch, args).await?;
        self.schedule_reload(&[Reload::Refs]);
        Ok(())
    }

    pub(super) async fn create_tag(
        self: &Arc<Self>,
        name: &str,
        message: Option<&str>,
        target: Option<&str>,
    ) -> Result<()> {
        let mut args = match message {
            Some(message) => argv(["tag", "-a", name, "-m", message]),
            None => argv(["tag", name]),
        };
        args.extend(target.map(str::to_string));
        self.run_op(GitOp::CreateTag, args).await?;
        self.schedule_reload(&[Reload::Refs, Reload::Commits]);
        Ok(())
    }

    pub(super) async fn delete_ref(self: &Arc<Self>, git_ref: &GitRef) -> Result<()> {
        let args = match git_ref.kind {
            RefKind::LocalBranch => argv(["branch", "-d", git_ref.name.as_str()]),
            RefKind::Tag => argv(["tag", "-d", git_ref.name.as_str()]),
            RefKind::RemoteBranch => {
                let Some(remote) = git_ref.remote() else {
                    return Err(Error::new(ErrorKind::InvalidReference(git_ref.name.clone())));
                };
                argv(["push", remote, "--delete", git_ref.display_name()])
            }
            RefKind::Stash | RefKind::Head | RefKind::Other => {
                return Err(Error::new(ErrorKind::InvalidReference(git_ref.name.clone())));
            }
        };
        self.run_op(GitOp::DeleteRef, args).await?;
        self.schedule_reload(&[Reload::Refs, Reload::Commits]);
        Ok(())
    }

    pub(super) async fn fetch(self: &Arc<Self>, remote: Option<&str>) -> Result<()> {
        let args = argv(["fetch", remote.unwrap_or("--all")]);
        self.run_op(GitOp::Fetch, args).await?;
        self.schedule_reload(&[Reload::Refs, Reload::Commits]);
        Ok(())
    }

    pub(super) async fn pull(self: &Arc<Self>, rebase: bool, remote: Option<&str>) -> Result<()> {
        let mut args = argv(["pull"]);
        if rebase {
            args.push("--rebase".to_string());
        }
        args.extend(remote.map(str::to_string));
        self.run_op(GitOp::Pull, args).await?;
        self.schedule_reload(&[
            Reload::Head,
            Reload::Refs,
            Reload::Index,
            Reload::Commits,
        ]);
        Ok(())
    }

    /// Retries once with `--set-upstream` when the branch has no upstream.
    pub(super) async fn push(
        self: &Arc<Self>,
        remote: Option<&str>,
        branch: Option<&str>,
    ) -> Result<()> {
        let mut args = argv(["push"]);
        args.extend(remote.map(str::to_string));
        args.extend(branch.map(str::to_string));
        let out = self.git_output(args).await;

        let out = if is_failure(&out.combined(), NO_UPSTREAM_MARKERS) {
            match self.upstream_target(branch).await {
                Some(target) => {
                    log::info!("no upstream for {target}; retrying with --set-upstream");
                    // The first attempt stays visible in the log; the retry decides the outcome.
                    self.record(&out, false, out.combined(), None);
                    let remote = remote.unwrap_or("origin");
                    self.git_output(argv([
                        "push",
                        "--set-upstream",
                        remote,
                        target.as_str(),
                    ]))
                    .await
                }
                None => out,
            }
        } else {
            out
        };

        self.classify(GitOp::Push, out)?;
        self.schedule_reload(&[Reload::Refs]);
        Ok(())
    }

    async fn upstream_target(&self, branch: Option<&str>) -> Option<String> {
        if let Some(branch) = branch {
            return Some(branch.to_string());
        }
        let out = self
            .git_stdout(argv(["symbolic-ref", "--short", "HEAD"]))
            .await;
        parse_current_branch(&out)
    }

    pub(super) async fn stash_push(
        self: &Arc<Self>,
        message: Option<&str>,
        keep_index: bool,
    ) -> Result<()> {
        let mut args = argv(["stash", "push"]);
        if keep_index {
            args.push("--keep-index".to_string());
        }
        if let Some(message) = message {
            args.extend(argv(["-m", message]));
        }
        self.run_op(GitOp::StashPush, args).await?;
        self.schedule_reload(&[Reload::Stashes, Reload::Index]);
        Ok(())
    }

    pub(super) async fn stash_pop(self: &Arc<Self>, index: Option<usize>) -> Result<()> {
        let mut args = argv(["stash", "pop"]);
        args.extend(index.map(stash_selector));
        self.run_op(GitOp::StashPop, args).await?;
        self.schedule_reload(&[Reload::Stashes, Reload::Index]);
        Ok(())
    }

    pub(super) async fn stash_apply(self: &Arc<Self>, index: Option<usize>) -> Result<()> {
        let mut args = argv(["stash", "apply"]);
        args.extend(index.map(stash_selector));
        self.run_op(GitOp::StashApply, args).await?;
        self.schedule_reload(&[Reload::Stashes, Reload::Index]);
        Ok(())
    }

    pub(super) async fn stash_drop(self: &Arc<Self>, index: usize) -> Result<()> {
        let args = argv(["stash".to_string(), "drop".to_string(), stash_selector(index)]);
        self.run_op(GitOp::StashDrop, args).await?;
        self.schedule_reload(&[Reload::Stashes]);
        Ok(())
    }
}
