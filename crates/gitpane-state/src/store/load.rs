use super::{Latch, Shared, argv, path_arg};
use crate::model::InitPhase;
use crate::msg::Topic;
use gitpane_core::domain::*;
use gitpane_git::parse::{
    LOG_FORMAT, STASH_FORMAT, parse_branch_list, parse_branches, parse_commits,
    parse_current_branch, parse_default_branch, parse_name_status, parse_remote_branches,
    parse_remotes, parse_stashes, parse_submodules, parse_tags, parse_tree, parse_untracked,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;

/// Published for the current branch when HEAD is detached.
const DETACHED_HEAD: &str = "HEAD";
const FALLBACK_DEFAULT_BRANCH: &str = "main";

fn tag_args() -> Vec<String> {
    argv(["tag", "-l", "--sort=-version:refname"])
}

fn first_tags(all: Vec<GitRef>, limit: usize) -> TagPage {
    let total = all.len();
    TagPage {
        loaded: all.into_iter().take(limit).collect(),
        total,
    }
}

impl Shared {
    pub(super) async fn initialize(self: &Arc<Self>) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            log::debug!("initialize called twice; ignoring");
            return;
        }

        tokio::join!(self.load_current_branch(), self.detect_default_branch());
        self.publish(Topic::Phase, |state| state.phase = InitPhase::EssentialsLoaded);
        log::info!("essentials loaded for {}", self.repo.workdir().display());

        tokio::join!(self.load_refs(), self.reload_index());
        self.publish(Topic::Phase, |state| {
            state.initializing = false;
            state.phase = InitPhase::FullyLoaded;
        });
        log::info!("fully loaded {}", self.repo.workdir().display());

        self.load_commits().await;

        if self.config.live_reload {
            self.start_watcher();
        }

        let shared = Arc::clone(self);
        self.spawn_tracked(async move {
            tokio::join!(shared.load_stashes(), shared.load_submodules());
        });
    }

    /// Everything except the diff, in initialization order.
    pub(super) async fn refresh(&self) {
        tokio::join!(self.load_current_branch(), self.load_refs(), self.reload_index());
        self.load_commits().await;
        tokio::join!(self.load_stashes(), self.load_submodules());
    }

    pub(super) async fn load_current_branch(&self) -> String {
        let out = self
            .git_stdout(argv(["symbolic-ref", "--short", "HEAD"]))
            .await;
        let branch = parse_current_branch(&out).unwrap_or_else(|| DETACHED_HEAD.to_string());
        let published = branch.clone();
        self.publish(Topic::Head, move |state| {
            state.current_branch = Some(published)
        });
        branch
    }

    pub(super) async fn detect_default_branch(&self) -> String {
        let out = self
            .git_stdout(argv(["symbolic-ref", "refs/remotes/origin/HEAD"]))
            .await;
        let branch = match parse_default_branch(&out) {
            Some(branch) => branch,
            None => {
                let out = self
                    .git_stdout(argv(["branch", "--list", "main", "master"]))
                    .await;
                let local = parse_branch_list(&out);
                if local.iter().any(|b| b == "main") {
                    "main".to_string()
                } else if local.iter().any(|b| b == "master") {
                    "master".to_string()
                } else {
                    FALLBACK_DEFAULT_BRANCH.to_string()
                }
            }
        };
        let published = branch.clone();
        self.publish(Topic::Head, move |state| {
            state.default_branch = Some(published)
        });
        branch
    }

    /// Branches, remote branches, remotes and the first tag page, published
    /// together. Tags are skipped while another tag load holds the latch.
    pub(super) async fn load_refs(&self) {
        let tags_latch = Latch::try_acquire(&self.tags_loading);
        let want_tags = tags_latch.is_some();

        let (branches, remote_branches, remotes, tags) = tokio::join!(
            self.git_stdout(argv(["branch", "--format=%(refname:short)"])),
            self.git_stdout(argv(["branch", "-r", "--format=%(refname:short)"])),
            self.git_stdout(argv(["remote"])),
            async {
                if want_tags {
                    Some(self.git_stdout(tag_args()).await)
                } else {
                    None
                }
            },
        );

        let branches = parse_branches(&branches);
        let remote_branches = parse_remote_branches(&remote_branches);
        let remotes = parse_remotes(&remotes);
        let tags = tags.map(|out| first_tags(parse_tags(&out), self.config.tag_page_size));
        let tags_loaded = tags.is_some();

        self.publish(Topic::Refs, |state| {
            state.branches = branches;
            state.remote_branches = remote_branches;
            state.remotes = remotes;
            if let Some(tags) = tags {
                state.tags = tags;
            }
        });
        if tags_loaded {
            self.emit(Topic::Tags);
        }
    }

    pub(super) async fn load_tags(&self) -> bool {
        let Some(_latch) = Latch::try_acquire(&self.tags_loading) else {
            log::debug!("tag load already running");
            return false;
        };
        self.fetch_tags(self.config.tag_page_size).await;
        true
    }

    pub(super) async fn load_more_tags(&self) -> bool {
        let Some(_latch) = Latch::try_acquire(&self.tags_loading) else {
            log::debug!("tag load already running");
            return false;
        };
        let (has_more, loaded) = self.read(|state| (state.tags.has_more(), state.tags.loaded.len()));
        if !has_more {
            return false;
        }
        self.fetch_tags(loaded + self.config.tag_batch_size).await;
        true
    }

    async fn fetch_tags(&self, limit: usize) {
        let out = self.git_stdout(tag_args()).await;
        let page = first_tags(parse_tags(&out), limit);
        self.publish(Topic::Tags, |state| state.tags = page);
    }

    /// Staged, unstaged and untracked files, published together.
    pub(super) async fn reload_index(&self) {
        let (staged, unstaged, untracked) = tokio::join!(
            self.git_stdout(argv(["diff", "--cached", "--name-status"])),
            self.git_stdout(argv(["diff", "--name-status"])),
            self.git_stdout(argv(["ls-files", "--others", "--exclude-standard"])),
        );

        let staged = parse_name_status(&staged, true);
        let mut unstaged = parse_name_status(&unstaged, false);
        unstaged.extend(parse_untracked(&untracked));

        self.publish(Topic::Index, |state| {
            state.status = RepoStatus { staged, unstaged };
        });
    }

    pub(super) async fn load_commits(&self) -> bool {
        let Some(_latch) = Latch::try_acquire(&self.commits_loading) else {
            log::debug!("history load already running");
            return false;
        };
        self.fetch_commit_window(self.config.commit_page_size).await;
        true
    }

    pub(super) async fn load_more_commits(&self) -> bool {
        let Some(_latch) = Latch::try_acquire(&self.commits_loading) else {
            log::debug!("history load already running");
            return false;
        };
        let (has_more, requested) =
            self.read(|state| (state.commits.has_more, state.commits.requested_limit));
        if !has_more {
            return false;
        }
        self.fetch_commit_window(requested + self.config.commit_batch_size)
            .await;
        true
    }

    /// Re-issues the whole history query with `limit` and replaces the
    /// window. A scope change that lands mid-query restarts it at the first
    /// page of the new scope.
    async fn fetch_commit_window(&self, mut limit: usize) {
        loop {
            let scope = self.read(|state| state.history_scope.clone());
            let mut args = argv(["log"]);
            args.extend(scope.args());
            args.push(format!("-{limit}"));
            args.push(LOG_FORMAT.to_string());

            let out = self.git_stdout(args).await;
            let window = CommitWindow::from_page(parse_commits(&out), limit);

            let applied = self.publish_if(Topic::History, |state| {
                if state.history_scope != scope {
                    return false;
                }
                state.commits = window;
                true
            });
            if applied {
                return;
            }
            log::debug!("history scope changed during load; reloading");
            limit = self.config.commit_page_size;
        }
    }

    pub(super) async fn set_history_scope(&self, scope: HistoryScope) {
        let changed = self.publish_if(Topic::History, |state| {
            if state.history_scope == scope {
                return false;
            }
            state.history_scope = scope;
            state.commits = CommitWindow::default();
            true
        });
        if changed {
            // A rejected load means one is in flight; it picks up the new scope.
            self.load_commits().await;
        }
    }

    pub(super) async fn load_stashes(&self) {
        let out = self
            .git_stdout(argv(["stash", "list", STASH_FORMAT]))
            .await;
        let stashes = parse_stashes(&out);
        self.publish(Topic::Stashes, |state| state.stashes = stashes);
    }

    pub(super) async fn load_submodules(&self) {
        let out = self.git_stdout(argv(["submodule", "status"])).await;
        let submodules = parse_submodules(&out);
        self.publish(Topic::Submodules, |state| state.submodules = submodules);
    }

    pub(super) async fn list_tree(&self, commit: &str) -> Vec<TreeEntry> {
        let out = self
            .git_stdout(argv(["ls-tree", "-r", "--long", commit]))
            .await;
        parse_tree(&out)
    }

    /// `None` when the object does not exist; the text is returned verbatim.
    pub(super) async fn file_content(&self, commit: &str, path: &Path) -> Option<String> {
        let object = format!("{commit}:{}", path_arg(path));
        let out = self.git_output(argv(["show", object.as_str()])).await;
        if out.exit_code == Some(0) {
            Some(out.stdout)
        } else {
            log::debug!("`{}` failed: {}", out.command, out.combined());
            None
        }
    }
}
