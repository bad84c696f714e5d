use crate::config::ControllerConfig;
use crate::model::RepoState;
use crate::msg::{StoreEvent, Topic};
use crate::watcher::RepoWatcher;
use gitpane_core::domain::*;
use gitpane_core::error::{Error, ErrorKind};
use gitpane_core::services::{CommandOutput, GitRunner, Result, command_label};
use gitpane_git::RepoHandle;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, mpsc};
use tokio::task::{AbortHandle, JoinHandle};

mod commands;
mod diff;
mod executor;
mod load;
mod refresh;

use executor::TaskExecutor;

/// Owns one open repository: its published state, the worker pool that
/// runs `git`, and the filesystem watcher. Dropping the controller stops
/// the watcher and aborts every task it started.
pub struct RepoController {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    repo: RepoHandle,
    runner: Arc<dyn GitRunner>,
    config: ControllerConfig,
    executor: TaskExecutor,
    state: RwLock<RepoState>,
    subscribers: Mutex<Vec<mpsc::Sender<StoreEvent>>>,

    initialized: AtomicBool,
    tags_loading: AtomicBool,
    commits_loading: AtomicBool,

    diff_task: Mutex<Option<AbortHandle>>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    background: Mutex<Vec<JoinHandle<()>>>,
    watcher: Mutex<Option<RepoWatcher>>,
    watch_task: Mutex<Option<JoinHandle<()>>>,
}

impl RepoController {
    /// Validates the repository and builds the controller. Nothing is loaded
    /// until [`RepoController::initialize`] runs.
    pub fn open(
        path: &Path,
        runner: Arc<dyn GitRunner>,
        config: ControllerConfig,
    ) -> Result<Self> {
        let repo = RepoHandle::open(path)?;
        if !repo.git_dir().is_dir() {
            return Err(Error::new(ErrorKind::NotARepository(path.to_path_buf())));
        }
        log::info!(
            "opened {} (git dir {})",
            repo.workdir().display(),
            repo.git_dir().display()
        );

        let state = RepoState::new(
            repo.workdir().to_path_buf(),
            repo.git_dir().to_path_buf(),
            repo.is_bare(),
        );
        let executor = TaskExecutor::new(config.worker_threads);

        Ok(Self {
            shared: Arc::new(Shared {
                repo,
                runner,
                config,
                executor,
                state: RwLock::new(state),
                subscribers: Mutex::new(Vec::new()),
                initialized: AtomicBool::new(false),
                tags_loading: AtomicBool::new(false),
                commits_loading: AtomicBool::new(false),
                diff_task: Mutex::new(None),
                refresh_task: Mutex::new(None),
                background: Mutex::new(Vec::new()),
                watcher: Mutex::new(None),
                watch_task: Mutex::new(None),
            }),
        })
    }

    pub fn repo(&self) -> &RepoHandle {
        &self.shared.repo
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.shared.config
    }

    pub fn snapshot(&self) -> RepoState {
        self.shared
            .state
            .read()
            .expect("state lock poisoned (read)")
            .clone()
    }

    /// A fresh change feed. Receivers that are dropped are pruned lazily.
    pub fn subscribe(&self) -> mpsc::Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.shared
            .subscribers
            .lock()
            .expect("subscribers lock poisoned")
            .push(tx);
        rx
    }

    /// Waits for fire-and-forget work (post-mutation reloads, background
    /// loads, a pending watcher refresh) to finish.
    pub async fn settle(&self) {
        self.shared.settle().await
    }

    pub async fn initialize(&self) {
        self.shared.initialize().await
    }

    pub async fn refresh(&self) {
        self.shared.refresh().await
    }

    pub async fn load_current_branch(&self) -> String {
        self.shared.load_current_branch().await
    }

    pub async fn detect_default_branch(&self) -> String {
        self.shared.detect_default_branch().await
    }

    pub async fn load_refs(&self) {
        self.shared.load_refs().await
    }

    /// Returns `false` when a tag load was already running.
    pub async fn load_tags(&self) -> bool {
        self.shared.load_tags().await
    }

    pub async fn load_more_tags(&self) -> bool {
        self.shared.load_more_tags().await
    }

    pub async fn reload_index(&self) {
        self.shared.reload_index().await
    }

    /// Returns `false` when a history load was already running.
    pub async fn load_commits(&self) -> bool {
        self.shared.load_commits().await
    }

    /// Returns `false` when there is nothing more to load or a history load
    /// was already running.
    pub async fn load_more_commits(&self) -> bool {
        self.shared.load_more_commits().await
    }

    pub async fn set_history_scope(&self, scope: HistoryScope) {
        self.shared.set_history_scope(scope).await
    }

    pub async fn load_stashes(&self) {
        self.shared.load_stashes().await
    }

    pub async fn load_submodules(&self) {
        self.shared.load_submodules().await
    }

    pub async fn list_tree(&self, commit: &str) -> Vec<TreeEntry> {
        self.shared.list_tree(commit).await
    }

    pub async fn file_content(&self, commit: &str, path: &Path) -> Option<String> {
        self.shared.file_content(commit, path).await
    }

    pub async fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        self.shared.stage(paths).await
    }

    pub async fn unstage(&self, paths: &[PathBuf]) -> Result<()> {
        self.shared.unstage(paths).await
    }

    pub async fn discard(&self, files: &[ChangedFile]) -> Result<()> {
        self.shared.discard(files).await
    }

    pub async fn commit(&self, message: &str, amend: bool) -> Result<()> {
        self.shared.commit(message, amend).await
    }

    pub async fn checkout(&self, name: &str) -> Result<()> {
        self.shared.checkout(name).await
    }

    pub async fn create_branch(&self, name: &str, start_point: Option<&str>) -> Result<()> {
        self.shared.create_branch(name, start_point).await
    }

    /// An annotated tag when `message` is given, a lightweight one otherwise.
    pub async fn create_tag(
        &self,
        name: &str,
        message: Option<&str>,
        target: Option<&str>,
    ) -> Result<()> {
        self.shared.create_tag(name, message, target).await
    }

    pub async fn delete_ref(&self, git_ref: &GitRef) -> Result<()> {
        self.shared.delete_ref(git_ref).await
    }

    pub async fn fetch(&self, remote: Option<&str>) -> Result<()> {
        self.shared.fetch(remote).await
    }

    pub async fn pull(&self, rebase: bool, remote: Option<&str>) -> Result<()> {
        self.shared.pull(rebase, remote).await
    }

    pub async fn push(&self, remote: Option<&str>, branch: Option<&str>) -> Result<()> {
        self.shared.push(remote, branch).await
    }

    pub async fn stash_push(&self, message: Option<&str>, keep_index: bool) -> Result<()> {
        self.shared.stash_push(message, keep_index).await
    }

    pub async fn stash_pop(&self, index: Option<usize>) -> Result<()> {
        self.shared.stash_pop(index).await
    }

    pub async fn stash_apply(&self, index: Option<usize>) -> Result<()> {
        self.shared.stash_apply(index).await
    }

    pub async fn stash_drop(&self, index: usize) -> Result<()> {
        self.shared.stash_drop(index).await
    }

    pub fn clear_error(&self) {
        self.shared.publish(Topic::CommandLog, |state| state.last_error = None);
    }

    /// Loads and publishes the diff for `target`, cancelling any diff load
    /// still in flight. Resolves to `None` when a newer request superseded
    /// this one, or when `git` failed; the failure text is then published as
    /// [`Loadable::Error`](crate::model::Loadable::Error).
    pub async fn load_diff(&self, target: DiffTarget) -> Option<Diff> {
        self.shared.load_diff(target).await
    }

    pub fn clear_diff(&self) {
        self.shared.clear_diff()
    }

    /// Feeds changed metadata paths into the debounced refresh. Returns
    /// whether a refresh was scheduled.
    pub fn handle_external_change(&self, paths: &[PathBuf]) -> bool {
        self.shared.handle_external_change(paths)
    }

    pub fn set_live_reload(&self, enabled: bool) -> bool {
        if enabled {
            self.shared.start_watcher()
        } else {
            self.shared.stop_watcher();
            false
        }
    }
}

impl Drop for RepoController {
    fn drop(&mut self) {
        self.shared.stop_watcher();
        self.shared.abort_all();
    }
}

/// Holds a boolean latch for the lifetime of one load.
struct Latch<'a>(&'a AtomicBool);

impl<'a> Latch<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for Latch<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn argv<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl Shared {
    fn read<T>(&self, f: impl FnOnce(&RepoState) -> T) -> T {
        let state = self.state.read().expect("state lock poisoned (read)");
        f(&state)
    }

    fn publish(&self, topic: Topic, f: impl FnOnce(&mut RepoState)) {
        {
            let mut state = self.state.write().expect("state lock poisoned (write)");
            f(&mut state);
        }
        self.emit(topic);
    }

    /// Like `publish`, but only notifies when `f` reports that it applied.
    fn publish_if(&self, topic: Topic, f: impl FnOnce(&mut RepoState) -> bool) -> bool {
        let applied = {
            let mut state = self.state.write().expect("state lock poisoned (write)");
            f(&mut state)
        };
        if applied {
            self.emit(topic);
        }
        applied
    }

    fn emit(&self, topic: Topic) {
        let mut subscribers = self.subscribers.lock().expect("subscribers lock poisoned");
        subscribers.retain(|tx| tx.send(StoreEvent::StateChanged(topic)).is_ok());
    }

    fn label(&self, args: &[String]) -> String {
        command_label(&self.config.git_executable.to_string_lossy(), args)
    }

    /// Runs `git` on the worker pool.
    async fn git_output(&self, args: Vec<String>) -> CommandOutput {
        let label = self.label(&args);
        let runner = Arc::clone(&self.runner);
        let workdir = self.repo.workdir().to_path_buf();
        self.executor
            .run(move || runner.run(&workdir, &args))
            .await
            .unwrap_or_else(|| CommandOutput {
                command: label,
                stdout: String::new(),
                stderr: "error: worker pool stopped".to_string(),
                exit_code: None,
            })
    }

    /// Read queries parse stdout only; a failed read yields empty text.
    async fn git_stdout(&self, args: Vec<String>) -> String {
        let out = self.git_output(args).await;
        if out.exit_code != Some(0) && !out.stderr.trim().is_empty() {
            log::debug!("`{}` failed: {}", out.command, out.stderr.trim());
        }
        out.stdout
    }

    fn spawn_tracked(&self, fut: impl Future<Output = ()> + Send + 'static) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::warn!("no async runtime; background work skipped");
            return;
        };
        let task = handle.spawn(fut);
        let mut background = self.background.lock().expect("background lock poisoned");
        background.retain(|task| !task.is_finished());
        background.push(task);
    }

    async fn settle(&self) {
        loop {
            let pending = std::mem::take(
                &mut *self.background.lock().expect("background lock poisoned"),
            );
            let refresh_pending = self
                .refresh_task
                .lock()
                .expect("refresh lock poisoned")
                .as_ref()
                .is_some_and(|task| !task.is_finished());

            if pending.is_empty() && !refresh_pending {
                break;
            }
            for task in pending {
                let _ = task.await;
            }
            if refresh_pending {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        }
    }

    fn abort_all(&self) {
        if let Some(task) = self.diff_task.lock().expect("diff lock poisoned").take() {
            task.abort();
        }
        if let Some(task) = self.refresh_task.lock().expect("refresh lock poisoned").take() {
            task.abort();
        }
        if let Some(task) = self.watch_task.lock().expect("watch lock poisoned").take() {
            task.abort();
        }
        for task in self
            .background
            .lock()
            .expect("background lock poisoned")
            .drain(..)
        {
            task.abort();
        }
    }
}
