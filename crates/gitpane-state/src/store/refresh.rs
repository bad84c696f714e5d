use super::Shared;
use crate::msg::Topic;
use crate::watcher::{RepoWatcher, WatchConfig, is_relevant_path};
use std::path::PathBuf;
use std::sync::Arc;

impl Shared {
    /// Starts the metadata watcher and its consumer. Returns `false` (and
    /// leaves live reload off) if the subscription could not be created.
    pub(super) fn start_watcher(self: &Arc<Self>) -> bool {
        let mut slot = self.watcher.lock().expect("watcher lock poisoned");
        if slot.is_some() {
            return true;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::warn!("no async runtime; live reload disabled");
            return false;
        };

        let config = WatchConfig {
            debounce: self.config.watch_debounce,
            max_delay: self.config.watch_max_delay,
        };
        let (watcher, mut signals) = match RepoWatcher::start(self.repo.git_dir(), config) {
            Ok(started) => started,
            Err(e) => {
                log::warn!("live reload disabled: {e}");
                drop(slot);
                self.publish(Topic::Phase, |state| state.live_reload = false);
                return false;
            }
        };
        *slot = Some(watcher);
        drop(slot);

        let weak = Arc::downgrade(self);
        let consumer = runtime.spawn(async move {
            while let Some(signal) = signals.recv().await {
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                shared.handle_external_change(&signal.paths);
            }
        });
        if let Some(previous) = self
            .watch_task
            .lock()
            .expect("watch lock poisoned")
            .replace(consumer)
        {
            previous.abort();
        }

        self.publish(Topic::Phase, |state| state.live_reload = true);
        true
    }

    pub(super) fn stop_watcher(&self) {
        let watcher = self.watcher.lock().expect("watcher lock poisoned").take();
        let Some(mut watcher) = watcher else {
            return;
        };
        watcher.stop();
        if let Some(task) = self.watch_task.lock().expect("watch lock poisoned").take() {
            task.abort();
        }
        self.publish(Topic::Phase, |state| state.live_reload = false);
    }

    /// Debounced head/refs/history refresh. Every relevant call restarts the
    /// pending refresh, so a burst ends in a single reload.
    pub(super) fn handle_external_change(self: &Arc<Self>, paths: &[PathBuf]) -> bool {
        let git_dir = self.repo.git_dir();
        if !paths.iter().any(|path| is_relevant_path(git_dir, path)) {
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::warn!("no async runtime; external change ignored");
            return false;
        };

        let shared = Arc::clone(self);
        let delay = self.config.refresh_delay;
        let mut slot = self.refresh_task.lock().expect("refresh lock poisoned");
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            log::debug!("refreshing after external change");
            shared.load_current_branch().await;
            shared.load_refs().await;
            shared.load_commits().await;
        }));
        true
    }
}
