use gitpane_core::error::{Error, ErrorKind};
use gitpane_core::services::Result;
use notify::event::{AccessKind, AccessMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WatchConfig {
    pub debounce: Duration,
    pub max_delay: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(400),
            max_delay: Duration::from_secs(2),
        }
    }
}

/// One debounced burst of filesystem activity under the metadata directory.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WatchSignal {
    pub paths: Vec<PathBuf>,
}

enum MonitorMsg {
    Event(notify::Result<notify::Event>),
    Stop,
}

#[derive(Debug)]
struct DebouncedPaths {
    pending: Vec<PathBuf>,
    seen: FxHashSet<PathBuf>,
    first_event_at: Option<Instant>,
    last_event_at: Option<Instant>,
    debounce: Duration,
    max_delay: Duration,
}

impl DebouncedPaths {
    fn new(debounce: Duration, max_delay: Duration) -> Self {
        Self {
            pending: Vec::new(),
            seen: FxHashSet::default(),
            first_event_at: None,
            last_event_at: None,
            debounce,
            max_delay,
        }
    }

    fn is_pending(&self) -> bool {
        self.first_event_at.is_some()
    }

    fn push(&mut self, paths: Vec<PathBuf>, now: Instant) -> Option<WatchSignal> {
        for path in paths {
            if self.seen.insert(path.clone()) {
                self.pending.push(path);
            }
        }
        self.first_event_at.get_or_insert(now);
        self.last_event_at = Some(now);
        self.take_if_max_delay_elapsed(now)
    }

    fn take_if_max_delay_elapsed(&mut self, now: Instant) -> Option<WatchSignal> {
        let first = self.first_event_at?;
        if now.duration_since(first) >= self.max_delay {
            self.take()
        } else {
            None
        }
    }

    fn next_timeout(&self, now: Instant) -> Option<Duration> {
        let (first, last) = (self.first_event_at?, self.last_event_at?);
        let due = (last + self.debounce).min(first + self.max_delay);
        Some(due.saturating_duration_since(now))
    }

    fn take_if_due(&mut self, now: Instant) -> Option<WatchSignal> {
        if !self.is_pending() {
            return None;
        }
        let timeout = self.next_timeout(now).unwrap_or(Duration::ZERO);
        if timeout.is_zero() { self.take() } else { None }
    }

    fn take(&mut self) -> Option<WatchSignal> {
        self.first_event_at?;
        self.first_event_at = None;
        self.last_event_at = None;
        self.seen.clear();
        Some(WatchSignal {
            paths: std::mem::take(&mut self.pending),
        })
    }
}

/// Owns the OS subscription and the monitor thread. Dropping it stops both.
pub struct RepoWatcher {
    git_dir: PathBuf,
    watcher: Option<RecommendedWatcher>,
    msg_tx: mpsc::Sender<MonitorMsg>,
    join: Option<thread::JoinHandle<()>>,
}

impl RepoWatcher {
    pub fn start(
        git_dir: &Path,
        config: WatchConfig,
    ) -> Result<(Self, UnboundedReceiver<WatchSignal>)> {
        let git_dir = git_dir
            .canonicalize()
            .unwrap_or_else(|_| git_dir.to_path_buf());
        let (msg_tx, msg_rx) = mpsc::channel::<MonitorMsg>();
        let (signal_tx, signal_rx) = unbounded_channel();

        let mut watcher = notify::recommended_watcher({
            let msg_tx = msg_tx.clone();
            move |res| {
                let _ = msg_tx.send(MonitorMsg::Event(res));
            }
        })
        .map_err(|e| Error::new(ErrorKind::Watch(e.to_string())))?;

        watcher
            .watch(&git_dir, RecursiveMode::Recursive)
            .or_else(|_| watcher.watch(&git_dir, RecursiveMode::NonRecursive))
            .map_err(|e| Error::new(ErrorKind::Watch(e.to_string())))?;

        let join = thread::Builder::new()
            .name("gitpane-watch".into())
            .spawn({
                let git_dir = git_dir.clone();
                move || monitor_thread(git_dir, config, msg_rx, signal_tx)
            })?;

        log::debug!("watching {}", git_dir.display());
        Ok((
            Self {
                git_dir,
                watcher: Some(watcher),
                msg_tx,
                join: Some(join),
            },
            signal_rx,
        ))
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn is_running(&self) -> bool {
        self.join.is_some()
    }

    pub fn stop(&mut self) {
        // Drop the OS watcher first so no further events are queued.
        self.watcher.take();
        let Some(join) = self.join.take() else {
            return;
        };
        let _ = self.msg_tx.send(MonitorMsg::Stop);
        let _ = join.join();
        log::debug!("stopped watching {}", self.git_dir.display());
    }
}

impl Drop for RepoWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn monitor_thread(
    git_dir: PathBuf,
    config: WatchConfig,
    msg_rx: mpsc::Receiver<MonitorMsg>,
    signal_tx: UnboundedSender<WatchSignal>,
) {
    let idle_tick = Duration::from_secs(30);
    let mut debouncer = DebouncedPaths::new(config.debounce, config.max_delay);

    let flush = |signal: Option<WatchSignal>| -> bool {
        match signal {
            Some(signal) => signal_tx.send(signal).is_ok(),
            None => true,
        }
    };

    loop {
        let now = Instant::now();
        let timeout = debouncer.next_timeout(now).unwrap_or(idle_tick);

        let keep_going = match msg_rx.recv_timeout(timeout) {
            Ok(MonitorMsg::Stop) => break,
            Ok(MonitorMsg::Event(Ok(event))) => match classify_event(&git_dir, &event) {
                Some(paths) => flush(debouncer.push(paths, Instant::now())),
                None => true,
            },
            Ok(MonitorMsg::Event(Err(e))) => {
                log::debug!("watch error under {}: {e}", git_dir.display());
                flush(debouncer.push(vec![git_dir.clone()], Instant::now()))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => flush(debouncer.take_if_due(Instant::now())),
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };

        // The receiving side went away; nobody is listening any more.
        if !keep_going {
            break;
        }
    }
}

fn classify_event(git_dir: &Path, event: &notify::Event) -> Option<Vec<PathBuf>> {
    if should_ignore_event_kind(event) {
        return None;
    }
    if event.need_rescan() || event.paths.is_empty() {
        return Some(vec![git_dir.to_path_buf()]);
    }
    Some(event.paths.clone())
}

fn should_ignore_event_kind(event: &notify::Event) -> bool {
    match &event.kind {
        // Reading repo state should not cause a refresh loop; only a completed write counts.
        notify::EventKind::Access(AccessKind::Close(AccessMode::Write)) => false,
        notify::EventKind::Access(_) => true,
        _ => false,
    }
}

/// True for paths that can move HEAD or a reference: anything named like
/// `HEAD` (`HEAD`, `ORIG_HEAD`, `FETCH_HEAD`, ...), anything under `refs/`,
/// and `packed-refs`. Paths outside `git_dir` are judged as given.
pub fn is_relevant_path(git_dir: &Path, path: &Path) -> bool {
    let rel = path.strip_prefix(git_dir).unwrap_or(path);
    if rel.as_os_str().is_empty() {
        // The metadata directory itself: a rescan, assume anything moved.
        return true;
    }
    rel.components().any(|component| match component {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            name == "refs" || name == "packed-refs" || name.contains("HEAD")
        }
        _ => false,
    })
}
