use std::future::Future;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use tokio::sync::oneshot;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Fixed pool of threads for blocking work (process spawns, file deletes).
pub(super) struct TaskExecutor {
    tx: mpsc::Sender<Task>,
    _threads: Vec<thread::JoinHandle<()>>,
}

impl TaskExecutor {
    pub(super) fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let (tx, rx) = mpsc::channel::<Task>();
        let rx = Arc::new(Mutex::new(rx));

        let mut worker_threads = Vec::with_capacity(threads);
        for n in 0..threads {
            let rx = Arc::clone(&rx);
            let spawned = thread::Builder::new()
                .name(format!("gitpane-worker-{n}"))
                .spawn(move || {
                    loop {
                        let task = {
                            let rx = rx.lock().expect("executor lock poisoned");
                            rx.recv()
                        };
                        match task {
                            Ok(task) => task(),
                            Err(_) => break,
                        }
                    }
                });
            match spawned {
                Ok(handle) => worker_threads.push(handle),
                Err(e) => log::warn!("failed to spawn worker thread: {e}"),
            }
        }

        Self {
            tx,
            _threads: worker_threads,
        }
    }

    pub(super) fn spawn(&self, task: impl FnOnce() + Send + 'static) {
        let _ = self.tx.send(Box::new(task));
    }

    /// Queues `f` on the pool and resolves with its result. The job is
    /// queued immediately, before the returned future is first polled.
    /// `None` means the pool shut down before the job ran.
    pub(super) fn run<T, F>(&self, f: F) -> impl Future<Output = Option<T>> + Send + 'static
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.spawn(move || {
            let _ = tx.send(f());
        });
        async move { rx.await.ok() }
    }
}
