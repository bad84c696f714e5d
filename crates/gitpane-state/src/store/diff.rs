use super::{Shared, argv, path_arg};
use crate::model::Loadable;
use crate::msg::Topic;
use gitpane_core::domain::{Diff, DiffTarget};
use std::sync::Arc;

fn diff_args(target: &DiffTarget) -> Vec<String> {
    match target {
        DiffTarget::Commit { id } => argv([
            "show",
            id.as_ref(),
            "--format=",
            "--stat-width=200",
            "-p",
        ]),
        DiffTarget::WorkingTree { path, staged } => {
            let mut args = argv(["diff"]);
            if *staged {
                args.push("--cached".to_string());
            }
            args.push("--".to_string());
            args.push(path_arg(path));
            args
        }
        DiffTarget::Refs { from, to } => argv([
            "diff".to_string(),
            format!("{from}...{to}"),
            "--stat-width=200".to_string(),
            "-p".to_string(),
        ]),
    }
}

impl Shared {
    pub(super) async fn load_diff(self: &Arc<Self>, target: DiffTarget) -> Option<Diff> {
        // Bump, spawn and swap under one lock so two racing requests can't
        // abort each other out of order.
        let task = {
            let mut slot = self.diff_task.lock().expect("diff lock poisoned");
            let rev = {
                let mut state = self.state.write().expect("state lock poisoned (write)");
                state.diff_rev += 1;
                state.diff_target = Some(target.clone());
                state.diff = Loadable::Loading;
                state.diff_rev
            };
            let shared = Arc::clone(self);
            let task = tokio::spawn(async move { shared.fetch_diff(rev, target).await });
            if let Some(previous) = slot.replace(task.abort_handle()) {
                previous.abort();
            }
            task
        };
        self.emit(Topic::Diff);

        task.await.ok().flatten()
    }

    async fn fetch_diff(&self, rev: u64, target: DiffTarget) -> Option<Diff> {
        let out = self.git_output(diff_args(&target)).await;
        let (loaded, diff) = if out.exit_code == Some(0) {
            let diff = Diff::from_unified(target, &out.stdout);
            (Loadable::Ready(diff.clone()), Some(diff))
        } else {
            let text = out.combined();
            log::debug!("`{}` failed: {text}", out.command);
            (Loadable::Error(text), None)
        };

        let applied = self.publish_if(Topic::Diff, move |state| {
            if state.diff_rev != rev {
                return false;
            }
            state.diff = loaded;
            true
        });
        if applied { diff } else { None }
    }

    pub(super) fn clear_diff(&self) {
        let mut slot = self.diff_task.lock().expect("diff lock poisoned");
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        self.publish(Topic::Diff, |state| {
            state.diff_rev += 1;
            state.diff_target = None;
            state.diff = Loadable::NotLoaded;
        });
    }
}
