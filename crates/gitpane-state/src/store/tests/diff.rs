use super::*;

const PATCH: &str = "diff --git a/a.txt b/a.txt\n\
index 1111111..2222222 100644\n\
--- a/a.txt\n\
+++ b/a.txt\n\
@@ -1,2 +1,2 @@\n\
 keep\n\
-old\n\
+new\n";

fn commit_target(id: &str) -> DiffTarget {
    DiffTarget::Commit {
        id: CommitId(id.to_string()),
    }
}

#[tokio::test]
async fn load_diff_publishes_classified_lines() {
    let f = fixture();
    f.runner.ok(&["show", "abc"], PATCH);
    let rx = f.controller.subscribe();

    let diff = f.controller.load_diff(commit_target("abc")).await.unwrap();
    assert_eq!(diff.added_lines(), 1);
    assert_eq!(diff.removed_lines(), 1);

    let state = f.controller.snapshot();
    assert_eq!(state.diff_target, Some(commit_target("abc")));
    assert_eq!(state.diff.ready(), Some(&diff));
    assert_eq!(drain(&rx), vec![Topic::Diff, Topic::Diff]);
}

#[tokio::test]
async fn working_tree_diff_uses_cached_for_staged_files() {
    let f = fixture();
    f.runner.ok(&["diff", "--cached", "--", "a.txt"], PATCH);

    let target = DiffTarget::WorkingTree {
        path: PathBuf::from("a.txt"),
        staged: true,
    };
    let diff = f.controller.load_diff(target).await.unwrap();
    assert_eq!(diff.added_lines(), 1);
}

#[tokio::test]
async fn failed_diff_publishes_the_error_text() {
    let f = fixture();
    f.runner.fail(
        &["diff", "main...nope"],
        "fatal: ambiguous argument 'main...nope'\n",
        128,
    );
    let target = DiffTarget::Refs {
        from: "main".into(),
        to: "nope".into(),
    };
    assert_eq!(f.controller.load_diff(target.clone()).await, None);

    let state = f.controller.snapshot();
    assert_eq!(state.diff_target, Some(target));
    assert_eq!(
        state.diff,
        Loadable::Error("fatal: ambiguous argument 'main...nope'".to_string())
    );
}

#[tokio::test]
async fn newer_selection_cancels_the_older_diff() {
    let f = fixture();
    f.runner.slow(&["show", "slow"], Duration::from_millis(300), PATCH);
    f.runner.ok(&["show", "fast"], PATCH);
    let controller = Arc::new(f.controller);

    let first = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.load_diff(commit_target("slow")).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = controller.load_diff(commit_target("fast")).await;
    assert!(second.is_some());
    assert_eq!(first.await.unwrap(), None);

    // Give the abandoned process time to finish; it must not overwrite.
    tokio::time::sleep(Duration::from_millis(350)).await;
    let state = controller.snapshot();
    assert_eq!(state.diff_target, Some(commit_target("fast")));
    assert_eq!(state.diff.ready().unwrap().target, commit_target("fast"));
    assert_eq!(state.diff_rev, 2);
}

#[tokio::test]
async fn clear_diff_cancels_and_resets() {
    let f = fixture();
    f.runner.slow(&["show", "slow"], Duration::from_millis(200), PATCH);
    let controller = Arc::new(f.controller);

    let pending = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.load_diff(commit_target("slow")).await }
    });
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(controller.snapshot().diff.is_loading());

    controller.clear_diff();
    assert_eq!(pending.await.unwrap(), None);

    tokio::time::sleep(Duration::from_millis(250)).await;
    let state = controller.snapshot();
    assert_eq!(state.diff_target, None);
    assert_eq!(state.diff, Loadable::NotLoaded);
}
