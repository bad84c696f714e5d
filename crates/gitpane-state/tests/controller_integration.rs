use gitpane_core::domain::{FileStatusKind, GitRef, HistoryScope, StashEntry};
use gitpane_core::error::{ErrorKind, GitOp};
use gitpane_git::CliRunner;
use gitpane_state::{ControllerConfig, InitPhase, RepoController};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

fn run_git(repo: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_CONFIG_SYSTEM", "/dev/null")
        .env("GIT_TERMINAL_PROMPT", "0")
        .status()
        .expect("git command to run");
    assert!(status.success(), "git {:?} failed", args);
}

fn init_repo(repo: &Path) {
    run_git(repo, &["init", "-b", "main"]);
    run_git(repo, &["config", "user.email", "you@example.com"]);
    run_git(repo, &["config", "user.name", "You"]);
    run_git(repo, &["config", "commit.gpgsign", "false"]);
    run_git(repo, &["config", "tag.gpgsign", "false"]);
}

fn commit_file(repo: &Path, rel: &str, contents: &str, message: &str) {
    fs::write(repo.join(rel), contents).unwrap();
    run_git(repo, &["add", rel]);
    run_git(repo, &["commit", "-m", message]);
}

fn config() -> ControllerConfig {
    ControllerConfig {
        live_reload: false,
        refresh_delay: Duration::from_millis(20),
        worker_threads: 4,
        ..ControllerConfig::default()
    }
}

fn open(repo: &Path) -> RepoController {
    RepoController::open(repo, Arc::new(CliRunner::default()), config()).unwrap()
}

#[tokio::test]
async fn stage_then_commit_cleans_the_index_and_heads_history() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    init_repo(repo);
    commit_file(repo, "a.txt", "one\n", "initial");
    fs::write(repo.join("a.txt"), "two\n").unwrap();

    let controller = open(repo);
    controller.initialize().await;
    controller.settle().await;

    let state = controller.snapshot();
    assert_eq!(state.phase, InitPhase::FullyLoaded);
    assert_eq!(state.current_branch.as_deref(), Some("main"));
    assert_eq!(state.default_branch.as_deref(), Some("main"));
    assert_eq!(state.status.unstaged.len(), 1);
    assert_eq!(state.status.unstaged[0].status, FileStatusKind::Modified);

    controller
        .stage(&[PathBuf::from("a.txt")])
        .await
        .unwrap();
    controller.settle().await;
    let state = controller.snapshot();
    assert_eq!(state.status.staged.len(), 1);
    assert!(state.status.unstaged.is_empty());

    controller.commit("fix: update", false).await.unwrap();
    controller.settle().await;

    let state = controller.snapshot();
    assert!(state.status.is_clean());
    assert_eq!(state.commits.commits.len(), 2);
    assert_eq!(state.commits.commits[0].subject, "fix: update");
    assert!(!state.commits.has_more);
}

#[tokio::test]
async fn checkout_of_missing_ref_fails_and_keeps_branch() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    init_repo(repo);
    commit_file(repo, "a.txt", "one\n", "initial");

    let controller = open(repo);
    controller.initialize().await;
    controller.settle().await;

    let err = controller.checkout("does-not-exist").await.unwrap_err();
    match err.kind() {
        ErrorKind::Command { op, output } => {
            assert_eq!(*op, GitOp::Checkout);
            assert!(output.contains("error") || output.contains("fatal"));
        }
        other => panic!("unexpected error {other:?}"),
    }

    controller.settle().await;
    let state = controller.snapshot();
    assert_eq!(state.current_branch.as_deref(), Some("main"));
    assert!(state.last_error.is_some());
}

#[tokio::test]
async fn branches_tags_and_checkout_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    init_repo(repo);
    commit_file(repo, "a.txt", "one\n", "initial");

    let controller = open(repo);
    controller.initialize().await;

    controller.create_branch("dev", None).await.unwrap();
    controller
        .create_tag("v1.0", Some("first release"), None)
        .await
        .unwrap();
    controller.settle().await;

    let state = controller.snapshot();
    assert!(state.branches.contains(&GitRef::local("dev")));
    assert_eq!(state.tags.loaded, vec![GitRef::tag("v1.0")]);
    assert!(
        state.commits.commits[0]
            .refs
            .contains(&GitRef::tag("v1.0"))
    );

    controller.checkout("dev").await.unwrap();
    controller.settle().await;
    assert_eq!(controller.snapshot().current_branch.as_deref(), Some("dev"));

    controller.checkout("main").await.unwrap();
    controller.delete_ref(&GitRef::local("dev")).await.unwrap();
    controller.delete_ref(&GitRef::tag("v1.0")).await.unwrap();
    controller.settle().await;

    let state = controller.snapshot();
    assert_eq!(state.branches, vec![GitRef::local("main")]);
    assert!(state.tags.loaded.is_empty());
}

#[tokio::test]
async fn stash_push_and_pop() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    init_repo(repo);
    commit_file(repo, "a.txt", "one\n", "initial");
    fs::write(repo.join("a.txt"), "dirty\n").unwrap();

    let controller = open(repo);
    controller.initialize().await;
    controller.settle().await;

    controller.stash_push(Some("wip"), false).await.unwrap();
    controller.settle().await;

    let state = controller.snapshot();
    assert!(state.status.is_clean());
    let stashes: &[StashEntry] = &state.stashes;
    assert_eq!(stashes.len(), 1);
    assert_eq!(stashes[0].index, 0);
    assert!(stashes[0].message.contains("wip"));

    controller.stash_pop(None).await.unwrap();
    controller.settle().await;
    let state = controller.snapshot();
    assert!(state.stashes.is_empty());
    assert_eq!(state.status.unstaged.len(), 1);
}

#[tokio::test]
async fn discard_restores_tracked_and_removes_untracked() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    init_repo(repo);
    commit_file(repo, "a.txt", "one\n", "initial");
    fs::write(repo.join("a.txt"), "changed\n").unwrap();
    fs::write(repo.join("scratch.txt"), "tmp\n").unwrap();

    let controller = open(repo);
    controller.initialize().await;
    controller.settle().await;

    let files = controller.snapshot().status.unstaged;
    assert_eq!(files.len(), 2);
    controller.discard(&files).await.unwrap();
    controller.settle().await;

    assert!(controller.snapshot().status.is_clean());
    assert_eq!(fs::read_to_string(repo.join("a.txt")).unwrap(), "one\n");
    assert!(!repo.join("scratch.txt").exists());
}

#[tokio::test]
async fn history_scope_and_commit_diff() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    init_repo(repo);
    commit_file(repo, "a.txt", "one\n", "initial");
    run_git(repo, &["checkout", "-b", "dev"]);
    commit_file(repo, "a.txt", "two\n", "on dev");
    run_git(repo, &["checkout", "main"]);

    let controller = open(repo);
    controller.initialize().await;
    assert_eq!(controller.snapshot().commits.commits.len(), 2);

    controller
        .set_history_scope(HistoryScope::Ref("main".into()))
        .await;
    let state = controller.snapshot();
    assert_eq!(state.commits.commits.len(), 1);

    controller
        .set_history_scope(HistoryScope::Ref("dev".into()))
        .await;
    let head = controller.snapshot().commits.commits[0].clone();
    assert_eq!(head.subject, "on dev");

    let diff = controller
        .load_diff(gitpane_core::domain::DiffTarget::Commit { id: head.id.clone() })
        .await
        .unwrap();
    assert_eq!(diff.added_lines(), 1);
    assert_eq!(diff.removed_lines(), 1);

    let tree = controller.list_tree(head.id.as_ref()).await;
    assert_eq!(tree.len(), 1);
    assert_eq!(
        controller
            .file_content(head.id.as_ref(), Path::new("a.txt"))
            .await
            .as_deref(),
        Some("two\n")
    );
}

#[tokio::test]
async fn unstage_touches_only_the_staged_entry_of_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    init_repo(repo);
    commit_file(repo, "a.txt", "one\ntwo\n", "initial");
    fs::write(repo.join("a.txt"), "ONE\ntwo\n").unwrap();
    run_git(repo, &["add", "a.txt"]);
    fs::write(repo.join("a.txt"), "ONE\nTWO\n").unwrap();

    let controller = open(repo);
    controller.initialize().await;
    controller.settle().await;

    let state = controller.snapshot();
    assert_eq!(state.status.staged.len(), 1);
    assert_eq!(state.status.unstaged.len(), 1);
    let staged = &state.status.staged[0];
    let unstaged = &state.status.unstaged[0];
    assert_eq!(staged.path, unstaged.path);
    assert!(staged.staged && !unstaged.staged);
    assert!(!staged.same_entry(unstaged));

    controller
        .unstage(&[PathBuf::from("a.txt")])
        .await
        .unwrap();
    controller.settle().await;

    let state = controller.snapshot();
    assert!(state.status.staged.is_empty());
    assert_eq!(state.status.unstaged.len(), 1);
    assert_eq!(state.status.unstaged[0].path, PathBuf::from("a.txt"));
    assert!(!state.status.unstaged[0].staged);
    assert_eq!(fs::read_to_string(repo.join("a.txt")).unwrap(), "ONE\nTWO\n");
}

#[tokio::test]
async fn non_ascii_paths_can_be_staged_and_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    init_repo(repo);
    run_git(repo, &["config", "core.quotePath", "true"]);
    commit_file(repo, "naïve.md", "one\n", "initial");
    fs::write(repo.join("naïve.md"), "two\n").unwrap();
    fs::write(repo.join("café.txt"), "new\n").unwrap();

    let controller = open(repo);
    controller.initialize().await;
    controller.settle().await;

    let state = controller.snapshot();
    let mut unstaged: Vec<_> = state
        .status
        .unstaged
        .iter()
        .map(|f| (f.path.clone(), f.status))
        .collect();
    unstaged.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        unstaged,
        vec![
            (PathBuf::from("café.txt"), FileStatusKind::Untracked),
            (PathBuf::from("naïve.md"), FileStatusKind::Modified),
        ]
    );

    controller
        .stage(&[PathBuf::from("café.txt")])
        .await
        .unwrap();
    controller.settle().await;
    let state = controller.snapshot();
    assert_eq!(state.status.staged.len(), 1);
    assert_eq!(state.status.staged[0].path, PathBuf::from("café.txt"));
    assert_eq!(state.status.staged[0].status, FileStatusKind::Added);

    controller
        .unstage(&[PathBuf::from("café.txt")])
        .await
        .unwrap();
    controller.settle().await;

    let files = controller.snapshot().status.unstaged;
    controller.discard(&files).await.unwrap();
    controller.settle().await;

    assert!(controller.snapshot().status.is_clean());
    assert!(!repo.join("café.txt").exists());
    assert_eq!(fs::read_to_string(repo.join("naïve.md")).unwrap(), "one\n");
}

#[test]
fn open_rejects_plain_directory() {
    let dir = tempfile::tempdir().unwrap();
    let err = RepoController::open(dir.path(), Arc::new(CliRunner::default()), config())
        .err()
        .expect("not a repository");
    assert!(matches!(err.kind(), ErrorKind::NotARepository(_)));
}
