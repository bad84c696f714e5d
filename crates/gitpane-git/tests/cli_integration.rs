use gitpane_core::domain::{FileStatusKind, RefKind};
use gitpane_core::services::GitRunner;
use gitpane_git::parse::{self, LOG_FORMAT};
use gitpane_git::{CliRunner, RepoHandle};
use std::fs;
use std::path::Path;
use std::process::Command;

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

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn log_output_parses_into_commits_with_decorations() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    init_repo(repo);
    commit_file(repo, "a.txt", "one\n", "first");
    commit_file(repo, "a.txt", "two\n", "second | with pipe");
    run_git(repo, &["tag", "v1.0"]);

    let runner = CliRunner::default();
    let out = runner.run(repo, &args(&["log", "--all", "-10", LOG_FORMAT]));
    let commits = parse::parse_commits(&out.combined());

    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].subject, "second | with pipe");
    assert_eq!(commits[0].author_name, "You");
    assert_eq!(commits[0].author_email, "you@example.com");
    assert_eq!(commits[0].parent_ids.len(), 1);
    assert_eq!(commits[0].parent_ids[0], commits[1].id);
    assert!(commits[0].timestamp().is_some());
    assert!(
        commits[0]
            .refs
            .iter()
            .any(|r| r.kind == RefKind::LocalBranch && r.name == "main")
    );
    assert!(
        commits[0]
            .refs
            .iter()
            .any(|r| r.kind == RefKind::Tag && r.name == "v1.0")
    );
    assert!(commits[1].parent_ids.is_empty());
}

#[test]
fn index_queries_separate_staged_unstaged_and_untracked() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    init_repo(repo);
    commit_file(repo, "a.txt", "one\n", "init");

    fs::write(repo.join("a.txt"), "one\ntwo\n").unwrap();
    run_git(repo, &["add", "a.txt"]);
    fs::write(repo.join("a.txt"), "one\ntwo\nthree\n").unwrap();
    fs::write(repo.join("b.txt"), "untracked\n").unwrap();

    let runner = CliRunner::default();
    let staged = parse::parse_name_status(
        &runner
            .run(repo, &args(&["diff", "--cached", "--name-status"]))
            .combined(),
        true,
    );
    let unstaged = parse::parse_name_status(
        &runner.run(repo, &args(&["diff", "--name-status"])).combined(),
        false,
    );
    let untracked = parse::parse_untracked(
        &runner
            .run(repo, &args(&["ls-files", "--others", "--exclude-standard"]))
            .combined(),
    );

    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].status, FileStatusKind::Modified);
    assert_eq!(unstaged.len(), 1);
    assert_eq!(unstaged[0].path, staged[0].path);
    assert_eq!(untracked.len(), 1);
    assert_eq!(untracked[0].path.to_string_lossy(), "b.txt");
}

#[test]
fn refs_tags_and_tree_round_through_parsers() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    init_repo(repo);
    commit_file(repo, "a.txt", "one\n", "init");
    run_git(repo, &["branch", "feature/x"]);
    run_git(repo, &["tag", "v1.2"]);
    run_git(repo, &["tag", "v1.10"]);

    let runner = CliRunner::default();
    let branches = parse::parse_branches(
        &runner
            .run(repo, &args(&["branch", "--format=%(refname:short)"]))
            .combined(),
    );
    let names: Vec<_> = branches.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["feature/x", "main"]);

    let tags = parse::parse_tags(
        &runner
            .run(repo, &args(&["tag", "-l", "--sort=-version:refname"]))
            .combined(),
    );
    let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["v1.10", "v1.2"]);

    let tree = parse::parse_tree(
        &runner
            .run(repo, &args(&["ls-tree", "-r", "--long", "HEAD"]))
            .combined(),
    );
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].size, Some(4));

    let current = runner.run(repo, &args(&["symbolic-ref", "--short", "HEAD"]));
    assert_eq!(
        parse::parse_current_branch(&current.combined()),
        Some("main".to_string())
    );
}

#[test]
fn failing_command_is_reported_through_output_text() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    init_repo(repo);
    commit_file(repo, "a.txt", "one\n", "init");

    let runner = CliRunner::default();
    let out = runner.run(repo, &args(&["checkout", "does-not-exist"]));
    assert_ne!(out.exit_code, Some(0));
    assert!(parse::is_failure(&out.combined(), &["fatal", "error"]));
}

#[test]
fn repo_handle_opens_initialised_repository() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    init_repo(repo);

    let handle = RepoHandle::open(repo).unwrap();
    assert!(handle.git_dir().ends_with(".git"));
    assert!(!handle.is_bare());

    let bare = dir.path().join("bare.git");
    run_git(dir.path(), &["init", "--bare", bare.to_str().unwrap()]);
    let handle = RepoHandle::open(&bare).unwrap();
    assert!(handle.is_bare());
}
