use clap::Parser;
use gitpane_core::services::Result;
use gitpane_git::CliRunner;
use gitpane_state::{RepoController, RepoState, StoreEvent, Topic, config};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "gitpane")]
#[command(about = "Load a repository and report its state")]
#[command(version)]
struct Cli {
    /// Repository working directory or metadata directory
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Keep running and report changes made to the repository
    #[arg(long)]
    watch: bool,

    /// Read controller settings from this file instead of the default location
    #[arg(long, env = "GITPANE_CONFIG")]
    config: Option<PathBuf>,

    /// Git executable to run
    #[arg(long, env = "GITPANE_GIT")]
    git: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("gitpane: failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("gitpane: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = match &cli.config {
        Some(path) => config::load_from_path(path),
        None => config::load(),
    };
    if let Some(git) = cli.git {
        settings.git_executable = git;
    }
    settings.live_reload = cli.watch;

    let runner = Arc::new(CliRunner::new(settings.git_executable.clone()));
    let controller = RepoController::open(&cli.path, runner, settings)?;
    let events = controller.subscribe();

    controller.initialize().await;
    controller.settle().await;
    print_summary(&controller.snapshot());

    if !cli.watch {
        return Ok(());
    }
    if !controller.snapshot().live_reload {
        log::warn!("live reload unavailable; exiting");
        return Ok(());
    }

    // The store notifies over a std channel; forward onto the runtime.
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Topic>();
    std::thread::Builder::new()
        .name("gitpane-events".to_string())
        .spawn(move || {
            while let Ok(StoreEvent::StateChanged(topic)) = events.recv() {
                if tx.send(topic).is_err() {
                    break;
                }
            }
        })?;

    log::info!("watching for changes, press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            topic = rx.recv() => match topic {
                Some(topic) => report_change(topic, &controller.snapshot()),
                None => break,
            },
        }
    }
    Ok(())
}

fn print_summary(state: &RepoState) {
    println!("repository  {}", state.workdir.display());
    let branch = state.current_branch.as_deref().unwrap_or("?");
    if state.is_detached() {
        println!("head        detached");
    } else {
        println!("head        {branch}");
    }
    println!(
        "default     {}",
        state.default_branch.as_deref().unwrap_or("?")
    );
    println!(
        "branches    {} local, {} remote, {} remotes",
        state.branches.len(),
        state.remote_branches.len(),
        state.remotes.len()
    );
    println!(
        "tags        {} of {}",
        state.tags.loaded.len(),
        state.tags.total
    );
    let more = if state.commits.has_more { "+" } else { "" };
    println!("commits     {}{more}", state.commits.commits.len());
    if let Some(head) = state.commits.commits.first() {
        let when = head
            .timestamp()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| head.date.clone());
        println!("newest      {} {} ({when})", head.short_id, head.subject);
    }
    println!(
        "changes     {} staged, {} unstaged",
        state.status.staged.len(),
        state.status.unstaged.len()
    );
    println!("stashes     {}", state.stashes.len());
    println!("submodules  {}", state.submodules.len());
    if let Some(err) = &state.last_error {
        println!("last error  {err}");
    }
}

fn report_change(topic: Topic, state: &RepoState) {
    match topic {
        Topic::Head => println!(
            "head -> {}",
            state.current_branch.as_deref().unwrap_or("?")
        ),
        Topic::Refs => println!(
            "refs: {} local, {} remote",
            state.branches.len(),
            state.remote_branches.len()
        ),
        Topic::History => {
            if let Some(head) = state.commits.commits.first() {
                println!("history: {} {}", head.short_id, head.subject);
            }
        }
        _ => log::debug!("{topic:?} changed"),
    }
}
