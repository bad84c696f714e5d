use gitpane_core::services::{CommandOutput, GitRunner, command_label};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Spawns the `git` executable directly (no shell) and captures both streams.
#[derive(Clone, Debug)]
pub struct CliRunner {
    executable: PathBuf,
}

impl Default for CliRunner {
    fn default() -> Self {
        Self::new("git")
    }
}

impl CliRunner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl GitRunner for CliRunner {
    fn run(&self, workdir: &Path, args: &[String]) -> CommandOutput {
        let label = command_label(&self.executable.to_string_lossy(), args);
        log::debug!("running `{label}` in {}", workdir.display());

        let mut cmd = Command::new(&self.executable);
        cmd.args(args)
            .current_dir(workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null());

        // `output` reads stdout and stderr concurrently before waiting on the
        // child, so a chatty process cannot block on a full pipe.
        match cmd.output() {
            Ok(output) => CommandOutput {
                command: label,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code(),
            },
            Err(e) => {
                log::warn!("failed to spawn `{label}`: {e}");
                CommandOutput {
                    stderr: format!(
                        "error: failed to run {}: {e}",
                        self.executable.display()
                    ),
                    command: label,
                    stdout: String::new(),
                    exit_code: None,
                }
            }
        }
    }
}
