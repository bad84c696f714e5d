use crate::error::Error;
use std::path::Path;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandOutput {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn from_stdout(command: impl Into<String>, stdout: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    /// stdout followed by stderr, one newline between them.
    pub fn combined(&self) -> String {
        let mut out = String::new();
        if !self.stdout.trim().is_empty() {
            out.push_str(self.stdout.trim_end());
            out.push('\n');
        }
        if !self.stderr.trim().is_empty() {
            out.push_str(self.stderr.trim_end());
            out.push('\n');
        }
        out.trim_end().to_string()
    }
}

/// Runs the external version-control executable.
///
/// Implementations block until the process exits and never fail: a process
/// that could not be spawned is reported through the returned output text,
/// the same way the tool reports its own errors.
pub trait GitRunner: Send + Sync {
    fn run(&self, workdir: &Path, args: &[String]) -> CommandOutput;
}

/// `git a b c` style label used in logs and the command history.
pub fn command_label(program: &str, args: &[String]) -> String {
    let mut label = String::from(program);
    for arg in args {
        label.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            label.push('"');
            label.push_str(arg);
            label.push('"');
        } else {
            label.push_str(arg);
        }
    }
    label
}
