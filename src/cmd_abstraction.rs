//! Command execution abstraction for testability.
//!
//! The nft transports never spawn processes directly; they go through
//! [`CommandExecutor`], so unit tests can assert on the exact `nft`
//! invocations and simulate failures without touching the firewall.

use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};

#[cfg(test)]
use mockall::automock;

/// Output from command execution
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Whether the command exited with status 0
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Short human-readable reason for a failed command.
    ///
    /// Prefers nft's `Error:` line over the statement excerpt and caret
    /// marker printed below it, then the last non-empty stderr line, then
    /// the exit code.
    pub fn failure_reason(&self) -> String {
        let error_line = self.stderr.lines().find(|l| l.trim_start().starts_with("Error:"));
        let last_line = || self.stderr.lines().rev().find(|l| !l.trim().is_empty());
        match error_line.or_else(last_line) {
            Some(line) => line.trim().to_string(),
            None => match self.code {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            },
        }
    }
}

/// Trait for command execution, allowing dependency injection for testing.
#[cfg_attr(test, automock)]
pub trait CommandExecutor: Send + Sync {
    /// Execute `program` with `args` and capture its output.
    fn execute(&self, program: &str, args: &[String]) -> Result<CommandOutput>;

    /// Execute `program` with `args`, feeding `stdin` to its standard input.
    fn execute_with_stdin(&self, program: &str, args: &[String], stdin: &str)
        -> Result<CommandOutput>;
}

/// Runs real system commands.
#[derive(Debug, Clone, Default)]
pub struct RealCommandExecutor;

impl RealCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute {}", program))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }

    fn execute_with_stdin(
        &self,
        program: &str,
        args: &[String],
        stdin_data: &str,
    ) -> Result<CommandOutput> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", program))?;

        let mut stdin = child
            .stdin
            .take()
            .with_context(|| format!("Failed to open stdin of {}", program))?;

        // Scripts can be megabytes long: feed stdin from a separate thread so a
        // child that writes output before draining its input cannot deadlock us.
        let (output, written) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(stdin_data.as_bytes()));
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            (output, written)
        });

        let output = output.with_context(|| format!("Failed to wait for {}", program))?;

        // A child that exits early closes its stdin; its own status says why.
        if let Err(e) = written {
            if output.status.success() {
                return Err(e).with_context(|| format!("Failed to write stdin of {}", program));
            }
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}

/// Convert a slice of &str to Vec<String>.
///
/// mockall has issues with lifetimes in `&[&str]`, so the trait takes `&[String]`.
pub fn args_to_strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
