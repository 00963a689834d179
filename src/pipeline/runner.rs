//! External process invocation
//!
//! Everything the pipeline shells out to (container runtime, disassembler,
//! `id`) goes through [`CommandRunner`] so the control flow can be exercised
//! without those tools installed.

use std::fmt;
use std::process::{Command, Stdio};

#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Failed { command: String, status: String },

    #[error("`{command}` produced non UTF-8 output")]
    InvalidOutput { command: String },
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Capture stdout instead of streaming it to the terminal
    pub capture_output: bool,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            capture_output: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn captured(mut self) -> Self {
        self.capture_output = true;
        self
    }

    /// True when the arguments start with `prefix`, e.g. `["container", "run"]`.
    pub fn has_args_prefix(&self, prefix: &[&str]) -> bool {
        self.args.len() >= prefix.len() && self.args.iter().zip(prefix).all(|(a, p)| a == p)
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured stdout; empty unless the command asked for capture
    pub stdout: String,
}

/// Narrow capability for running an external process to completion
#[cfg_attr(test, automock)]
pub trait CommandRunner: Send + Sync {
    /// Runs `command`, failing if it cannot start or exits unsuccessfully
    fn run(&self, command: &ExternalCommand) -> Result<CommandOutput, CommandError>;
}

/// Runs commands on the host with blocking waits and no timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ExternalCommand) -> Result<CommandOutput, CommandError> {
        info!("> {}", command);

        let mut process = Command::new(&command.program);
        process.args(&command.args);

        let spawn_error = |source| CommandError::Spawn {
            command: command.to_string(),
            source,
        };

        let (status, stdout) = if command.capture_output {
            let output = process.stdin(Stdio::null()).output().map_err(spawn_error)?;
            let stdout = String::from_utf8(output.stdout).map_err(|_| CommandError::InvalidOutput {
                command: command.to_string(),
            })?;
            (output.status, stdout)
        } else {
            (process.status().map_err(spawn_error)?, String::new())
        };

        if !status.success() {
            return Err(CommandError::Failed {
                command: command.to_string(),
                status: status.to_string(),
            });
        }

        Ok(CommandOutput { stdout })
    }
}
