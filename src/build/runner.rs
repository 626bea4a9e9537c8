/// External tool execution
///
/// Configure, build and install each run as one blocking child process. The
/// child inherits stdout/stderr so the native build's own progress output
/// reaches the caller unchanged.
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::{error, info};

use crate::cli_utils::depcache_prefix;
use crate::error::{BuildError, Result};
use crate::logging::status;

/// One external invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Pipeline step name used in logs and errors
    pub step: &'static str,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(step: &'static str, program: impl Into<PathBuf>) -> Self {
        Self {
            step,
            program: program.into(),
            args: Vec::new(),
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

    /// Space-joined command line, for logs
    pub fn display(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs external commands; any failure is fatal to the caller.
pub trait ToolRunner {
    fn run(&mut self, command: &ToolCommand) -> Result<()>;
}

/// Runs commands as real child processes
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&mut self, command: &ToolCommand) -> Result<()> {
        let line = command.display();
        eprintln!("{} {}", depcache_prefix(), line);

        let start = Instant::now();
        let exit = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .status()
            .map_err(|source| BuildError::ToolSpawn {
                tool: command.program.display().to_string(),
                source,
            })?;

        let duration = start.elapsed();

        if !exit.success() {
            error!(
                operation = command.step,
                status = status::ERROR,
                exit = %exit,
                duration_secs = duration.as_secs_f64(),
                "external step failed"
            );
            return Err(BuildError::ToolFailed {
                step: command.step,
                command: line,
                status: exit.to_string(),
            });
        }

        info!(
            operation = command.step,
            status = status::SUCCESS,
            duration_secs = duration.as_secs_f64(),
            "external step finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display() {
        let cmd = ToolCommand::new("build", "/usr/bin/cmake")
            .arg("--build")
            .args(["/tmp/b", "--parallel", "8"]);
        assert_eq!(cmd.display(), "/usr/bin/cmake --build /tmp/b --parallel 8");
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_success() {
        let mut runner = ProcessRunner::new();
        runner.run(&ToolCommand::new("build", "true")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_nonzero_exit() {
        let mut runner = ProcessRunner::new();
        let err = runner.run(&ToolCommand::new("install", "false")).unwrap_err();
        assert!(matches!(err, BuildError::ToolFailed { step: "install", .. }));
    }

    #[test]
    fn test_process_runner_missing_program() {
        let mut runner = ProcessRunner::new();
        let err = runner
            .run(&ToolCommand::new("configure", "/nonexistent/cmake"))
            .unwrap_err();
        assert!(matches!(err, BuildError::ToolSpawn { .. }));
    }
}
