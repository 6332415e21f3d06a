use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;
use std::process::{Command, ExitStatus};
use tracing::{debug, error, info};

use crate::core::error::BuildError;

/// An external command line, kept as data so it can be logged and inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemCommand {
    program: String,
    args: Vec<OsString>,
}

impl SystemCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Appends a directory path with a trailing slash, so rsync copies its contents.
    pub fn arg_dir_contents(mut self, dir: &Path) -> Self {
        let mut arg = dir.as_os_str().to_os_string();
        arg.push("/");
        self.args.push(arg);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for SystemCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Seam between the pipeline and the operating system.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    /// Runs the command to completion and reports how it exited.
    fn execute(&self, command: &SystemCommand) -> Result<ExitStatus>;
}

/// Runs commands as child processes with inherited stdio.
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemRunner {
    fn execute(&self, command: &SystemCommand) -> Result<ExitStatus> {
        command
            .to_command()
            .status()
            .with_context(|| format!("Failed to execute {}", command.program()))
    }
}

/// Runs `command` and fails with [`BuildError::Command`] on a non-zero exit.
pub fn run(runner: &dyn CommandRunner, command: &SystemCommand, success_message: &str) -> Result<()> {
    debug!("Running: {}", command);

    let status = runner.execute(command)?;
    if !status.success() {
        error!("Command failed: {} ({})", command, status);
        return Err(BuildError::Command {
            command: command.to_string(),
            status,
        }
        .into());
    }

    info!("{}", success_message);
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    pub(crate) fn exit_code(code: i32) -> ExitStatus {
        ExitStatus::from_raw(code << 8)
    }

    #[test]
    fn test_display_joins_program_and_args() {
        let cmd = SystemCommand::new("mount")
            .args(["-o", "loop,ro"])
            .arg(Path::new("/srv/Rocky.iso"))
            .arg_dir_contents(Path::new("./mount"));

        assert_eq!(cmd.to_string(), "mount -o loop,ro /srv/Rocky.iso ./mount/");
    }

    #[test]
    fn test_run_success() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_execute()
            .withf(|cmd| cmd.program() == "true")
            .times(1)
            .returning(|_| Ok(exit_code(0)));

        assert!(run(&runner, &SystemCommand::new("true"), "ok").is_ok());
    }

    #[test]
    fn test_run_failure_keeps_command_and_status() {
        let mut runner = MockCommandRunner::new();
        runner.expect_execute().returning(|_| Ok(exit_code(32)));

        let cmd = SystemCommand::new("mount").arg("broken.iso");
        let err = run(&runner, &cmd, "unused").unwrap_err();

        match err.downcast_ref::<BuildError>() {
            Some(BuildError::Command { command, status }) => {
                assert_eq!(command, "mount broken.iso");
                assert_eq!(status.code(), Some(32));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_system_runner_reports_exit_code() {
        let runner = SystemRunner::new();
        let status = runner.execute(&SystemCommand::new("false")).unwrap();
        assert!(!status.success());

        let status = runner.execute(&SystemCommand::new("true")).unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_system_runner_missing_program() {
        let runner = SystemRunner::new();
        assert!(runner
            .execute(&SystemCommand::new("definitely_not_a_real_command_12345"))
            .is_err());
    }
}
