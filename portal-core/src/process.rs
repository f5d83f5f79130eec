//! External command execution shared by the nmcli backend and the hotspot.

use crate::{Error, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::process::Command;

/// Exit state and combined stdout + stderr of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub text: String,
}

impl CommandOutput {
    pub fn exit_description(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs one fixed program with varying arguments.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, args: &[&str]) -> Result<CommandOutput>;
}

/// Builds a command for `program`, prefixed with `sudo` when requested.
pub fn privileged(program: &str, use_sudo: bool) -> Command {
    if use_sudo {
        let mut cmd = Command::new("sudo");
        cmd.arg(program);
        cmd
    } else {
        Command::new(program)
    }
}

/// [`CommandRunner`] backed by real child processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    use_sudo: bool,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>, use_sudo: bool, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            use_sudo,
            timeout,
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let mut cmd = privileged(&self.program, self.use_sudo);
        // 超时后 future 被丢弃，子进程随之被杀掉
        cmd.args(args).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| match e.kind() {
                ErrorKind::NotFound => Error::ToolNotFound(self.program.clone()),
                _ => Error::Io(e),
            })?,
            Err(_) => {
                return Err(Error::CommandTimedOut {
                    command: self.program.clone(),
                    timeout: self.timeout,
                });
            }
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            text,
        })
    }
}

/// Maps the output of a failed command to the matching error kind.
pub fn classify_failure(output: &CommandOutput) -> Error {
    let text = output.text.trim().to_string();
    if text.contains("not found") {
        Error::ToolNotFound(text)
    } else if text.contains("permission denied") {
        Error::PermissionDenied(text)
    } else if text.contains("User not authorized") {
        Error::NotAuthorized(text)
    } else {
        Error::CommandFailed {
            details: output.exit_description(),
            output: text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(text: &str) -> CommandOutput {
        CommandOutput {
            success: false,
            exit_code: Some(1),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_privileged_prefixes_sudo() {
        let cmd = privileged("nmcli", true);
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "sudo");
        assert_eq!(std_cmd.get_args().collect::<Vec<_>>(), ["nmcli"]);

        let cmd = privileged("nmcli", false);
        assert_eq!(cmd.as_std().get_program(), "nmcli");
        assert_eq!(cmd.as_std().get_args().count(), 0);
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure(&failed("sudo: nmcli: command not found")),
            Error::ToolNotFound(_)
        ));
        assert!(matches!(
            classify_failure(&failed("open /dev/x: permission denied")),
            Error::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_failure(&failed("Error: User not authorized to perform this operation")),
            Error::NotAuthorized(_)
        ));
        match classify_failure(&failed("Error: Secrets were required, but not provided.")) {
            Error::CommandFailed { details, output } => {
                assert_eq!(details, "exit status 1");
                assert!(output.starts_with("Error: Secrets"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_process_runner_combines_output() {
        let runner = ProcessRunner::new("sh", false, Duration::from_secs(5));
        let output = runner
            .run(&["-c", "echo out; echo err 1>&2; exit 3"])
            .await
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert!(output.text.contains("out"));
        assert!(output.text.contains("err"));
    }

    #[tokio::test]
    async fn test_process_runner_missing_program() {
        let runner = ProcessRunner::new("definitely-not-a-real-binary", false, Duration::from_secs(5));
        let err = runner.run(&[]).await.unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(name) if name == "definitely-not-a-real-binary"));
    }

    #[tokio::test]
    async fn test_process_runner_timeout() {
        let runner = ProcessRunner::new("sleep", false, Duration::from_millis(100));
        let err = runner.run(&["5"]).await.unwrap_err();
        assert!(matches!(err, Error::CommandTimedOut { .. }));
    }
}
