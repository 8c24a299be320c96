// BENCHRIG REMOTE EXECUTION GATEWAY
// EVERY TOUCH OF THE REMOTE HOST GOES THROUGH HERE: COMMANDS, PROCESSES, FILES.
// TRANSPORT FAILURE DEGRADES TO EMPTY OUTPUT. CALLERS TREAT EMPTY AS "UNAVAILABLE".

use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use crate::config::BenchConfig;

/// Captured result of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the transport never produced an exit status.
    pub status: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    fn from_output(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        }
    }
}

/// A detached remote command. `wait` blocks until it terminates.
pub trait BackgroundTask {
    fn wait(self) -> CommandOutput;
}

pub trait RemoteExec {
    type Task: BackgroundTask;

    fn execute(&self, command: &str) -> CommandOutput;

    fn execute_background(&self, command: &str) -> Self::Task;

    /// Copy a local file to an absolute path on the remote host.
    fn push_file(&self, local: &Path, remote: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// SSH TRANSPORT
// ---------------------------------------------------------------------------

pub struct SshGateway {
    destination: String,
}

impl SshGateway {
    pub fn new(config: &BenchConfig) -> Self {
        Self {
            destination: config.destination(),
        }
    }

    fn command(&self, command: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg(&self.destination).arg(command);
        cmd
    }
}

impl RemoteExec for SshGateway {
    type Task = SshTask;

    fn execute(&self, command: &str) -> CommandOutput {
        debug!(dest = %self.destination, command, "ssh");
        match self.command(command).stdin(Stdio::null()).output() {
            Ok(out) => CommandOutput::from_output(out),
            Err(e) => {
                debug!(error = %e, command, "ssh transport failed");
                CommandOutput::default()
            }
        }
    }

    fn execute_background(&self, command: &str) -> SshTask {
        debug!(dest = %self.destination, command, "ssh (background)");
        // OWN PROCESS GROUP: A DROPPED TASK TAKES ITS WHOLE TREE WITH IT
        let spawned = self
            .command(command)
            .process_group(0)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        match spawned {
            Ok(child) => SshTask::new(child),
            Err(e) => {
                debug!(error = %e, command, "ssh spawn failed");
                SshTask::detached()
            }
        }
    }

    fn push_file(&self, local: &Path, remote: &str) -> Result<()> {
        let target = format!("{}:{}", self.destination, remote);
        let status = Command::new("scp")
            .arg(local)
            .arg(&target)
            .stdin(Stdio::null())
            .status()
            .with_context(|| format!("failed to run scp for {}", local.display()))?;
        if !status.success() {
            bail!("scp {} -> {} exited with {}", local.display(), target, status);
        }
        Ok(())
    }
}

/// Local handle on a backgrounded `ssh` client.
pub struct SshTask {
    child: Option<Child>,
    pgid: i32,
}

impl SshTask {
    fn new(child: Child) -> Self {
        let pgid = child.id() as i32;
        Self {
            child: Some(child),
            pgid,
        }
    }

    // SPAWN FAILED: WAIT RETURNS EMPTY OUTPUT IMMEDIATELY
    fn detached() -> Self {
        Self {
            child: None,
            pgid: 0,
        }
    }

    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(c) => matches!(c.try_wait(), Ok(None)),
            None => false,
        }
    }
}

impl BackgroundTask for SshTask {
    fn wait(mut self) -> CommandOutput {
        let Some(child) = self.child.take() else {
            return CommandOutput::default();
        };
        match child.wait_with_output() {
            Ok(out) => CommandOutput::from_output(out),
            Err(e) => {
                warn!(error = %e, "background ssh wait failed");
                CommandOutput::default()
            }
        }
    }
}

impl Drop for SshTask {
    fn drop(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }
        unsafe {
            libc::killpg(self.pgid, libc::SIGKILL);
        }
        let _ = child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_task_waits_empty() {
        let task = SshTask::detached();
        let out = task.wait();
        assert_eq!(out, CommandOutput::default());
        assert!(!out.success());
    }

    #[test]
    fn detached_task_not_running() {
        let mut task = SshTask::detached();
        assert!(!task.is_running());
    }

    #[test]
    fn task_collects_local_child_output() {
        let child = Command::new("sh")
            .args(["-c", "echo hello; echo oops >&2"])
            .process_group(0)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("sh must exist");
        let out = SshTask::new(child).wait();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[test]
    fn dropped_task_kills_group() {
        let child = Command::new("sh")
            .args(["-c", "sleep 30"])
            .process_group(0)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("sh must exist");
        let mut task = SshTask::new(child);
        assert!(task.is_running());
        drop(task); // SHOULD NOT BLOCK FOR 30S
    }
}
