//! Running generated scripts in a bounded child process.

use crate::config::SandboxConfig;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub error: String,
}

impl ExecutionResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sandbox {
    interpreter: String,
    timeout: Duration,
    scratch_dir: Option<PathBuf>,
}

impl Sandbox {
    pub fn new(interpreter: &str, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.to_string(),
            timeout,
            scratch_dir: None,
        }
    }

    /// Place temporary script files in `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Run `script`. Never fails: every problem is reported in the result.
    pub async fn execute(&self, script: &str) -> ExecutionResult {
        if script.trim().is_empty() {
            return ExecutionResult::failure("empty script");
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("autoqa_").suffix(".py");
        let created = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        let mut file = match created {
            Ok(file) => file,
            Err(e) => return ExecutionResult::failure(format!("failed to create script file: {}", e)),
        };

        if let Err(e) = file.write_all(script.as_bytes()).and_then(|_| file.flush()) {
            return ExecutionResult::failure(format!("failed to write script file: {}", e));
        }

        debug!("Executing {} with {}", file.path().display(), self.interpreter);

        let mut command = Command::new(&self.interpreter);
        command
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The browser and driver a script starts share its group.
        #[cfg(unix)]
        command.process_group(0);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecutionResult::failure(format!(
                    "failed to start {}: {}",
                    self.interpreter, e
                ));
            }
        };
        let pid = child.id();

        // Dropping the child on timeout kills it; dropping `file` removes it.
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => ExecutionResult {
                success: output.status.success(),
                output: String::from_utf8_lossy(&output.stdout).into_owned(),
                error: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Ok(Err(e)) => ExecutionResult::failure(e.to_string()),
            Err(_) => {
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                warn!("Script exceeded {:?} and was killed", self.timeout);
                ExecutionResult::failure("timed out")
            }
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        debug!("Process group {} already gone: {}", pid, e);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

impl From<&SandboxConfig> for Sandbox {
    fn from(config: &SandboxConfig) -> Self {
        Sandbox::new(&config.interpreter, Duration::from_secs(config.timeout_secs))
    }
}
