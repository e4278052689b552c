//! Short-lived helper commands (mount, resolution tool, input mapper, ...)

use std::ffi::OsStr;
use std::process::{Command, Stdio};

/// Outcome of a helper command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `-1` when terminated by a signal
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Describe a failure for error messages.
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exit status {}", self.code)
        } else {
            format!("exit status {}: {}", self.code, stderr)
        }
    }
}

/// Run a helper to completion, capturing its output.
pub fn run_tool<I, S>(program: &str, args: I) -> std::io::Result<ToolOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null());
    tracing::debug!("Running tool: {:?}", cmd);

    let output = cmd.output()?;
    Ok(ToolOutput {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
