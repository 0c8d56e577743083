//! Subprocess abstraction for the helm binary.
//!
//! Every helm invocation goes through the [`ToolRunner`] trait so that tests
//! can substitute a fake that records invocations and returns canned output.

use std::process::Command;

/// Captured output of a finished subprocess.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
}

impl ToolOutput {
    /// Stderr as lossy UTF-8, trimmed.
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }

    /// Stdout as lossy UTF-8.
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Runs external commands and captures their output.
pub trait ToolRunner {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<ToolOutput>;
}

/// [`ToolRunner`] backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<ToolOutput> {
        let output = Command::new(program).args(args).output()?;

        Ok(ToolOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
        })
    }
}
