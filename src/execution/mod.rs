//! Execution engine: run a generated script as a child process and capture its result.

use std::path::Path;

use async_trait::async_trait;

use crate::errors::ExecError;

pub mod python;

pub use python::PythonExecutor;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// `None` when the child was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Text handed to the next repair attempt.
    pub fn diagnostic(&self) -> String {
        if !self.stderr.trim().is_empty() {
            return self.stderr.clone();
        }
        let status = self
            .exit_code
            .map_or_else(|| "was terminated by a signal".to_string(), |c| format!("exited with status {c}"));
        if self.stdout.trim().is_empty() {
            format!("The script {status} and wrote no error output.")
        } else {
            format!("The script {status} and wrote no error output. Its standard output was:\n{}", self.stdout)
        }
    }
}

/// Writes `code` to `script_path`, runs it, and reports how it exited.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, code: &str, script_path: &Path) -> Result<ExecutionResult, ExecError>;
}
