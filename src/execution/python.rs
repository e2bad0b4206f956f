//! Interpreter-backed script runner with a mandatory timeout.

use std::{path::Path, process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::{process::Command, time::timeout};
use tracing::{debug, warn};

use super::{ExecutionResult, ScriptRunner};
use crate::{
    config::Config,
    errors::{ConfigError, ExecError},
};

#[derive(Debug, Clone)]
pub struct PythonExecutor {
    program: String,
    timeout: Duration,
    envs: Vec<(String, String)>,
}

impl PythonExecutor {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self { program: program.into(), timeout, envs: Vec::new() }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let secs = cfg.get_u64("EXEC_TIMEOUT")?.unwrap_or(120);
        if secs == 0 {
            return Err(ConfigError::Invalid {
                key: "EXEC_TIMEOUT".into(),
                value: "0".into(),
                reason: "timeout must be at least one second".into(),
            });
        }
        let program = cfg.get("PYTHON_BIN").unwrap_or_else(|| "python".into());
        let mut executor = Self::new(program, Duration::from_secs(secs));
        if let Some(backend) = cfg.get("MPLBACKEND") {
            executor = executor.with_env("MPLBACKEND", backend);
        }
        Ok(executor)
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl ScriptRunner for PythonExecutor {
    async fn run(&self, code: &str, script_path: &Path) -> Result<ExecutionResult, ExecError> {
        tokio::fs::write(script_path, code)
            .await
            .map_err(|source| ExecError::WriteScript { path: script_path.to_path_buf(), source })?;

        let mut cmd = Command::new(&self.program);
        // Run from the script's own directory so relative outputs stay per request.
        match (script_path.parent().filter(|d| !d.as_os_str().is_empty()), script_path.file_name()) {
            (Some(dir), Some(name)) => {
                cmd.current_dir(dir).arg(name);
            }
            _ => {
                cmd.arg(script_path);
            }
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (k, v) in &self.envs {
            cmd.env(k, v);
        }

        let child = cmd
            .spawn()
            .map_err(|source| ExecError::Spawn { program: self.program.clone(), source })?;
        debug!(script = %script_path.display(), pid = child.id(), "spawned script");

        // Dropping the future on timeout drops the child, which kills it.
        let out = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(res) => res.map_err(ExecError::Wait)?,
            Err(_) => {
                warn!(script = %script_path.display(), "script exceeded {:?}, killed", self.timeout);
                return Err(ExecError::Timeout { after: self.timeout });
            }
        };

        Ok(ExecutionResult {
            exit_code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(timeout: Duration) -> PythonExecutor {
        PythonExecutor::new("sh", timeout)
    }

    #[tokio::test]
    async fn captures_exit_code_and_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run_chart_code.py");
        let res = sh(Duration::from_secs(10))
            .run("echo hello\necho 'NameError: x' >&2\nexit 3\n", &script)
            .await
            .unwrap();
        assert_eq!(res.exit_code, Some(3));
        assert_eq!(res.stdout, "hello\n");
        assert_eq!(res.stderr, "NameError: x\n");
        assert!(!res.success());
        assert_eq!(std::fs::read_to_string(&script).unwrap(), "echo hello\necho 'NameError: x' >&2\nexit 3\n");
    }

    #[tokio::test]
    async fn overwrites_script_and_runs_in_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("s.py");
        std::fs::write(&script, "exit 9").unwrap();
        let res = sh(Duration::from_secs(10)).run("touch marker\n", &script).await.unwrap();
        assert!(res.success());
        assert!(dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn exports_configured_environment() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("s.py");
        let runner = sh(Duration::from_secs(10)).with_env("MPLBACKEND", "Agg");
        let res = runner.run("printf %s \"$MPLBACKEND\"", &script).await.unwrap();
        assert_eq!(res.stdout, "Agg");
    }

    #[tokio::test]
    async fn hung_script_is_killed_at_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("s.py");
        let started = std::time::Instant::now();
        let err = sh(Duration::from_millis(200)).run("sleep 30\n", &script).await.unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = PythonExecutor::new("/nonexistent/interpreter", Duration::from_secs(1));
        let err = runner.run("print(1)", &dir.path().join("s.py")).await.unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cfg = Config::from_pairs([("EXEC_TIMEOUT", "0")]);
        assert!(PythonExecutor::from_config(&cfg).is_err());
        let cfg = Config::from_pairs([("PYTHON_BIN", "python3")]);
        assert_eq!(PythonExecutor::from_config(&cfg).unwrap().program(), "python3");
    }
}
