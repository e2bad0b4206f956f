#![allow(dead_code)]

use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use chartgen::{
    errors::{ExecError, ServiceError},
    execution::{ExecutionResult, ScriptRunner},
    llm::TextGenerator,
};

/// Returns queued responses in order and records every prompt pair.
#[derive(Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<String, ServiceError>>>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedLlm {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|s| Ok(s.into())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_error(&self, err: ServiceError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn push(&self, text: &str) {
        self.responses.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn user_prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, u)| u.clone()).collect()
    }
}

#[async_trait]
impl TextGenerator for ScriptedLlm {
    async fn generate(&self, system: &str, user: &str, _image: Option<&Path>) -> Result<String, ServiceError> {
        self.calls.lock().unwrap().push((system.to_string(), user.to_string()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ServiceError::EmptyResponse))
    }
}

#[derive(Debug, Clone)]
pub enum Run {
    /// Non-zero exit with the given stderr.
    Fail(i32, &'static str),
    /// Exit 0 and write the image next to the script.
    Render,
    /// Exit 0 without writing the image.
    NoImage,
    /// Write the image, then crash.
    RenderThenFail,
    Timeout,
    /// The interpreter cannot be started.
    Missing,
}

/// Plays back queued outcomes; records the code it was asked to run.
pub struct ScriptedRunner {
    runs: Mutex<VecDeque<Run>>,
    pub executed: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new(runs: impl IntoIterator<Item = Run>) -> Self {
        Self { runs: Mutex::new(runs.into_iter().collect()), executed: Mutex::new(Vec::new()) }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

/// `<dir>/<id>_chart_code.py` -> `<dir>/<id>_design.png`
pub fn image_for_script(script: &Path) -> PathBuf {
    let name = script.file_name().unwrap().to_string_lossy();
    let id = name.strip_suffix("_chart_code.py").unwrap();
    script.with_file_name(format!("{id}_design.png"))
}

#[async_trait]
impl ScriptRunner for ScriptedRunner {
    async fn run(&self, code: &str, script_path: &Path) -> Result<ExecutionResult, ExecError> {
        fs::write(script_path, code).unwrap();
        self.executed.lock().unwrap().push(code.to_string());
        let run = self.runs.lock().unwrap().pop_front().expect("unexpected extra execution");
        let ok = ExecutionResult { exit_code: Some(0), stdout: String::new(), stderr: String::new() };
        match run {
            Run::Fail(code, stderr) => Ok(ExecutionResult {
                exit_code: Some(code),
                stdout: String::new(),
                stderr: stderr.to_string(),
            }),
            Run::Render => {
                fs::write(image_for_script(script_path), b"\x89PNG").unwrap();
                Ok(ok)
            }
            Run::NoImage => Ok(ok),
            Run::RenderThenFail => {
                fs::write(image_for_script(script_path), b"\x89PNG").unwrap();
                Ok(ExecutionResult { exit_code: Some(1), stdout: String::new(), stderr: "late crash".into() })
            }
            Run::Timeout => Err(ExecError::Timeout { after: Duration::from_secs(120) }),
            Run::Missing => Err(ExecError::Spawn {
                program: "python".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

/// A candidate the default sanitizer will redirect, tagged so prompts can be traced.
pub fn chart_code(tag: &str) -> String {
    format!("```python\nimport matplotlib.pyplot as plt\n# {tag}\nplt.plot([1, 2, 3])\nplt.show()\n```")
}
