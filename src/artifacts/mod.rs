//! Per-request artifact directories under the output root.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{config::Config, errors::ArtifactError};

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.output_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates `<root>/<id>/` and clears terminal files left by an earlier run of the same id.
    pub fn open(&self, id: &str) -> Result<RunArtifacts, ArtifactError> {
        validate_id(id)?;
        let dir = self.root.join(id);
        fs::create_dir_all(&dir).map_err(|source| ArtifactError::Io { path: dir.clone(), source })?;
        // Absolute, because the path is embedded in code run from another cwd.
        let dir = dir
            .canonicalize()
            .map_err(|source| ArtifactError::Io { path: dir.clone(), source })?;

        let run = RunArtifacts { id: id.to_string(), dir };
        run.clear_image()?;
        let stale = run.failed_code_path();
        match fs::remove_file(&stale) {
            Ok(()) => debug!("removed stale {}", stale.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(ArtifactError::Io { path: stale, source }),
        }
        Ok(run)
    }
}

/// Ids name a directory under the root, so they must be a single plain path component.
pub fn validate_id(id: &str) -> Result<(), ArtifactError> {
    let bad = id.trim().is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\'])
        || id.chars().any(char::is_control);
    if bad {
        return Err(ArtifactError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// The files belonging to one chart request.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    id: String,
    dir: PathBuf,
}

impl RunArtifacts {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn plan_path(&self) -> PathBuf {
        self.dir.join(format!("{}_design_plan.txt", self.id))
    }

    pub fn code_path(&self) -> PathBuf {
        self.dir.join(format!("{}_chart_code.py", self.id))
    }

    pub fn image_path(&self) -> PathBuf {
        self.dir.join(format!("{}_design.png", self.id))
    }

    pub fn failed_code_path(&self) -> PathBuf {
        self.dir.join(format!("{}_failed_code.py", self.id))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(format!("{}_summary.json", self.id))
    }

    pub fn has_image(&self) -> bool {
        self.image_path().is_file()
    }

    pub fn write_plan(&self, plan: &str) -> Result<PathBuf, ArtifactError> {
        write(self.plan_path(), plan)
    }

    pub fn write_code(&self, code: &str) -> Result<PathBuf, ArtifactError> {
        write(self.code_path(), code)
    }

    pub fn write_failed_code(&self, code: &str) -> Result<PathBuf, ArtifactError> {
        write(self.failed_code_path(), code)
    }

    /// A candidate that crashed after saving must not leave its image behind.
    pub fn clear_image(&self) -> Result<(), ArtifactError> {
        let path = self.image_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ArtifactError::Io { path, source }),
        }
    }

    pub fn write_summary(&self, summary: &RunSummary) -> Result<PathBuf, ArtifactError> {
        write(self.summary_path(), &serde_json::to_string_pretty(summary)?)
    }
}

fn write(path: PathBuf, contents: &str) -> Result<PathBuf, ArtifactError> {
    fs::write(&path, contents).map_err(|source| ArtifactError::Io { path: path.clone(), source })?;
    Ok(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Exhausted,
}

/// Machine-readable record of how a request ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: String,
    pub factor: u32,
    pub status: RunStatus,
    pub attempts: u32,
    pub max_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub plan_seconds: f64,
    pub code_seconds: f64,
    pub total_seconds: f64,
}
