//! Batch driver: a manifest of datasets × factors × variants, processed one at a time.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{Pipeline, RunReport};
use crate::{errors::PipelineError, model::ChartRequest, utils::read_dataset_file};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub requests: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Prefix of every generated id.
    pub name: String,
    #[serde(default)]
    pub dataset: Option<String>,
    /// Relative paths resolve against the manifest's directory.
    #[serde(default)]
    pub dataset_path: Option<PathBuf>,
    pub factors: Vec<u32>,
    #[serde(default = "default_variants")]
    pub variants: u32,
}

fn default_variants() -> u32 {
    1
}

impl Manifest {
    pub fn load(path: &Path) -> Result<(Self, PathBuf)> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading manifest: {}", path.display()))?;
        let manifest: Manifest = serde_json::from_str(&text)
            .with_context(|| format!("parsing manifest: {}", path.display()))?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok((manifest, base))
    }

    /// Ids are `<name>_factor<f>_<v>` with `v` counting from 1.
    pub fn expand(&self, base_dir: &Path) -> Result<Vec<ChartRequest>> {
        let mut requests = Vec::new();
        let mut seen = HashSet::new();
        for entry in &self.requests {
            let dataset = match (&entry.dataset, &entry.dataset_path) {
                (Some(text), None) => text.clone(),
                (None, Some(rel)) => read_dataset_file(&base_dir.join(rel))?,
                _ => bail!("manifest entry {:?} needs exactly one of dataset or dataset_path", entry.name),
            };
            if entry.factors.is_empty() {
                bail!("manifest entry {:?} lists no factors", entry.name);
            }
            for factor in &entry.factors {
                for variant in 1..=entry.variants {
                    let id = format!("{}_factor{}_{}", entry.name, factor, variant);
                    if !seen.insert(id.clone()) {
                        bail!("duplicate request id {id:?} in manifest");
                    }
                    requests.push(ChartRequest::new(id, dataset.clone(), *factor));
                }
            }
        }
        Ok(requests)
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub exhausted: Vec<String>,
    pub errored: Vec<(String, String)>,
    pub skipped: Vec<String>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.exhausted.len() + self.errored.len() + self.skipped.len()
    }
}

/// Exhausted requests never stop the batch; errors stop it only with `fail_fast`.
pub async fn run_batch<F>(
    pipeline: &Pipeline,
    requests: &[ChartRequest],
    fail_fast: bool,
    mut on_result: F,
) -> BatchReport
where
    F: FnMut(&ChartRequest, &Result<RunReport, PipelineError>),
{
    let mut report = BatchReport::default();
    for (i, request) in requests.iter().enumerate() {
        info!(id = %request.id, "request {}/{}", i + 1, requests.len());
        let result = pipeline.process(request).await;
        on_result(request, &result);
        match result {
            Ok(run) if run.outcome.is_success() => report.succeeded.push(request.id.clone()),
            Ok(_) => report.exhausted.push(request.id.clone()),
            Err(e) => {
                error!(id = %request.id, "request failed: {e}");
                report.errored.push((request.id.clone(), e.to_string()));
                if fail_fast {
                    report.skipped.extend(requests[i + 1..].iter().map(|r| r.id.clone()));
                    break;
                }
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(json: &str) -> Manifest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn expands_factors_and_variants_into_ids() {
        let m = manifest(r#"{"requests": [{"name": "spain", "dataset": "{}", "factors": [1, 4], "variants": 2}]}"#);
        let ids: Vec<_> = m.expand(Path::new(".")).unwrap().into_iter().map(|r| (r.id, r.factor)).collect();
        assert_eq!(
            ids,
            [
                ("spain_factor1_1".to_string(), 1),
                ("spain_factor1_2".to_string(), 1),
                ("spain_factor4_1".to_string(), 4),
                ("spain_factor4_2".to_string(), 4),
            ]
        );
    }

    #[test]
    fn dataset_paths_resolve_against_manifest_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cell.json"), "{\"topic\": \"Cellphone\"}").unwrap();
        let path = dir.path().join("batch.json");
        fs::write(&path, r#"{"requests": [{"name": "cellphone", "dataset_path": "cell.json", "factors": [3]}]}"#).unwrap();

        let (m, base) = Manifest::load(&path).unwrap();
        let requests = m.expand(&base).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, "cellphone_factor3_1");
        assert!(requests[0].dataset.contains("Cellphone"));
    }

    #[test]
    fn rejects_ambiguous_or_duplicate_entries() {
        let both = manifest(r#"{"requests": [{"name": "a", "dataset": "x", "dataset_path": "y", "factors": [1]}]}"#);
        assert!(both.expand(Path::new(".")).is_err());

        let neither = manifest(r#"{"requests": [{"name": "a", "factors": [1]}]}"#);
        assert!(neither.expand(Path::new(".")).is_err());

        let dup = manifest(r#"{"requests": [{"name": "a", "dataset": "x", "factors": [1, 1]}]}"#);
        assert!(dup.expand(Path::new(".")).is_err());

        let none = manifest(r#"{"requests": [{"name": "a", "dataset": "x", "factors": []}]}"#);
        assert!(none.expand(Path::new(".")).is_err());
    }
}
