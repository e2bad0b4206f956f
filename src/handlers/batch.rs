//! Manifest-driven batch over many chart requests.

use std::{path::Path, sync::Arc};

use anyhow::{bail, Result};

use crate::{
    config::Config,
    llm::LlmClient,
    pipeline::{run_batch, Manifest, Pipeline},
    printer::{report_result, TextPrinter},
};

pub async fn run(cfg: &Config, manifest_path: &Path, fail_fast: bool) -> Result<()> {
    let (manifest, base_dir) = Manifest::load(manifest_path)?;
    let requests = manifest.expand(&base_dir)?;
    if requests.is_empty() {
        bail!("manifest {} contains no requests", manifest_path.display());
    }

    let llm = Arc::new(LlmClient::from_config(cfg)?);
    let pipeline = Pipeline::from_config(cfg, llm)?;

    TextPrinter { color: Some("cyan") }.print(&format!(
        "Processing {} chart request(s) into {}",
        requests.len(),
        pipeline.store().root().display()
    ));
    let report = run_batch(&pipeline, &requests, fail_fast, report_result).await;

    TextPrinter { color: None }.print(&format!(
        "\n{} succeeded, {} exhausted, {} errored, {} skipped (of {})",
        report.succeeded.len(),
        report.exhausted.len(),
        report.errored.len(),
        report.skipped.len(),
        report.total()
    ));
    if !report.errored.is_empty() {
        bail!("{} request(s) failed with errors", report.errored.len());
    }
    Ok(())
}
