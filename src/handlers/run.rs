//! Single chart: plan, generate, execute, repair.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::{
    cli::DatasetArgs,
    config::Config,
    llm::LlmClient,
    model::ChartRequest,
    pipeline::Pipeline,
    printer::report_result,
    utils::read_dataset,
};

/// Exhaustion is reported, and turned into a non-zero exit only here at the top.
pub async fn run(cfg: &Config, input: &DatasetArgs, id: &str) -> Result<()> {
    let dataset = read_dataset(&input.dataset)?;
    let llm = Arc::new(LlmClient::from_config(cfg)?);
    let pipeline = Pipeline::from_config(cfg, llm)?;

    let request = ChartRequest::new(id, dataset, input.factor);
    let result = pipeline.process(&request).await;
    report_result(&request, &result);

    match result {
        Ok(report) if report.outcome.is_success() => Ok(()),
        Ok(report) => bail!("no chart produced for {} after {} attempt(s)", request.id, report.outcome.attempts()),
        Err(e) => Err(e.into()),
    }
}
