//! Design plan only, printed to stdout.

use std::sync::Arc;

use anyhow::Result;

use crate::{
    cli::DatasetArgs,
    config::Config,
    generate::PlanGenerator,
    llm::LlmClient,
    model::ChartRequest,
    printer::MarkdownPrinter,
    prompts::PromptStore,
    utils::read_dataset,
};

pub async fn run(cfg: &Config, input: &DatasetArgs, markdown: bool) -> Result<()> {
    let dataset = read_dataset(&input.dataset)?;
    let prompts = Arc::new(PromptStore::load(cfg)?);
    let llm = Arc::new(LlmClient::from_config(cfg)?);
    let generator = PlanGenerator::new(llm, prompts);

    let request = ChartRequest::new("plan", dataset, input.factor);
    let plan = generator.generate(&request).await?;
    if markdown {
        MarkdownPrinter::default().print(&plan.text);
    } else {
        println!("{}", plan.text);
    }
    Ok(())
}
