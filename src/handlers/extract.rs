//! Data extraction from an existing chart image.

use std::{path::Path, sync::Arc};

use anyhow::{bail, Result};

use crate::{config::Config, generate::DataExtractor, llm::LlmClient, prompts::PromptStore};

pub async fn run(cfg: &Config, image: &Path) -> Result<()> {
    if !image.is_file() {
        bail!("image file '{}' does not exist", image.display());
    }
    let prompts = Arc::new(PromptStore::load(cfg)?);
    let llm = Arc::new(LlmClient::from_config(cfg)?);
    let text = DataExtractor::new(llm, prompts).extract(image).await?;
    println!("{}", text);
    Ok(())
}
