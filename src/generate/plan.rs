use std::sync::Arc;

use tracing::info;

use crate::{
    errors::PipelineError,
    llm::TextGenerator,
    model::{ChartRequest, DesignPlan},
    prompts::{Persona, PromptStore},
};

/// Asks the model for a natural-language design plan. Never retries.
pub struct PlanGenerator {
    llm: Arc<dyn TextGenerator>,
    prompts: Arc<PromptStore>,
}

impl PlanGenerator {
    pub fn new(llm: Arc<dyn TextGenerator>, prompts: Arc<PromptStore>) -> Self {
        Self { llm, prompts }
    }

    /// Fails with `UnknownFactor` before any model call if the factor is not in the table.
    pub fn user_prompt(&self, request: &ChartRequest) -> Result<String, PipelineError> {
        let mut prompt = format!(
            "Make a design plan for this data that fits Factor {}. {}",
            request.factor, request.dataset
        );
        if let Some(profile) = self.prompts.factor_profile(request.factor)? {
            prompt.push_str("\n\n");
            prompt.push_str(&profile.render());
        }
        Ok(prompt)
    }

    pub async fn generate(&self, request: &ChartRequest) -> Result<DesignPlan, PipelineError> {
        let user_prompt = self.user_prompt(request)?;
        info!(id = %request.id, factor = request.factor, "requesting design plan");
        let text = self
            .llm
            .generate(self.prompts.persona(Persona::Design), &user_prompt, None)
            .await?;
        Ok(DesignPlan::new(text.trim()))
    }
}
