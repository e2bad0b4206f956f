use std::sync::Arc;

use tracing::debug;

use crate::{
    errors::ServiceError,
    llm::TextGenerator,
    model::{CodeCandidate, DesignPlan},
    prompts::{Persona, PromptStore},
};

/// Stateless: each call sees only what is passed in.
pub struct CodeGenerator {
    llm: Arc<dyn TextGenerator>,
    prompts: Arc<PromptStore>,
}

impl CodeGenerator {
    pub fn new(llm: Arc<dyn TextGenerator>, prompts: Arc<PromptStore>) -> Self {
        Self { llm, prompts }
    }

    pub async fn initial(&self, plan: &DesignPlan, dataset: &str) -> Result<String, ServiceError> {
        let user_prompt = format!(
            "Provide the code for a chart that follows the given design plan.\n{}\n\nHere is the chart data.\n{}",
            plan.text, dataset
        );
        debug!("requesting initial chart code");
        self.llm
            .generate(self.prompts.persona(Persona::Chart), &user_prompt, None)
            .await
    }

    pub async fn repair(&self, previous: &CodeCandidate, error: &str) -> Result<String, ServiceError> {
        let user_prompt = format!(
            "The following chart code failed when it was run.\n\n```python\n{}\n```\n\nError output:\n{}\n\nReturn the complete corrected code.",
            previous.source,
            error.trim_end()
        );
        debug!(previous_attempt = previous.attempt, "requesting repaired chart code");
        self.llm
            .generate(self.prompts.persona(Persona::Chart), &user_prompt, None)
            .await
    }
}
