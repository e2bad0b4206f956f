use std::{path::Path, sync::Arc};

use crate::{
    errors::ServiceError,
    llm::TextGenerator,
    prompts::{Persona, PromptStore},
};

/// Reads the data back out of an existing chart image.
pub struct DataExtractor {
    llm: Arc<dyn TextGenerator>,
    prompts: Arc<PromptStore>,
}

impl DataExtractor {
    pub fn new(llm: Arc<dyn TextGenerator>, prompts: Arc<PromptStore>) -> Self {
        Self { llm, prompts }
    }

    pub async fn extract(&self, image: &Path) -> Result<String, ServiceError> {
        let text = self
            .llm
            .generate(
                self.prompts.persona(Persona::Extract),
                "Extract the data and information from this image.",
                Some(image),
            )
            .await?;
        Ok(text.trim().to_string())
    }
}
