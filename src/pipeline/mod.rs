//! One chart request end to end: artifacts, plan, repair loop.

use std::{num::NonZeroU32, path::PathBuf, sync::Arc, time::Instant};

use tracing::info;

use crate::{
    artifacts::{self, ArtifactStore, RunStatus, RunSummary},
    config::Config,
    errors::PipelineError,
    execution::{PythonExecutor, ScriptRunner},
    generate::{CodeGenerator, PlanGenerator},
    llm::TextGenerator,
    model::ChartRequest,
    prompts::PromptStore,
    repair::{max_retries_from_config, Outcome, RepairLoop},
    sanitize::Sanitizer,
};

pub mod batch;

pub use batch::{run_batch, BatchReport, Manifest, ManifestEntry};

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: Outcome,
    pub plan_path: PathBuf,
    pub summary: RunSummary,
}

pub struct Pipeline {
    plans: PlanGenerator,
    code: CodeGenerator,
    sanitizer: Sanitizer,
    runner: Arc<dyn ScriptRunner>,
    store: ArtifactStore,
    max_retries: NonZeroU32,
}

impl Pipeline {
    pub fn new(
        llm: Arc<dyn TextGenerator>,
        prompts: Arc<PromptStore>,
        runner: Arc<dyn ScriptRunner>,
        store: ArtifactStore,
        max_retries: NonZeroU32,
    ) -> Self {
        Self {
            plans: PlanGenerator::new(llm.clone(), prompts.clone()),
            code: CodeGenerator::new(llm, prompts),
            sanitizer: Sanitizer::default(),
            runner,
            store,
            max_retries,
        }
    }

    pub fn from_config(cfg: &Config, llm: Arc<dyn TextGenerator>) -> Result<Self, PipelineError> {
        let prompts = Arc::new(PromptStore::load(cfg)?);
        let runner = Arc::new(PythonExecutor::from_config(cfg)?);
        Ok(Self::new(
            llm,
            prompts,
            runner,
            ArtifactStore::from_config(cfg),
            max_retries_from_config(cfg)?,
        ))
    }

    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub async fn process(&self, request: &ChartRequest) -> Result<RunReport, PipelineError> {
        artifacts::validate_id(&request.id)?;
        let start = Instant::now();
        info!(id = %request.id, factor = request.factor, "beginning work on chart");
        let run = self.store.open(&request.id)?;

        let plan = self.plans.generate(request).await?;
        let plan_seconds = start.elapsed().as_secs_f64();
        info!(id = %request.id, "made design plan in {:.1}s", plan_seconds);

        let plan_path = run.write_plan(&plan.text)?;

        let repair = RepairLoop::new(&self.code, self.runner.as_ref(), &self.sanitizer, self.max_retries);
        let outcome = repair.run(request, &plan, &run).await?;

        let total_seconds = start.elapsed().as_secs_f64();
        let code_seconds = total_seconds - plan_seconds;
        info!(
            id = %request.id,
            "wrote the code in {:.1}s; pipeline took {:.1}s total",
            code_seconds,
            total_seconds
        );

        let (status, last_error) = match &outcome {
            Outcome::Success { .. } => (RunStatus::Success, None),
            Outcome::Exhausted { last_error, .. } => (RunStatus::Exhausted, Some(last_error.clone())),
        };
        let summary = RunSummary {
            id: request.id.clone(),
            factor: request.factor,
            status,
            attempts: outcome.attempts(),
            max_retries: self.max_retries.get(),
            last_error,
            plan_seconds,
            code_seconds,
            total_seconds,
        };
        run.write_summary(&summary)?;

        Ok(RunReport { outcome, plan_path, summary })
    }
}
