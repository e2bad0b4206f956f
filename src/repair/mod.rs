//! The generate → execute → repair state machine for one chart request.
//!
//! `Init → Generated → Executed → {Success | Failed}`; `Failed` goes back to
//! `Generated` through a repair call while attempts remain, otherwise to
//! `Exhausted`. Each repair sees only the immediately preceding candidate and
//! its error text.

use std::{num::NonZeroU32, path::PathBuf};

use tracing::{debug, error, info, warn};

use crate::{
    artifacts::RunArtifacts,
    config::Config,
    errors::{ConfigError, ExecError, PipelineError},
    execution::{ExecutionResult, ScriptRunner},
    generate::CodeGenerator,
    model::{ChartRequest, CodeCandidate, DesignPlan},
    sanitize::Sanitizer,
};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

pub fn max_retries_from_config(cfg: &Config) -> Result<NonZeroU32, ConfigError> {
    let raw = cfg.get_u64("MAX_RETRIES")?.unwrap_or(DEFAULT_MAX_RETRIES as u64);
    u32::try_from(raw)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| ConfigError::Invalid {
            key: "MAX_RETRIES".into(),
            value: raw.to_string(),
            reason: "must be between 1 and 4294967295".into(),
        })
}

/// Terminal state of a repair loop. Exhaustion is reported, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        attempts: u32,
        image: PathBuf,
    },
    Exhausted {
        attempts: u32,
        failed_code: PathBuf,
        last_error: String,
    },
}

impl Outcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Outcome::Success { attempts, .. } | Outcome::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

enum State {
    Init,
    Generated { candidate: CodeCandidate, redirected: bool },
    Executed { candidate: CodeCandidate, result: ExecutionResult },
    Failed { candidate: CodeCandidate, error: String },
    Success,
    Exhausted { candidate: CodeCandidate, error: String },
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Init => "init",
            State::Generated { .. } => "generated",
            State::Executed { .. } => "executed",
            State::Failed { .. } => "failed",
            State::Success => "success",
            State::Exhausted { .. } => "exhausted",
        }
    }
}

pub struct RepairLoop<'a> {
    codegen: &'a CodeGenerator,
    runner: &'a dyn ScriptRunner,
    sanitizer: &'a Sanitizer,
    max_retries: NonZeroU32,
}

impl<'a> RepairLoop<'a> {
    pub fn new(
        codegen: &'a CodeGenerator,
        runner: &'a dyn ScriptRunner,
        sanitizer: &'a Sanitizer,
        max_retries: NonZeroU32,
    ) -> Self {
        Self { codegen, runner, sanitizer, max_retries }
    }

    /// Only service errors and environment failures (artifact I/O, a missing
    /// interpreter) escape; script failures are resolved inside the loop.
    /// An interpreter that cannot be run still leaves the candidate as failed code.
    pub async fn run(
        &self,
        request: &ChartRequest,
        plan: &DesignPlan,
        artifacts: &RunArtifacts,
    ) -> Result<Outcome, PipelineError> {
        let max = self.max_retries.get();
        let mut attempts: u32 = 0;
        let mut state = State::Init;

        loop {
            let from = state.name();
            state = match state {
                State::Init => {
                    let raw = self.codegen.initial(plan, &request.dataset).await?;
                    self.candidate(attempts, &raw, artifacts)
                }
                State::Generated { candidate, redirected } => {
                    attempts += 1;
                    info!(id = %request.id, "attempt {attempts}/{max} at constructing chart code");
                    artifacts.clear_image()?;
                    if !redirected {
                        warn!(id = %request.id, attempt = candidate.attempt, "no display call to redirect; not executing");
                        artifacts.write_code(&candidate.source)?;
                        let error = self.sanitization_gap_message();
                        State::Failed { candidate, error }
                    } else {
                        match self.runner.run(&candidate.source, &artifacts.code_path()).await {
                            Ok(result) => State::Executed { candidate, result },
                            Err(ExecError::Timeout { after }) => {
                                warn!(id = %request.id, attempt = candidate.attempt, "chart script timed out");
                                let error = format!(
                                    "The script did not finish within {} seconds and was terminated. \
                                     It must not wait for input, open interactive windows, or loop forever.",
                                    after.as_secs()
                                );
                                State::Failed { candidate, error }
                            }
                            Err(e) => {
                                // The request still ends with exactly one terminal artifact.
                                error!(id = %request.id, "cannot run chart script: {e}");
                                artifacts.clear_image()?;
                                artifacts.write_failed_code(&candidate.source)?;
                                return Err(e.into());
                            }
                        }
                    }
                }
                State::Executed { candidate, result } => {
                    debug!(exit_code = ?result.exit_code, stdout = %result.stdout, stderr = %result.stderr, "chart script finished");
                    if !result.success() {
                        info!(id = %request.id, exit_code = ?result.exit_code, "chart script failed");
                        State::Failed { candidate, error: result.diagnostic() }
                    } else if !artifacts.has_image() {
                        warn!(id = %request.id, "chart script succeeded but wrote no image");
                        let error = format!(
                            "The script exited successfully but did not save the chart to {}.",
                            artifacts.image_path().display()
                        );
                        State::Failed { candidate, error }
                    } else {
                        info!(id = %request.id, "chart script successful");
                        State::Success
                    }
                }
                State::Failed { candidate, error } => {
                    if attempts < max {
                        let raw = self.codegen.repair(&candidate, &error).await?;
                        self.candidate(attempts, &raw, artifacts)
                    } else {
                        State::Exhausted { candidate, error }
                    }
                }
                State::Success => {
                    return Ok(Outcome::Success { attempts, image: artifacts.image_path() });
                }
                State::Exhausted { candidate, error } => {
                    artifacts.clear_image()?;
                    let failed_code = artifacts.write_failed_code(&candidate.source)?;
                    warn!(id = %request.id, "giving up after {attempts} attempts");
                    return Ok(Outcome::Exhausted { attempts, failed_code, last_error: error });
                }
            };
            debug!(id = %request.id, "{from} -> {}", state.name());
        }
    }

    fn candidate(&self, attempt: u32, raw: &str, artifacts: &RunArtifacts) -> State {
        let sanitized = self.sanitizer.sanitize(raw, &artifacts.image_path());
        if let Some(strategy) = sanitized.strategy {
            debug!(attempt, strategy, "redirected display call");
        }
        State::Generated {
            redirected: sanitized.strategy.is_some(),
            candidate: CodeCandidate { attempt, source: sanitized.code },
        }
    }

    fn sanitization_gap_message(&self) -> String {
        format!(
            "The script never displays the chart, so the figure cannot be saved. \
             Display it with one of: {}.",
            self.sanitizer.hints().join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_retries_must_be_positive() {
        let cfg = Config::from_pairs(std::iter::empty::<(&str, &str)>());
        assert_eq!(max_retries_from_config(&cfg).unwrap().get(), DEFAULT_MAX_RETRIES);
        let cfg = Config::from_pairs([("MAX_RETRIES", "0")]);
        assert!(max_retries_from_config(&cfg).is_err());
        let cfg = Config::from_pairs([("MAX_RETRIES", "5")]);
        assert_eq!(max_retries_from_config(&cfg).unwrap().get(), 5);
    }
}
