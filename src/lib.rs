//! Dataset → design plan → generated chart code → executed, repaired chart.

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod errors;
pub mod execution;
pub mod generate;
pub mod handlers;
pub mod llm;
pub mod model;
pub mod pipeline;
pub mod printer;
pub mod prompts;
pub mod repair;
pub mod sanitize;
pub mod utils;

pub use errors::{PipelineError, ServiceError};
pub use model::{ChartRequest, CodeCandidate, DesignPlan};
pub use pipeline::{Pipeline, RunReport};
pub use repair::{Outcome, RepairLoop};
