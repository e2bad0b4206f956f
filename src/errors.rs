//! Typed error hierarchy for the chart pipeline.
//!
//! Only `ServiceError` (and environment failures wrapped in `PipelineError`)
//! escapes a request; script failures stay inside the repair loop.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Failures talking to the text-generation service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM error: {status} - {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("invalid request header: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("failed to read image attachment {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures loading personas or the loadings table.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("failed to read prompt file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write prompt file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed loadings table {path}: {message}")]
    Loadings { path: PathBuf, message: String },

    #[error("factor {factor} is not in the loadings table (known: {known:?})")]
    UnknownFactor { factor: u32, known: Vec<u32> },
}

/// Failures running a generated script. A non-zero exit is not an error.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to write script {path}: {source}")]
    WriteScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn interpreter {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for script: {0}")]
    Wait(#[source] std::io::Error),

    #[error("script timed out after {}s", .after.as_secs_f64())]
    Timeout { after: Duration },
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("invalid request id {0:?}")]
    InvalidId(String),

    #[error("artifact I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode run summary: {0}")]
    Summary(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Everything that may escape the processing of one chart request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
