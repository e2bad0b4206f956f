//! Values that flow through one chart request.

use serde::{Deserialize, Serialize};

/// One pipeline invocation. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub id: String,
    pub dataset: String,
    pub factor: u32,
}

impl ChartRequest {
    pub fn new(id: impl Into<String>, dataset: impl Into<String>, factor: u32) -> Self {
        Self { id: id.into(), dataset: dataset.into(), factor }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignPlan {
    pub text: String,
}

impl DesignPlan {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Sanitized source of one attempt. `attempt` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeCandidate {
    pub attempt: u32,
    pub source: String,
}
