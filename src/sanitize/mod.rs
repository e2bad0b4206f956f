//! Text rewrite of generated code: drop markdown fences, make the display call persist an image.

use std::{path::Path, sync::LazyLock};

use regex::Regex;

pub mod strategy;

pub use strategy::{OutputRedirect, ShowCallRedirect};

static FENCE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*```[A-Za-z0-9_+-]*[ \t]*\r?$\n?").expect("valid fence regex"));

/// Result of one sanitize pass. `strategy` is `None` when no display idiom matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub code: String,
    pub strategy: Option<&'static str>,
}

/// Ordered set of redirect strategies; the first one that detects its idiom wins.
pub struct Sanitizer {
    strategies: Vec<Box<dyn OutputRedirect>>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::empty()
            .with_strategy(ShowCallRedirect::matplotlib())
            .with_strategy(ShowCallRedirect::plotly())
    }
}

impl Sanitizer {
    pub fn empty() -> Self {
        Self { strategies: Vec::new() }
    }

    pub fn with_strategy(mut self, strategy: impl OutputRedirect + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn hints(&self) -> Vec<String> {
        self.strategies.iter().map(|s| s.hint()).collect()
    }

    pub fn sanitize(&self, raw: &str, image_path: &Path) -> Sanitized {
        let code = strip_fences(raw);
        match self.strategies.iter().find(|s| s.detect(&code)) {
            Some(strategy) => Sanitized {
                code: strategy.inject(&code, image_path),
                strategy: Some(strategy.name()),
            },
            None => Sanitized { code, strategy: None },
        }
    }
}

/// Removes whole fence delimiter lines (with optional language tag) and trims.
pub fn strip_fences(raw: &str) -> String {
    FENCE_LINE.replace_all(raw, "").trim().to_string()
}
