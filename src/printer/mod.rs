//! Printers: colored status lines and markdown (termimad).

use owo_colors::OwoColorize;
use termimad::MadSkin;

use crate::{errors::PipelineError, model::ChartRequest, pipeline::RunReport, repair::Outcome};

pub struct TextPrinter {
    pub color: Option<&'static str>,
}

impl TextPrinter {
    pub fn print(&self, text: &str) {
        println!("{}", self.paint(text));
    }

    pub fn eprint(&self, text: &str) {
        eprintln!("{}", self.paint(text));
    }

    fn paint(&self, text: &str) -> String {
        match self.color {
            Some("green") => text.green().to_string(),
            Some("red") => text.red().to_string(),
            Some("cyan") => text.cyan().to_string(),
            Some("yellow") => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
        println!();
    }
}

/// One console line per finished request.
pub fn report_result(request: &ChartRequest, result: &Result<RunReport, PipelineError>) {
    match result {
        Ok(report) => match &report.outcome {
            Outcome::Success { attempts, image } => TextPrinter { color: Some("green") }.print(&format!(
                "✔ {}: chart rendered after {} attempt(s) -> {}",
                request.id,
                attempts,
                image.display()
            )),
            Outcome::Exhausted { attempts, failed_code, last_error } => {
                TextPrinter { color: Some("yellow") }.print(&format!(
                    "✘ {}: gave up after {} attempt(s); last code kept at {}",
                    request.id,
                    attempts,
                    failed_code.display()
                ));
                let last_line = last_error.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
                if !last_line.is_empty() {
                    TextPrinter { color: None }.print(&format!("  last error: {}", last_line.trim()));
                }
            }
        },
        Err(e) => TextPrinter { color: Some("red") }.eprint(&format!("✘ {}: {}", request.id, e)),
    }
}
