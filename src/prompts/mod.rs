//! Persona prompts and the factor loadings side-table.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{
    config::Config,
    errors::{PipelineError, PromptError},
};

pub mod loadings;

pub use loadings::{LoadingRecord, LoadingsTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    Design,
    Chart,
    Extract,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::Design, Persona::Chart, Persona::Extract];

    pub fn file_name(self) -> &'static str {
        match self {
            Persona::Design => "design-description.txt",
            Persona::Chart => "generate-chart.txt",
            Persona::Extract => "data-extraction.txt",
        }
    }
}

pub fn default_persona_text(persona: Persona) -> &'static str {
    match persona {
        Persona::Design =>
            "You are a data visualization designer.\nGiven a dataset and a design factor, write a concrete design plan for a single static chart.\nCover chart type, encodings, color, annotation, labeling and emphasis.\nDo not write code.",
        Persona::Chart =>
            "You write standalone Python scripts that draw charts with matplotlib or plotly.\nProvide only code as output without any description.\nThe script must end by displaying the figure with plt.show() or fig.show().\nEmbed the data directly in the script; do not read external files.\nIf you are given a script and an error message, return the complete corrected script.",
        Persona::Extract =>
            "You extract data from chart images.\nReturn a JSON object with a \"topic\" string and a \"data\" array of records that reproduce the plotted values.\nAfter the JSON, add one sentence describing what the chart emphasizes.",
    }
}

/// A factor's filtered loadings, ready to embed in a plan prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorProfile {
    pub factor: u32,
    pub threshold: f64,
    pub records: Vec<LoadingRecord>,
}

impl FactorProfile {
    pub fn render(&self) -> String {
        let mut out = format!(
            "Factor {} is characterized by these design features (|loading| > {}):",
            self.factor, self.threshold
        );
        for r in &self.records {
            out.push_str(&format!("\n- {} ({:+.2}): {}", r.category, r.loading, r.definition));
        }
        out
    }
}

/// Static instruction text plus the loadings table, read once at startup.
#[derive(Debug, Clone)]
pub struct PromptStore {
    design: String,
    chart: String,
    extract: String,
    loadings: Option<LoadingsTable>,
    threshold: f64,
}

impl PromptStore {
    pub fn load(cfg: &Config) -> Result<Self, PipelineError> {
        let dir = cfg.prompts_dir();
        let threshold = cfg.get_f64("LOADING_THRESHOLD")?.unwrap_or(0.2);
        let loadings = match cfg.get_path("LOADINGS_PATH") {
            Some(path) => Some(LoadingsTable::from_path(&path)?),
            None => {
                warn!("no LOADINGS_PATH configured; plan prompts will not carry factor loadings");
                None
            }
        };

        Ok(Self {
            design: read_persona(&dir, Persona::Design)?,
            chart: read_persona(&dir, Persona::Chart)?,
            extract: read_persona(&dir, Persona::Extract)?,
            loadings,
            threshold,
        })
    }

    pub fn new(
        design: impl Into<String>,
        chart: impl Into<String>,
        extract: impl Into<String>,
        loadings: Option<LoadingsTable>,
        threshold: f64,
    ) -> Self {
        Self {
            design: design.into(),
            chart: chart.into(),
            extract: extract.into(),
            loadings,
            threshold,
        }
    }

    /// Built-in persona texts and no loadings table.
    pub fn builtin() -> Self {
        Self::new(
            default_persona_text(Persona::Design),
            default_persona_text(Persona::Chart),
            default_persona_text(Persona::Extract),
            None,
            0.2,
        )
    }

    pub fn persona(&self, persona: Persona) -> &str {
        match persona {
            Persona::Design => &self.design,
            Persona::Chart => &self.chart,
            Persona::Extract => &self.extract,
        }
    }

    pub fn loadings(&self) -> Option<&LoadingsTable> {
        self.loadings.as_ref()
    }

    /// Without a table every factor is accepted and `None` is returned.
    pub fn factor_profile(&self, factor: u32) -> Result<Option<FactorProfile>, PromptError> {
        let Some(table) = &self.loadings else {
            return Ok(None);
        };
        let records = table
            .filtered(factor, self.threshold)?
            .into_iter()
            .cloned()
            .collect();
        Ok(Some(FactorProfile { factor, threshold: self.threshold, records }))
    }
}

fn read_persona(dir: &Path, persona: Persona) -> Result<String, PromptError> {
    let path = dir.join(persona.file_name());
    if !path.exists() {
        debug!("{} not found, using built-in persona", path.display());
        return Ok(default_persona_text(persona).to_string());
    }
    fs::read_to_string(&path).map_err(|source| PromptError::Read { path, source })
}

/// Write the built-in persona files, leaving existing ones untouched.
pub fn install_defaults(cfg: &Config) -> Result<Vec<PathBuf>, PromptError> {
    let dir = cfg.prompts_dir();
    fs::create_dir_all(&dir).map_err(|source| PromptError::Write { path: dir.clone(), source })?;
    let mut written = Vec::new();
    for persona in Persona::ALL {
        let path = dir.join(persona.file_name());
        if path.exists() {
            continue;
        }
        fs::write(&path, default_persona_text(persona))
            .map_err(|source| PromptError::Write { path: path.clone(), source })?;
        written.push(path);
    }
    Ok(written)
}
