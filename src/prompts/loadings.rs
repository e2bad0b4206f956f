//! Factor loadings table: `category,definition,<factor columns…>` CSV.

use std::{collections::BTreeMap, fs::File, io::Read, path::Path};

use crate::errors::PromptError;

#[derive(Debug, Clone, PartialEq)]
pub struct LoadingRecord {
    pub category: String,
    pub definition: String,
    pub loading: f64,
}

#[derive(Debug, Clone, Default)]
pub struct LoadingsTable {
    by_factor: BTreeMap<u32, Vec<LoadingRecord>>,
}

impl LoadingsTable {
    pub fn from_path(path: &Path) -> Result<Self, PromptError> {
        let file = File::open(path).map_err(|source| PromptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(file, path)
    }

    pub fn parse<R: Read>(reader: R, origin: &Path) -> Result<Self, PromptError> {
        let malformed = |message: String| PromptError::Loadings {
            path: origin.to_path_buf(),
            message,
        };

        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers().map_err(|e| malformed(e.to_string()))?.clone();
        if headers.len() < 3 {
            return Err(malformed(
                "expected columns: category, definition, and at least one factor".into(),
            ));
        }

        let factors = headers
            .iter()
            .skip(2)
            .map(|h| parse_factor_header(h).ok_or_else(|| malformed(format!("bad factor column {h:?}"))))
            .collect::<Result<Vec<u32>, _>>()?;

        let mut by_factor: BTreeMap<u32, Vec<LoadingRecord>> =
            factors.iter().map(|f| (*f, Vec::new())).collect();

        for (line, row) in rdr.records().enumerate() {
            let row = row.map_err(|e| malformed(e.to_string()))?;
            let category = row.get(0).unwrap_or_default().to_string();
            let definition = row.get(1).unwrap_or_default().to_string();
            for (factor, cell) in factors.iter().zip(row.iter().skip(2)) {
                if cell.is_empty() {
                    continue;
                }
                let loading = cell.parse::<f64>().map_err(|_| {
                    malformed(format!("row {}: loading {cell:?} is not a number", line + 2))
                })?;
                if let Some(records) = by_factor.get_mut(factor) {
                    records.push(LoadingRecord {
                        category: category.clone(),
                        definition: definition.clone(),
                        loading,
                    });
                }
            }
        }

        Ok(Self { by_factor })
    }

    pub fn factors(&self) -> Vec<u32> {
        self.by_factor.keys().copied().collect()
    }

    pub fn contains(&self, factor: u32) -> bool {
        self.by_factor.contains_key(&factor)
    }

    /// Records of `factor` with `|loading| > threshold`, in table order.
    pub fn filtered(&self, factor: u32, threshold: f64) -> Result<Vec<&LoadingRecord>, PromptError> {
        let records = self.by_factor.get(&factor).ok_or_else(|| PromptError::UnknownFactor {
            factor,
            known: self.factors(),
        })?;
        Ok(records.iter().filter(|r| r.loading.abs() > threshold).collect())
    }
}

/// Accepts `3`, `factor3`, `Factor 3`, `F3`.
fn parse_factor_header(header: &str) -> Option<u32> {
    let digits = header.trim_start_matches(|c: char| !c.is_ascii_digit());
    if digits.is_empty() {
        return None;
    }
    digits.trim().parse().ok()
}
