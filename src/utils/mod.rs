//! Dataset description loading.

use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use anyhow::{bail, Context, Result};
use is_terminal::IsTerminal;

/// Read a dataset description from a file, or from stdin when `source` is `-`.
pub fn read_dataset(source: &str) -> Result<String> {
    let text = if source == "-" {
        read_stdin()?
    } else {
        read_dataset_file(Path::new(source))?
    };
    if text.trim().is_empty() {
        bail!("dataset {} is empty", if source == "-" { "from stdin" } else { source });
    }
    Ok(text)
}

/// Reads stdin to the end, or fails when stdin is an interactive terminal.
pub fn read_stdin() -> Result<String> {
    if io::stdin().is_terminal() {
        bail!("expected dataset on stdin, but stdin is a terminal");
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf).context("reading dataset from stdin")?;
    Ok(buf)
}

/// Text-based dataset files only; the content is passed to the model verbatim.
pub fn read_dataset_file(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!("dataset file '{}' does not exist", path.display());
    }
    if !path.is_file() {
        bail!("'{}' is not a file", path.display());
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "json" | "txt" | "md" | "csv" | "tsv" | "" => fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset '{}'", path.display())),
        _ => bail!(
            "unsupported dataset type: .{}\nCurrently supported: .json, .txt, .md, .csv, .tsv, and files without extension",
            extension
        ),
    }
}
