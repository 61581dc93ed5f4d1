//! Numeric data ingestion.
//!
//! The accepted format is plain text: values separated by commas and/or
//! newlines, e.g. a single comma-separated line or one value per line.
//! Blank lines are skipped; an empty field between two commas is an error.

use mf_common::{Error, Result};
use std::path::Path;

/// Parse all numbers in `text`, in order.
///
/// Line and column numbers in errors are 1-based; the column counts
/// comma-separated fields, not characters.
pub fn parse_values(text: &str) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        for (col_idx, raw) in line.split(',').enumerate() {
            let token = raw.trim();
            let parsed = token.parse::<f64>().ok().filter(|v| v.is_finite());
            match parsed {
                Some(v) => values.push(v),
                None => {
                    return Err(Error::Parse {
                        line: line_idx + 1,
                        column: col_idx + 1,
                        token: token.to_string(),
                    })
                }
            }
        }
    }
    Ok(values)
}

/// Read and parse a data file.
///
/// With `expected = Some(n)` the parsed count must equal `n`.
pub fn read_values(path: &Path, expected: Option<usize>) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)?;
    let values = parse_values(&text)?;
    if let Some(n) = expected {
        if values.len() != n {
            return Err(Error::Config(format!(
                "{} holds {} values but {} were expected",
                path.display(),
                values.len(),
                n
            )));
        }
    }
    Ok(values)
}

/// Render values in the format `parse_values` reads, `per_line` per row.
pub fn format_values(values: &[f64], per_line: usize) -> String {
    let per_line = per_line.max(1);
    let mut out = String::new();
    for chunk in values.chunks(per_line) {
        let row: Vec<String> = chunk.iter().map(|v| format!("{}", v)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}
