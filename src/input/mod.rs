//! Domain list loading.
//!
//! Reads the crawl input: a CSV file whose header row names the domain column,
//! or a plain list with one domain per line. Values are normalized and
//! de-duplicated, keeping first-occurrence order.

mod normalize;

use std::collections::HashSet;
use std::path::Path;

use log::info;

use crate::error_handling::InputError;

pub use normalize::normalize_domain;

/// Loads the ordered, de-duplicated domain list from `path`.
///
/// CSV input is used when the first row contains a header equal to `column`
/// (case-insensitive); otherwise every non-empty line that is not a `#`
/// comment is taken as a domain.
///
/// # Errors
///
/// Returns `InputError` if the file cannot be read, a CSV record is malformed,
/// or a `.csv` file has no header named `column`.
pub fn load_domains(path: &Path, column: &str) -> Result<Vec<String>, InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let raw = match csv_column_index(&content, column)? {
        Some(index) => {
            info!("Reading domains from CSV column {column:?}");
            read_csv_column(&content, index)?
        }
        None if is_csv(path) => {
            return Err(InputError::MissingColumn {
                path: path.display().to_string(),
                column: column.to_string(),
            });
        }
        None => read_lines(&content),
    };

    Ok(dedup_normalized(raw))
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

fn csv_column_index(content: &str, column: &str) -> Result<Option<usize>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());
    let headers = reader.headers()?;
    Ok(headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(column.trim())))
}

fn read_csv_column(content: &str, index: usize) -> Result<Vec<String>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(index) {
            values.push(value.to_string());
        }
    }
    Ok(values)
}

fn read_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn dedup_normalized(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut domains = Vec::with_capacity(raw.len());
    for value in raw {
        if let Some(domain) = normalize_domain(&value) {
            if seen.insert(domain.clone()) {
                domains.push(domain);
            }
        }
    }
    domains
}
