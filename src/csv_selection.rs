//! Suite selections read from a spreadsheet export.
//!
//! The file starts with two header rows. Each following row is
//! `suite name, owner, email, links, ...` where the links cell holds one or
//! more newline-separated test-plan URLs carrying `planId` and `suiteId`
//! query parameters.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::SuiteSelection;

const HEADER_ROWS: usize = 2;
const MIN_COLUMNS: usize = 4;

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV: {0}")]
    Malformed(#[from] csv::Error),
}

/// One link found in the file.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SelectionEntry {
    pub suite_name: String,
    pub owner: String,
    pub email: String,
    pub url: String,
    pub plan_id: u64,
    pub suite_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedSelection {
    pub entries: Vec<SelectionEntry>,
    pub selection: SuiteSelection,
}

pub fn parse_selection_csv(path: &Path) -> Result<ParsedSelection, CsvError> {
    let file = File::open(path).map_err(|source| CsvError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = parse_selection(file)?;
    info!(
        path = %path.display(),
        entries = parsed.entries.len(),
        plans = parsed.selection.plan_count(),
        suites = parsed.selection.suite_count(),
        "Parsed selection file"
    );
    Ok(parsed)
}

/// Parse selection rows from any reader. Rows with too few columns and
/// links without both ids are skipped.
pub fn parse_selection<R: Read>(reader: R) -> Result<ParsedSelection, CsvError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut parsed = ParsedSelection::default();
    for record in csv.records().skip(HEADER_ROWS) {
        let record = record?;
        if record.len() < MIN_COLUMNS {
            debug!(columns = record.len(), "Skipping short row");
            continue;
        }
        let field = |i: usize| record.get(i).unwrap_or_default().trim().to_string();

        for url in record.get(3).unwrap_or_default().lines() {
            let url = url.trim();
            let Some((plan_id, suite_id)) = ids_from_url(url) else {
                continue;
            };
            parsed.selection.insert(plan_id, suite_id);
            parsed.entries.push(SelectionEntry {
                suite_name: field(0),
                owner: field(1),
                email: field(2),
                url: url.to_string(),
                plan_id,
                suite_id,
            });
        }
    }

    Ok(parsed)
}

/// `planId` and `suiteId` from a URL's query string.
///
/// Only those two values are decoded; the first occurrence of each wins.
pub fn ids_from_url(url: &str) -> Option<(u64, u64)> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();

    let mut plan_id = None;
    let mut suite_id = None;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let slot = match key {
            "planId" => &mut plan_id,
            "suiteId" => &mut suite_id,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(urlencoding::decode(value).ok()?.trim().parse::<u64>().ok()?);
        }
    }

    Some((plan_id?, suite_id?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_ids_from_query() {
        assert_eq!(
            ids_from_url("https://dev.azure.com/org/p/_testPlans/define?planId=123&suiteId=456"),
            Some((123, 456))
        );
        assert_eq!(
            ids_from_url("https://dev.azure.com/org/p/_testPlans/execute?planId=1&suiteId=abc#x"),
            None
        );
        assert_eq!(ids_from_url("https://x/?suiteId=7&planId=%31%32"), Some((12, 7)));
        assert_eq!(ids_from_url("https://x/?planId=1"), None);
        assert_eq!(ids_from_url("not a url"), None);
    }

    #[test]
    fn ignores_badly_encoded_unrelated_parameters() {
        assert_eq!(
            ids_from_url("https://x/_testPlans/define?planId=3&note=%FF%FE&suiteId=4"),
            Some((3, 4))
        );
    }

    #[test]
    fn first_occurrence_wins() {
        assert_eq!(ids_from_url("https://x/?planId=1&suiteId=2&planId=9&suiteId=8"), Some((1, 2)));
    }
}
