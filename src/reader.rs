//! Tabular reader: CSV ingestion with exact full-row deduplication.
//!
//! Both dataset files are deduplicated on the complete raw record (every
//! column, not just the ones the loader keeps) before rows reach the
//! normalizers. Rows that fail to parse are skipped and counted; a
//! malformed row is never fatal.

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Outcome of reading one CSV file.
#[derive(Debug)]
pub struct ReadOutcome<T> {
    pub rows: Vec<T>,
    /// Exact full-row duplicates dropped before deserialization.
    pub duplicates: usize,
    /// Records that failed to parse or deserialize.
    pub malformed: usize,
}

/// Read a CSV file into typed rows, dropping exact full-row duplicates.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<ReadOutcome<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open '{}'", path.display()))?;
    let headers = reader.headers()?.clone();

    let mut seen: FxHashSet<Vec<String>> = FxHashSet::default();
    let mut outcome = ReadOutcome {
        rows: Vec::new(),
        duplicates: 0,
        malformed: 0,
    };

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(_) => {
                outcome.malformed += 1;
                continue;
            }
        };
        let fields: Vec<String> = record.iter().map(str::to_string).collect();
        if !seen.insert(fields) {
            outcome.duplicates += 1;
            continue;
        }
        match record.deserialize(Some(&headers)) {
            Ok(row) => outcome.rows.push(row),
            Err(_) => outcome.malformed += 1,
        }
    }

    Ok(outcome)
}
