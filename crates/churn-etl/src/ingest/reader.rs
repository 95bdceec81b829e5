//! CSV batch reader
//!
//! Parses a headered CSV file into [`RawRecord`]s. Every column is kept,
//! including ones the transform does not know, so staging holds the row as
//! received. A repeated header name is suffixed `.1`, `.2`, ... so every cell
//! keeps its own key.

use chrono::{DateTime, Utc};
use churn_common::{EtlError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::models::{RawRecord, RawValue};

/// Parse all data rows from `reader`.
///
/// Rows with a different field count than the header are a parse error for
/// the whole batch.
pub fn read_records<R: Read>(
    reader: R,
    source_file: &str,
    ingested_at: DateTime<Utc>,
) -> Result<Vec<RawRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = csv_reader.headers()?;
    if headers.iter().all(|header| header.trim().is_empty()) {
        return Err(EtlError::parse(format!("{} has no header row", source_file)));
    }
    let headers = unique_headers(headers.iter());

    let mut records = Vec::new();
    for (row_index, row) in csv_reader.records().enumerate() {
        let row = row?;
        let columns = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| (header.clone(), RawValue::from_cell(cell)))
            .collect();
        records.push(RawRecord::new(source_file, row_index, ingested_at, columns));
    }

    Ok(records)
}

/// Rename repeated headers so no two columns share a key.
///
/// The first occurrence keeps its name, later ones get the lowest free
/// `.N` suffix.
fn unique_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .map(|header| {
            let mut name = header.to_string();
            let mut suffix = 0;
            while seen.contains(&name) {
                suffix += 1;
                name = format!("{}.{}", header, suffix);
            }
            seen.insert(name.clone());
            name
        })
        .collect()
}

/// Read a batch file from disk; `source_file` is the file name
pub fn read_file(path: &Path) -> Result<Vec<RawRecord>> {
    let source_file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| EtlError::parse(format!("{} is not a file path", path.display())))?;

    let file = File::open(path)?;
    let records = read_records(file, &source_file, Utc::now())?;

    tracing::debug!(file = %source_file, rows = records.len(), "Parsed batch file");

    Ok(records)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_rows_with_provenance() {
        let csv = "customerID,tenure,InternetService\nC-1,7,DSL\nC-2,,Fiber\n";
        let now = Utc::now();
        let records = read_records(csv.as_bytes(), "feed.csv", now).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source_file, "feed.csv");
        assert_eq!(records[0].row_index, 0);
        assert_eq!(records[1].row_index, 1);
        assert_eq!(records[0].ingested_at, now);
        assert_eq!(records[0].get("tenure"), Some(&RawValue::from("7")));
        assert_eq!(records[1].get("tenure"), Some(&RawValue::Null));
        assert_eq!(records[1].get("InternetService"), Some(&RawValue::from("Fiber")));
    }

    #[test]
    fn test_header_only_file_has_no_records() {
        let records = read_records("customerID,tenure\n".as_bytes(), "empty.csv", Utc::now())
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_ragged_row_is_a_batch_error() {
        let csv = "customerID,tenure\nC-1,7\nC-2\n";
        let err = read_records(csv.as_bytes(), "bad.csv", Utc::now()).unwrap_err();
        assert!(matches!(err, EtlError::Csv(_)));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = read_records("".as_bytes(), "blank.csv", Utc::now()).unwrap_err();
        assert!(matches!(err, EtlError::Parse(_)));
    }

    #[test]
    fn test_repeated_headers_keep_every_cell() {
        let csv = "customerID,Gender,Gender\nC-1,Female,Male\n";
        let records = read_records(csv.as_bytes(), "dup.csv", Utc::now()).unwrap();

        let record = &records[0];
        assert_eq!(record.get("Gender"), Some(&RawValue::from("Female")));
        assert_eq!(record.get("Gender.1"), Some(&RawValue::from("Male")));

        let payload = record.payload();
        assert_eq!(payload.as_object().unwrap().len(), 3);
        assert_eq!(payload["Gender"], "Female");
        assert_eq!(payload["Gender.1"], "Male");
    }

    #[test]
    fn test_unique_headers_skips_taken_suffixes() {
        let headers = unique_headers(["a", "a.1", "a", "b", "a"].into_iter());
        assert_eq!(headers, vec!["a", "a.1", "a.2", "b", "a.3"]);
    }

    #[test]
    fn test_read_file_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch_01.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "customerID,Email").unwrap();
        writeln!(file, "C-9,x@y.org").unwrap();
        drop(file);

        let records = read_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_file, "batch_01.csv");
    }
}
