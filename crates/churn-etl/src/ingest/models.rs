//! Pipeline data models
//!
//! [`RawRecord`] is the schema-less capture of one CSV row, kept verbatim for
//! staging. [`CustomerRecord`] is the typed reporting entity produced from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RowError;

/// One raw scalar as parsed from an input cell or read back from a payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Build a value from a CSV cell; empty cells are null
    pub fn from_cell(cell: &str) -> Self {
        if cell.is_empty() {
            RawValue::Null
        } else {
            RawValue::Text(cell.to_string())
        }
    }

    /// True for `Null` and for `NaN` numbers
    pub fn is_null(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Number(n) => n.is_nan(),
            RawValue::Text(_) => false,
        }
    }

    /// String form of a non-null value
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Null => None,
            RawValue::Number(n) if n.is_nan() => None,
            RawValue::Number(n) => Some(n.to_string()),
            RawValue::Text(s) => Some(s.clone()),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            RawValue::Null => serde_json::Value::Null,
            RawValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            RawValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "null"),
        }
    }
}

/// One input row with provenance; immutable once staged
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub source_file: String,
    /// Zero-based data row position within the source file
    pub row_index: usize,
    pub ingested_at: DateTime<Utc>,
    columns: Vec<(String, RawValue)>,
}

impl RawRecord {
    pub fn new(
        source_file: impl Into<String>,
        row_index: usize,
        ingested_at: DateTime<Utc>,
        columns: Vec<(String, RawValue)>,
    ) -> Self {
        Self {
            source_file: source_file.into(),
            row_index,
            ingested_at,
            columns,
        }
    }

    /// Convenience constructor from `(column, value)` pairs
    pub fn from_pairs<V: Into<RawValue> + Clone>(
        source_file: impl Into<String>,
        row_index: usize,
        pairs: &[(&str, V)],
    ) -> Self {
        let columns = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone().into()))
            .collect();
        Self::new(source_file, row_index, Utc::now(), columns)
    }

    /// Columns in input order
    pub fn columns(&self) -> &[(String, RawValue)] {
        &self.columns
    }

    /// Value of the first column named exactly `name`
    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// JSON object of every column, in input order, used as the staging payload
    pub fn payload(&self) -> serde_json::Value {
        let map = self
            .columns
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

/// Reporting entity, keyed by `customer_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub gender: String,
    pub senior_citizen: bool,
    pub partner: String,
    pub dependents: String,
    pub tenure: i32,
    pub phone_hash: Option<String>,
    pub email_hash: Option<String>,
    pub contract: String,
    pub monthly_charges: f64,
    pub total_charges: f64,
    pub churn: bool,
    pub updated_at: DateTime<Utc>,
}

/// Whether an upsert created the row or replaced an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// A row skipped by the transform-load step
#[derive(Debug, Clone)]
pub struct RowFailure {
    pub row_index: usize,
    pub error: RowError,
    pub row: serde_json::Value,
}

/// Outcome of one transform-load call
#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    pub rows_in: usize,
    pub rows_out: usize,
    pub inserted: usize,
    pub updated: usize,
    pub duration_seconds: f64,
    pub failures: Vec<RowFailure>,
}

impl LoadStats {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Free-text note recorded in the batch audit entry
    pub fn notes(&self) -> String {
        match self.failed() {
            0 => "OK".to_string(),
            n => format!("Completed with {} failed rows", n),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cell_is_null() {
        assert_eq!(RawValue::from_cell(""), RawValue::Null);
        assert_eq!(RawValue::from_cell(" "), RawValue::Text(" ".to_string()));
        assert!(RawValue::Number(f64::NAN).is_null());
    }

    #[test]
    fn test_payload_preserves_unknown_columns_and_order() {
        let record = RawRecord::from_pairs(
            "feed.csv",
            0,
            &[("customerID", "C-1"), ("InternetService", "Fiber"), ("Phone", "")],
        );
        let payload = record.payload();
        let keys: Vec<_> = payload.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["customerID", "InternetService", "Phone"]);
        assert_eq!(payload["InternetService"], "Fiber");
    }

    #[test]
    fn test_payload_deserializes_back_to_raw_values() {
        let value: std::collections::BTreeMap<String, RawValue> =
            serde_json::from_str(r#"{"tenure": 7, "Churn": "Yes", "Email": null}"#).unwrap();
        assert_eq!(value["tenure"], RawValue::Number(7.0));
        assert_eq!(value["Churn"], RawValue::Text("Yes".to_string()));
        assert_eq!(value["Email"], RawValue::Null);
    }

    #[test]
    fn test_integral_number_renders_without_fraction() {
        assert_eq!(RawValue::Number(42.0).as_text().as_deref(), Some("42"));
        assert_eq!(RawValue::Number(29.85).as_text().as_deref(), Some("29.85"));
    }

    #[test]
    fn test_load_stats_notes() {
        let mut stats = LoadStats::default();
        assert_eq!(stats.notes(), "OK");
        stats.failures.push(RowFailure {
            row_index: 3,
            error: RowError::MissingCustomerId,
            row: serde_json::Value::Null,
        });
        assert_eq!(stats.notes(), "Completed with 1 failed rows");
    }
}
