//! Field normalization
//!
//! Coercions here never fail: anything that cannot be interpreted falls back
//! to the documented default. Range checks that can reject a row live in the
//! transform step.

use std::collections::HashMap;

use super::models::{RawRecord, RawValue};

/// Strings that coerce to `true` for yes/no style columns (compared lowercase)
pub const TRUTHY: [&str; 4] = ["yes", "y", "true", "1"];

/// Input columns the transform understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceColumn {
    CustomerId,
    Gender,
    SeniorCitizen,
    Partner,
    Dependents,
    Tenure,
    Phone,
    Email,
    Contract,
    MonthlyCharges,
    TotalCharges,
    Churn,
}

impl SourceColumn {
    pub const ALL: [SourceColumn; 12] = [
        SourceColumn::CustomerId,
        SourceColumn::Gender,
        SourceColumn::SeniorCitizen,
        SourceColumn::Partner,
        SourceColumn::Dependents,
        SourceColumn::Tenure,
        SourceColumn::Phone,
        SourceColumn::Email,
        SourceColumn::Contract,
        SourceColumn::MonthlyCharges,
        SourceColumn::TotalCharges,
        SourceColumn::Churn,
    ];

    /// Header names accepted for this column, in lookup order (case-sensitive)
    pub fn names(self) -> &'static [&'static str] {
        match self {
            SourceColumn::CustomerId => &["customerID"],
            SourceColumn::Gender => &["gender", "Gender"],
            SourceColumn::SeniorCitizen => &["SeniorCitizen"],
            SourceColumn::Partner => &["Partner"],
            SourceColumn::Dependents => &["Dependents"],
            SourceColumn::Tenure => &["tenure"],
            SourceColumn::Phone => &["Phone"],
            SourceColumn::Email => &["Email"],
            SourceColumn::Contract => &["Contract"],
            SourceColumn::MonthlyCharges => &["MonthlyCharges"],
            SourceColumn::TotalCharges => &["TotalCharges"],
            SourceColumn::Churn => &["Churn"],
        }
    }

    /// First non-null value among this column's accepted names
    pub fn lookup(self, record: &RawRecord) -> Option<&RawValue> {
        self.names()
            .iter()
            .filter_map(|name| record.get(name))
            .find(|value| !value.is_null())
    }
}

/// Column → default value table, applied before any other transform
#[derive(Debug, Clone)]
pub struct FieldDefaults {
    defaults: HashMap<SourceColumn, RawValue>,
}

impl Default for FieldDefaults {
    fn default() -> Self {
        let defaults = [
            (SourceColumn::Gender, RawValue::from("Unknown")),
            (SourceColumn::SeniorCitizen, RawValue::Number(0.0)),
            (SourceColumn::Partner, RawValue::from("No")),
            (SourceColumn::Dependents, RawValue::from("No")),
            (SourceColumn::Tenure, RawValue::Number(0.0)),
            (SourceColumn::Phone, RawValue::from("")),
            (SourceColumn::Email, RawValue::from("")),
            (SourceColumn::Contract, RawValue::from("Unknown")),
            (SourceColumn::MonthlyCharges, RawValue::Number(0.0)),
            (SourceColumn::TotalCharges, RawValue::Number(0.0)),
            (SourceColumn::Churn, RawValue::from("No")),
        ];

        Self {
            defaults: defaults.into_iter().collect(),
        }
    }
}

impl FieldDefaults {
    /// Override or add the default for one column
    pub fn with_default(mut self, column: SourceColumn, value: impl Into<RawValue>) -> Self {
        self.defaults.insert(column, value.into());
        self
    }

    pub fn get(&self, column: SourceColumn) -> Option<&RawValue> {
        self.defaults.get(&column)
    }

    /// Resolve every known column of `record`, back-filling missing or null
    /// values from the table. Columns without a default stay null.
    pub fn backfill(&self, record: &RawRecord) -> DefaultedRow {
        let values = SourceColumn::ALL
            .iter()
            .map(|&column| {
                let value = column
                    .lookup(record)
                    .or_else(|| self.get(column))
                    .cloned()
                    .unwrap_or(RawValue::Null);
                (column, value)
            })
            .collect();

        DefaultedRow { values }
    }
}

/// Known columns of one record after default back-fill
#[derive(Debug, Clone)]
pub struct DefaultedRow {
    values: HashMap<SourceColumn, RawValue>,
}

static NULL: RawValue = RawValue::Null;

impl DefaultedRow {
    pub fn get(&self, column: SourceColumn) -> &RawValue {
        self.values.get(&column).unwrap_or(&NULL)
    }
}

fn parse_float(value: &RawValue) -> Option<f64> {
    let parsed = match value {
        RawValue::Null => None,
        RawValue::Number(n) => Some(*n),
        RawValue::Text(s) => s.trim().parse::<f64>().ok(),
    };
    parsed.filter(|n| n.is_finite())
}

/// Integer coercion: parse as float (so "3.0" works), truncate toward zero
pub fn to_int(value: &RawValue, default: i64) -> i64 {
    match parse_float(value) {
        Some(n) if n >= i64::MIN as f64 && n < i64::MAX as f64 => n.trunc() as i64,
        _ => default,
    }
}

/// Decimal coercion
pub fn to_decimal(value: &RawValue, default: f64) -> f64 {
    parse_float(value).unwrap_or(default)
}

/// String coercion; null becomes `default`
pub fn to_text(value: &RawValue, default: Option<&str>) -> Option<String> {
    value.as_text().or_else(|| default.map(str::to_string))
}

/// Yes/no style boolean: case-insensitive match against [`TRUTHY`]
pub fn to_bool_from_text(value: &RawValue) -> bool {
    value
        .as_text()
        .map(|text| {
            let text = text.trim().to_lowercase();
            TRUTHY.contains(&text.as_str())
        })
        .unwrap_or(false)
}

/// 0/1 style boolean: digit strings and whole numbers are tested for nonzero
pub fn to_bool_from_digit(value: &RawValue) -> bool {
    match value {
        RawValue::Text(s) => {
            let s = s.trim();
            !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) && s.bytes().any(|b| b != b'0')
        }
        RawValue::Number(n) => n.is_finite() && n.fract() == 0.0 && *n > 0.0,
        RawValue::Null => false,
    }
}
