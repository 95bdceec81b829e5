//! Raw row → [`CustomerRecord`]
//!
//! Defaults are applied first, then type coercions and PII hashing. The only
//! failures are the validation rules below; everything else has a fallback.

use chrono::{DateTime, Utc};

use super::anonymize::Anonymizer;
use super::models::{CustomerRecord, RawRecord};
use super::normalize::{self, FieldDefaults, SourceColumn};
use crate::error::RowError;

const UNKNOWN: &str = "Unknown";
const NO: &str = "No";

#[derive(Debug, Clone, Default)]
pub struct CustomerTransformer {
    defaults: FieldDefaults,
    anonymizer: Anonymizer,
}

impl CustomerTransformer {
    pub fn new(defaults: FieldDefaults, anonymizer: Anonymizer) -> Self {
        Self {
            defaults,
            anonymizer,
        }
    }

    /// Build the reporting entity for one raw record.
    ///
    /// Rejects the row when `customerID` is missing or blank, when tenure is
    /// negative or does not fit the reporting column, and when either charge
    /// is negative.
    pub fn transform(
        &self,
        record: &RawRecord,
        updated_at: DateTime<Utc>,
    ) -> Result<CustomerRecord, RowError> {
        let row = self.defaults.backfill(record);

        let customer_id = row
            .get(SourceColumn::CustomerId)
            .as_text()
            .filter(|id| !id.trim().is_empty())
            .ok_or(RowError::MissingCustomerId)?;

        let tenure = normalize::to_int(row.get(SourceColumn::Tenure), 0);
        if tenure < 0 {
            return Err(RowError::NegativeValue {
                field: "tenure",
                value: tenure.to_string(),
            });
        }
        let tenure = i32::try_from(tenure).map_err(|_| RowError::OutOfRange {
            field: "tenure",
            value: tenure.to_string(),
        })?;

        let monthly_charges = non_negative(
            "MonthlyCharges",
            normalize::to_decimal(row.get(SourceColumn::MonthlyCharges), 0.0),
        )?;
        let total_charges = non_negative(
            "TotalCharges",
            normalize::to_decimal(row.get(SourceColumn::TotalCharges), 0.0),
        )?;

        let contacts = self.anonymizer.contact_hashes(&row);
        let text = |column: SourceColumn, default: &'static str| {
            normalize::to_text(row.get(column), Some(default))
                .unwrap_or_else(|| default.to_string())
        };

        Ok(CustomerRecord {
            customer_id,
            gender: text(SourceColumn::Gender, UNKNOWN),
            senior_citizen: normalize::to_bool_from_digit(row.get(SourceColumn::SeniorCitizen)),
            partner: text(SourceColumn::Partner, NO),
            dependents: text(SourceColumn::Dependents, NO),
            tenure,
            phone_hash: contacts.phone_hash,
            email_hash: contacts.email_hash,
            contract: text(SourceColumn::Contract, UNKNOWN),
            monthly_charges,
            total_charges,
            churn: normalize::to_bool_from_text(row.get(SourceColumn::Churn)),
            updated_at,
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, RowError> {
    if value < 0.0 {
        Err(RowError::NegativeValue {
            field,
            value: value.to_string(),
        })
    } else {
        Ok(value)
    }
}
