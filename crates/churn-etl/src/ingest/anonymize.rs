//! One-way hashing of PII columns
//!
//! Phone and email are replaced by the hex SHA-256 of their exact value.
//! Absent or blank values hash to `None` so a missing contact never looks
//! like a real one. `customerID` is the join key and is stored verbatim.

use churn_common::digest;

use super::models::RawValue;
use super::normalize::{DefaultedRow, SourceColumn};

/// PII source columns and the reporting column that holds their digest
pub const PII_COLUMNS: [(SourceColumn, &str); 2] = [
    (SourceColumn::Phone, "phone_hash"),
    (SourceColumn::Email, "email_hash"),
];

/// Digests of the contact columns of one row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactHashes {
    pub phone_hash: Option<String>,
    pub email_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymizer;

impl Anonymizer {
    pub fn new() -> Self {
        Self
    }

    /// SHA-256 hex of `value`, or `None` for null/blank input
    pub fn hash(&self, value: Option<&str>) -> Option<String> {
        value
            .filter(|v| !v.trim().is_empty())
            .map(digest::sha256_hex)
    }

    pub fn hash_value(&self, value: &RawValue) -> Option<String> {
        self.hash(value.as_text().as_deref())
    }

    pub fn contact_hashes(&self, row: &DefaultedRow) -> ContactHashes {
        let [(phone, _), (email, _)] = PII_COLUMNS;
        ContactHashes {
            phone_hash: self.hash_value(row.get(phone)),
            email_hash: self.hash_value(row.get(email)),
        }
    }
}
