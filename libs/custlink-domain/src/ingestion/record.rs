//! Customer record entities
//!
//! A line of an uploaded file becomes a [`CandidateRecord`]; a candidate whose
//! national ID passes the checksum becomes a [`ValidatedRecord`]; the validated
//! records of one upload form a [`Batch`].

use std::ops::Deref;

use crate::ingestion::national_id::NationalId;

/// Number of positional fields in a customer record
pub const FIELD_COUNT: usize = 8;

/// One parsed line of a customer file, not yet validated
///
/// All fields are kept as the raw tokens of the line. Dates and monetary
/// values are not interpreted here; they are persisted verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    /// National identification number, raw
    pub national_id: String,
    /// Classification flag (private customer or not)
    pub classification: String,
    /// Completeness flag (incomplete registration or not)
    pub completeness: String,
    /// Date of the last purchase
    pub last_purchase_date: String,
    /// Average ticket value
    pub average_ticket: String,
    /// Ticket value of the last purchase
    pub last_purchase_ticket: String,
    /// Store the customer visits most often
    pub most_frequent_store: String,
    /// Store of the last purchase
    pub last_purchase_store: String,
}

impl CandidateRecord {
    /// Build a record from whitespace-separated tokens
    ///
    /// The first eight tokens are mapped positionally, anything beyond is
    /// ignored. Returns `None` when fewer than eight tokens are given.
    pub fn from_tokens(tokens: &[&str]) -> Option<Self> {
        match tokens {
            [national_id, classification, completeness, last_purchase_date, average_ticket, last_purchase_ticket, most_frequent_store, last_purchase_store, ..] => {
                Some(Self {
                    national_id: national_id.to_string(),
                    classification: classification.to_string(),
                    completeness: completeness.to_string(),
                    last_purchase_date: last_purchase_date.to_string(),
                    average_ticket: average_ticket.to_string(),
                    last_purchase_ticket: last_purchase_ticket.to_string(),
                    most_frequent_store: most_frequent_store.to_string(),
                    last_purchase_store: last_purchase_store.to_string(),
                })
            }
            _ => None,
        }
    }

    /// The eight fields in their positional order
    pub fn tokens(&self) -> [&str; FIELD_COUNT] {
        [
            &self.national_id,
            &self.classification,
            &self.completeness,
            &self.last_purchase_date,
            &self.average_ticket,
            &self.last_purchase_ticket,
            &self.most_frequent_store,
            &self.last_purchase_store,
        ]
    }

    /// Validate the national ID
    ///
    /// Hands the candidate back unchanged when the checksum fails.
    pub fn validate(self) -> Result<ValidatedRecord, CandidateRecord> {
        match NationalId::parse(&self.national_id) {
            Some(id) => Ok(ValidatedRecord { id, record: self }),
            None => Err(self),
        }
    }
}

/// A candidate record whose national ID passed checksum validation
///
/// Only obtainable through [`CandidateRecord::validate`]. Derefs to the
/// underlying candidate for field access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRecord {
    id: NationalId,
    record: CandidateRecord,
}

impl ValidatedRecord {
    /// The validated national ID
    pub fn national_id(&self) -> &NationalId {
        &self.id
    }

    /// Unwrap back into the plain record
    pub fn into_inner(self) -> CandidateRecord {
        self.record
    }
}

impl Deref for ValidatedRecord {
    type Target = CandidateRecord;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

/// The ordered validated records of one ingestion run
#[derive(Debug, Default)]
pub struct Batch {
    records: Vec<ValidatedRecord>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, keeping input order
    pub fn push(&mut self, record: ValidatedRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidatedRecord> {
        self.records.iter()
    }
}

impl IntoIterator for Batch {
    type Item = ValidatedRecord;
    type IntoIter = std::vec::IntoIter<ValidatedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a ValidatedRecord;
    type IntoIter = std::slice::Iter<'a, ValidatedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
