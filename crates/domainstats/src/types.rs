//! # Shared record and result types
//!
//! Rows flow through the pipeline as [`Row`]s, extracted domains flow as plain
//! `String`s, and the finished run produces a list of [`DomainCount`]s.

/// One decoded input record. Ephemeral: created per read and consumed by
/// exactly one worker.
pub type Row = csv::StringRecord;

/// Zero-based index of the email field within a row.
pub const EMAIL_FIELD_INDEX: usize = 2;

/// A row qualifies for extraction only if its field count exceeds this value.
pub const MIN_FIELD_COUNT: usize = 3;

/// A single email domain and how many customers use it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DomainCount {
    pub domain: String,
    pub number_of_users: u64,
}

impl DomainCount {
    /// Creates a new count pair.
    pub fn new(domain: impl Into<String>, number_of_users: u64) -> Self {
        Self {
            domain: domain.into(),
            number_of_users,
        }
    }
}

/// The outcome of a successful run.
///
/// `counts` is sorted ascending by domain with no duplicates. `rows_read`
/// counts data records after the header, and `malformed_rows` the subset that
/// were skipped, so the sum of all counts equals
/// `rows_read - malformed_rows`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Report {
    pub counts: Vec<DomainCount>,
    pub rows_read: u64,
    pub malformed_rows: u64,
}

impl Report {
    /// Total number of customers across all domains.
    pub fn total_users(&self) -> u64 {
        self.counts.iter().map(|c| c.number_of_users).sum()
    }
}
