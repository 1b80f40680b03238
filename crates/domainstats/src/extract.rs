use crate::{EMAIL_FIELD_INDEX, MIN_FIELD_COUNT, Row};

/// Why a row was rejected by [`extract_domain`].
///
/// These are data-quality problems in a single row. They are reported and
/// the row is skipped; they never abort a run.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRow {
    /// The row does not have enough fields to contain an email.
    #[error("row has {found} fields, need more than {}", MIN_FIELD_COUNT)]
    TooFewFields { found: usize },

    /// The email field is present but empty.
    #[error("email field is empty")]
    EmptyEmail,

    /// The email field contains no `@`.
    #[error("email field has no '@' separator")]
    MissingSeparator,

    /// Nothing follows the first `@`.
    #[error("email field has no domain after '@'")]
    EmptyDomain,
}

/// Extracts the email domain from `row`.
///
/// The domain is everything after the first `@` of the field at
/// [`EMAIL_FIELD_INDEX`]. Rows must have more than [`MIN_FIELD_COUNT`] fields.
///
/// # Errors
///
/// Returns a [`MalformedRow`] describing the first check the row failed.
///
/// # Example
///
/// ```
/// use domainstats::{MalformedRow, Row, extract_domain};
///
/// let row = Row::from(vec!["Ada", "Lovelace", "ada@engine.org", "f"]);
/// assert_eq!(extract_domain(&row).unwrap(), "engine.org");
///
/// let short = Row::from(vec!["Ada", "Lovelace"]);
/// assert_eq!(extract_domain(&short), Err(MalformedRow::TooFewFields { found: 2 }));
/// ```
pub fn extract_domain(row: &Row) -> Result<String, MalformedRow> {
    if row.len() <= MIN_FIELD_COUNT {
        return Err(MalformedRow::TooFewFields { found: row.len() });
    }

    let email = row.get(EMAIL_FIELD_INDEX).unwrap_or_default();
    if email.is_empty() {
        return Err(MalformedRow::EmptyEmail);
    }

    match email.split_once('@') {
        Some((_, "")) => Err(MalformedRow::EmptyDomain),
        Some((_, domain)) => Ok(domain.to_owned()),
        None => Err(MalformedRow::MissingSeparator),
    }
}
