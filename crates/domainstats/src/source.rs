//! Streaming record source over a delimited input.
//!
//! [`RecordSource`] wraps a [`csv::Reader`] and hands out one [`Row`] at a
//! time. It never buffers more than the record being decoded, so memory stays
//! flat regardless of input size.
//!
//! The reader is built non-strict about field counts: a short row is a
//! problem for the extractor to flag, not a reason to stop decoding. Anything
//! the decoder itself rejects (invalid UTF-8, I/O failure) is structural and
//! surfaces as [`Error::StructuralDecode`].
//!
//! The decoder accepts broken quoting silently: an unclosed `"` swallows the
//! following lines into one field and a bare `"` is kept as data. Customer
//! fields never hold quotes or line breaks, so a decoded field containing
//! either is reported as bad quoting.

use crate::{DecodeFailure, Error, Result, Row};
use std::{fs::File, io, path::Path};

pub struct RecordSource<R> {
    reader: csv::Reader<R>,
}

impl RecordSource<File> {
    /// Opens `path` and consumes its header record.
    ///
    /// # Errors
    ///
    /// - [`Error::FileUnavailable`] if the file cannot be opened.
    /// - [`Error::MissingHeader`] if the file is empty.
    /// - [`Error::StructuralDecode`] if the header cannot be decoded.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::FileUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(file)
    }
}

impl<R: io::Read> RecordSource<R> {
    /// Wraps `reader` and consumes exactly one header record.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingHeader`] if the input ends before any record.
    /// - [`Error::StructuralDecode`] if the header cannot be decoded.
    pub fn new(reader: R) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut source = Self { reader };

        match source.next_row()? {
            Some(_header) => {
                tracing::trace!("Header consumed");
                Ok(source)
            }
            None => Err(Error::MissingHeader),
        }
    }

    /// Decodes the next record.
    ///
    /// Returns `Ok(None)` once the input is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructuralDecode`] if the stream can no longer be
    /// decoded. The source should not be read further after an error.
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        let mut row = Row::new();
        match self.reader.read_record(&mut row) {
            Ok(true) => {
                check_quoting(&row)?;
                Ok(Some(row))
            }
            Ok(false) => Ok(None),
            Err(e) => Err(Error::structural(e)),
        }
    }
}

fn check_quoting(row: &Row) -> Result<()> {
    for (field, value) in row.iter().enumerate() {
        let failure = if value.contains(|c: char| c == '\n' || c == '\r') {
            DecodeFailure::UnterminatedQuote { field }
        } else if value.contains('"') {
            DecodeFailure::StrayQuote { field }
        } else {
            continue;
        };
        return Err(Error::StructuralDecode {
            line: row.position().map(csv::Position::line),
            source: failure,
        });
    }
    Ok(())
}
