//! Typed root causes for failures.
//!
//! Loading and saving return `anyhow` errors with context naming the file, but the innermost
//! cause is always a [`DataError`], so callers can tell the kinds apart with
//! `err.downcast_ref::<DataError>()`.
use crate::GeoField;
use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    /// The file is missing or could not be read.
    #[error("cannot read \"{}\"", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The destination of a save is not writable.
    #[error("permission denied writing \"{}\"", path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A row could not be decoded (bad date, bad number, wrong field count).
    ///
    /// `row` is 1-based and does not count the header.
    #[error("malformed row {row}: {message}")]
    Format { row: u64, message: String },
    /// None of the accepted names for a required column is in the header.
    #[error("missing required column `{column}` (accepted names: {})", accepted.join(", "))]
    MissingColumn {
        column: &'static str,
        accepted: &'static [&'static str],
    },
    /// A save was requested with no rows, so there are no keys for the header.
    #[error("nothing to save")]
    NothingToSave,
    /// An optional table was needed but no path is configured for it.
    #[error("no {0} table configured")]
    NoSource(&'static str),
}

impl DataError {
    /// Classify a `csv` error, keeping I/O failures separate from malformed data.
    pub(crate) fn from_csv(path: Option<&std::path::Path>, error: csv::Error) -> Self {
        // the header is record 0, so record indices are already 1-based row numbers
        let row = error.position().map(|pos| pos.record()).unwrap_or(0);
        match error.into_kind() {
            csv::ErrorKind::Io(source) => DataError::Io {
                path: path.map(Into::into).unwrap_or_default(),
                source,
            },
            csv::ErrorKind::Deserialize { err, .. } => DataError::Format {
                row,
                message: err.to_string(),
            },
            csv::ErrorKind::UnequalLengths {
                expected_len, len, ..
            } => DataError::Format {
                row,
                message: format!("expected {} fields, found {}", expected_len, len),
            },
            csv::ErrorKind::Utf8 { err, .. } => DataError::Format {
                row,
                message: err.to_string(),
            },
            other => DataError::Format {
                row,
                message: format!("{:?}", other),
            },
        }
    }

    /// Classify an error opening a file for writing.
    pub(crate) fn from_write(path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            DataError::PermissionDenied { path, source }
        } else {
            DataError::Io { path, source }
        }
    }
}

/// A geographic filter value that matches no case in the data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} \"{name}\" is not found in the case data")]
pub struct LocationNotFound {
    pub field: GeoField,
    pub name: String,
}
