use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
/// Errors raised by the CSV store.
///
/// None of them are retried internally: each one is terminal for the
/// operation that raised it.
pub enum CsvError {
    /// The path is missing, unreadable or unwritable at open time.
    #[error("File {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A read or write failed while a stream was in progress.
    #[error("IO from: {0}")]
    Io(String),

    /// The exclusive lock could not be obtained on the first attempt.
    #[error("Lock from: {0}")]
    Lock(String),
}

impl CsvError {
    pub(crate) fn file<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        CsvError::File {
            path: path.into(),
            source,
        }
    }
}

impl From<csv::Error> for CsvError {
    fn from(error: csv::Error) -> Self {
        CsvError::Io(error.to_string())
    }
}

/// Result alias used across the crate.
pub type CsvResult<T> = Result<T, CsvError>;
