//! Typed errors for the library. The binary wraps these in `anyhow`.

use std::path::PathBuf;

use thiserror::Error;

use crate::layout::ownership::PositionOwner;

/// Problems with the tabular input. Raised at load time so a bad row never
/// reaches the scene as a silent `NaN`.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path} row {row}: missing column `{column}`")]
    MissingField {
        path: PathBuf,
        row: usize,
        column: &'static str,
    },
    #[error("{path} row {row}: column `{column}` is not a number: {value:?}")]
    BadNumber {
        path: PathBuf,
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("{path} row {row}: column `{column}` is not a date: {value:?}")]
    BadDate {
        path: PathBuf,
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("duplicate permit year {year}")]
    DuplicateYear { year: i32 },
}

#[derive(Debug, Error)]
pub enum StoryError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("positions are held by {held:?}; {requested:?} cannot claim them")]
    OwnershipConflict {
        held: PositionOwner,
        requested: PositionOwner,
    },
    #[error("step index {index} is out of range (story has {len} steps)")]
    UnknownStep { index: usize, len: usize },
    #[error("no data loaded for {0}")]
    MissingScene(&'static str),
}
