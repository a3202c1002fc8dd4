use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

/// A file is unreadable as a PB file. Anything less severe degrades into
/// [`crate::DataWarning`]s instead.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("file is not valid UTF-8 text: {0}")]
    NotText(#[from] std::str::Utf8Error),

    #[error("no META/PROJECTS/VOTES section header found")]
    NoSections,

    #[error("parse did not complete within {0:?}")]
    Timeout(Duration),
}
