use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Index(#[from] pb_index::IndexError),
}
