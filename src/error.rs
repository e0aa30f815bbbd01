//! Error types for Judhur

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JudhurError {
    /// Rejected before touching the store (blank query and the like).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The corpus store could not be reached or the query failed.
    #[error("corpus store unavailable: {0}")]
    Unavailable(String),

    /// Corpus rows disagree with each other. Call sites that can skip the
    /// offending row log a warning instead of surfacing this.
    #[error("corpus inconsistency: {0}")]
    Inconsistent(String),
}

impl From<rusqlite::Error> for JudhurError {
    fn from(err: rusqlite::Error) -> Self {
        JudhurError::Unavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JudhurError>;
