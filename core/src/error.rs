use thiserror::Error;

use crate::models::DocKind;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Doc not found: {0}")]
    NotFound(String),

    #[error("Doc {id} is a {found}, expected a {expected}")]
    WrongKind {
        id: String,
        expected: DocKind,
        found: DocKind,
    },

    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Schema error: {0}")]
    Schema(String),
}

impl Error {
    /// True for errors that indicate a bug in calling code rather than bad external data.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::WrongKind { .. } | Error::Integrity(_)
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
