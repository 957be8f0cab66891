//! Error types shared by the hiredb crates

use thiserror::Error;

/// Result type alias for hiredb operations
pub type Result<T> = std::result::Result<T, HiredbError>;

/// Errors that are not specific to the server or the loader
#[derive(Error, Debug)]
pub enum HiredbError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),
}
