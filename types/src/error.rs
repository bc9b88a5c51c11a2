//! Errors raised while constructing or parsing fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid weight: {0}")]
    InvalidWeight(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}
