//! CFI error types
//!
//! Shared failure vocabulary for generation, parsing and interpretation.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for CFI operations
pub type Result<T> = std::result::Result<T, CfiError>;

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A node of a specific kind was required
    NodeType,
    /// A numeric offset or index fell outside its valid bound
    OutOfRange,
    /// An idref, spine item or manifest item could not be located
    NotFound,
    /// Malformed CFI string
    Syntax,
    /// Missing argument or failed assertion
    Validation,
}

/// CFI error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CfiError {
    /// Operation received a node of the wrong kind
    #[error("Node type error: {0}")]
    NodeType(String),

    /// Offset or index outside `[min, max]`
    #[error("{message} (got {value}, valid range {min}..={max})")]
    OutOfRange {
        value: i64,
        min: i64,
        max: i64,
        message: String,
    },

    /// Referenced item does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed CFI string
    #[error("Syntax error at position {position}: {message} (near '{fragment}')")]
    Syntax {
        message: String,
        position: usize,
        fragment: String,
    },

    /// Missing or invalid argument
    #[error("Validation error: {0}")]
    Validation(String),

    /// The node found at a step does not carry the asserted id
    #[error("ID assertion failed at step /{index}: expected '{expected}', found {found:?}")]
    IdAssertionMismatch {
        index: u32,
        expected: String,
        found: Option<String>,
    },

    /// The markup handed to the XML adapter could not be parsed
    #[error("Malformed document: {0}")]
    MalformedDocument(String),
}

impl CfiError {
    pub(crate) fn out_of_range(value: i64, min: i64, max: i64, message: impl Into<String>) -> Self {
        CfiError::OutOfRange {
            value,
            min,
            max,
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CfiError::NodeType(_) => ErrorKind::NodeType,
            CfiError::OutOfRange { .. } => ErrorKind::OutOfRange,
            CfiError::NotFound(_) => ErrorKind::NotFound,
            CfiError::Syntax { .. } => ErrorKind::Syntax,
            CfiError::Validation(_)
            | CfiError::IdAssertionMismatch { .. }
            | CfiError::MalformedDocument(_) => ErrorKind::Validation,
        }
    }
}

impl From<roxmltree::Error> for CfiError {
    fn from(err: roxmltree::Error) -> Self {
        CfiError::MalformedDocument(err.to_string())
    }
}
