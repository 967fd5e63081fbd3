//! Error types for Stride core operations.
//!
//! Following `TigerStyle`: all errors must be handled explicitly.

use std::fmt;

/// The result type for Stride operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Stride operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An invalid argument was provided.
    InvalidArgument {
        /// The name of the argument.
        name: &'static str,
        /// Why it was invalid.
        reason: &'static str,
    },

    /// The requested resource was not found.
    NotFound {
        /// The type of resource.
        resource: &'static str,
        /// An identifier for the resource.
        id: u64,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { name, reason } => {
                write!(f, "invalid argument '{name}': {reason}")
            }
            Self::NotFound { resource, id } => {
                write!(f, "{resource} not found: {id}")
            }
        }
    }
}

impl std::error::Error for Error {}
