//! Access engine error types.

use arbor_core::{GrantId, IdentityId};
use std::fmt;

use crate::store::StoreError;

/// Errors surfaced by the access engine's entry points.
#[derive(Debug)]
pub enum AccessError {
    /// A grant request's URI tree did not contain exactly one root.
    InvalidTreeShape {
        /// Number of roots the tree actually had.
        roots: usize,
    },
    /// An operation referenced identities that do not resolve.
    IdentityNotFound {
        /// The identities that could not be found.
        ids: Vec<IdentityId>,
    },
    /// An operation referenced a grant that does not exist.
    GrantNotFound {
        /// The missing grant's ID.
        id: GrantId,
    },
    /// A persistence operation failed.
    Store {
        /// Error details.
        details: String,
    },
    /// A materialization task failed to complete.
    TaskFailed {
        /// Error details.
        details: String,
    },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTreeShape { roots } => {
                write!(f, "URI tree must have exactly one root, found {}", roots)
            }
            Self::IdentityNotFound { ids } => {
                write!(f, "identities not found: ")?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", id)?;
                }
                Ok(())
            }
            Self::GrantNotFound { id } => {
                write!(f, "grant not found: {}", id)
            }
            Self::Store { details } => {
                write!(f, "store operation failed: {}", details)
            }
            Self::TaskFailed { details } => {
                write!(f, "materialization task failed: {}", details)
            }
        }
    }
}

impl std::error::Error for AccessError {}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        Self::Store {
            details: err.to_string(),
        }
    }
}
