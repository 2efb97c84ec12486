//! Crate-wide error type.
//!
//! Every failure belongs to one of three categories, exposed through
//! [`LayoutError::kind`]. Lookups that can legitimately miss (spatial
//! navigation, index queries) return `Option` rather than an error.

use crate::numeric::ArithmeticError;
use crate::source::SourceError;

/// Failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input or internal state violates a structural rule.
    StructuralInconsistency,
    /// Interval arithmetic could not produce a bounded result.
    ArithmeticFailure,
    /// A requested entity does not exist.
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("structural inconsistency in {context}: {detail}")]
    Structural { context: &'static str, detail: String },

    #[error("arithmetic failure: {0}")]
    Arithmetic(#[from] ArithmeticError),

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("malformed layout source: {0}")]
    Source(#[from] SourceError),
}

impl LayoutError {
    pub fn structural(context: &'static str, detail: impl Into<String>) -> Self {
        LayoutError::Structural {
            context,
            detail: detail.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        LayoutError::NotFound { what: what.into() }
    }

    /// Category of this error. Unreadable input counts as structural.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LayoutError::Structural { .. } | LayoutError::Source(_) => {
                ErrorKind::StructuralInconsistency
            }
            LayoutError::Arithmetic(_) => ErrorKind::ArithmeticFailure,
            LayoutError::NotFound { .. } => ErrorKind::NotFound,
        }
    }
}

pub type Result<T> = std::result::Result<T, LayoutError>;
