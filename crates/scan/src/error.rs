//! Error types for row scanning

use crate::index::FieldPath;
use rowscan_value::ValueError;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a row source
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which row-source primitive failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ColumnDiscovery,
    ValueAssignment,
    Iteration,
    Release,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::ColumnDiscovery => "column discovery",
            Phase::ValueAssignment => "value assignment",
            Phase::Iteration => "iteration",
            Phase::Release => "release",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    // Destination errors
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    #[error("Destination {0} is not a sequence")]
    NotASequence(&'static str),

    #[error("Map key type {key_type} is not string-like")]
    UnsupportedMapKey { key_type: &'static str },

    // Type shape errors
    #[error(
        "Type {type_name} maps column {column} twice: at {first} and at {second}"
    )]
    DuplicateColumnMapping {
        type_name: &'static str,
        column: String,
        first: FieldPath,
        second: FieldPath,
    },

    // Row shape errors
    #[error("Duplicate column in result set: {0}")]
    DuplicateColumn(String),

    #[error("Missing destination field for column {column} in {type_name}")]
    UnmappedColumn {
        type_name: &'static str,
        column: String,
    },

    #[error("Column {column} selects {ancestor} and one of its members at once")]
    OverlappingColumns { column: String, ancestor: String },

    #[error("Column {column} cannot be stored as {value_type}: {source}")]
    UnconvertibleMapValue {
        column: String,
        value_type: &'static str,
        #[source]
        source: ValueError,
    },

    #[error("Scalar destination expects {expected} column, found {found}")]
    ColumnCountMismatch { expected: usize, found: usize },

    // Cardinality errors
    #[error("No rows in result set")]
    NotFound,

    #[error("Expected exactly one row, found {0}")]
    TooManyRows(usize),

    // Row source errors
    #[error("Row source failed during {phase}: {source}")]
    Source {
        phase: Phase,
        #[source]
        source: SourceError,
    },

    #[error("{primary} (releasing rows also failed: {release})")]
    Release {
        primary: Box<Error>,
        release: SourceError,
    },
}

impl Error {
    pub(crate) fn from_source(phase: Phase, source: SourceError) -> Self {
        Error::Source { phase, source }
    }

    /// The failure that ended the scan, ignoring any secondary release failure
    pub fn primary(&self) -> &Error {
        match self {
            Error::Release { primary, .. } => primary.primary(),
            other => other,
        }
    }

    /// The release failure recorded alongside the primary failure, if any
    pub fn release_failure(&self) -> Option<&SourceError> {
        match self {
            Error::Release { release, .. } => Some(release),
            _ => None,
        }
    }

    /// Attach a release failure without replacing `self` as the primary error
    pub(crate) fn with_release_failure(self, release: SourceError) -> Self {
        Error::Release {
            primary: Box::new(self),
            release,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_failure_keeps_primary() {
        let err = Error::NotFound.with_release_failure("socket closed".into());

        assert!(matches!(err.primary(), Error::NotFound));
        assert_eq!(
            err.release_failure().map(|e| e.to_string()),
            Some("socket closed".to_string())
        );
        assert!(err.to_string().contains("No rows in result set"));
    }

    #[test]
    fn test_source_phase_in_message() {
        let err = Error::from_source(Phase::ColumnDiscovery, "boom".into());
        assert_eq!(
            err.to_string(),
            "Row source failed during column discovery: boom"
        );
    }
}
