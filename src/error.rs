//! Errors raised while validating or transforming catalogs.

use thiserror::Error;

use crate::table::ColumnKind;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Everything that can go wrong when handing catalogs to this crate.
///
/// All checks happen before any matching or merging is done,
/// so an error never comes with a partially built catalog.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    /// A required column is not part of the catalog.
    #[error("column '{column}' not found in catalog")]
    MissingColumn {
        /// Name of the column.
        column: String,
    },

    /// A coordinate cell is masked although the row takes part in matching.
    #[error("column '{column}' is missing a value in row {row}")]
    MissingCoordinate {
        /// Name of the coordinate column.
        column: String,
        /// Row of the masked cell.
        row: usize,
    },

    /// A coordinate value is not finite or lies outside its valid range.
    #[error("invalid coordinate {value} in column '{column}', row {row}")]
    InvalidCoordinate {
        /// Name of the coordinate column.
        column: String,
        /// Row of the invalid value.
        row: usize,
        /// The offending value in degrees.
        value: f64,
    },

    /// Malformed options, e.g. identical table names.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Match tolerance has to be a positive, finite angle.
    #[error("invalid match tolerance of {0} degrees")]
    InvalidTolerance(f64),

    /// Two columns of one catalog share the same name.
    #[error("column '{column}' appears more than once")]
    DuplicateColumn {
        /// The repeated name.
        column: String,
    },

    /// A column does not have as many rows as the catalog.
    #[error("column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        /// Name of the column.
        column: String,
        /// Number of rows of the catalog.
        expected: usize,
        /// Number of rows of the column.
        actual: usize,
    },

    /// A column holds a different type than the operation needs.
    #[error("column '{column}' has type {actual:?}, expected {expected:?}")]
    TypeMismatch {
        /// Name of the column.
        column: String,
        /// Type the operation needs.
        expected: ColumnKind,
        /// Type the column holds.
        actual: ColumnKind,
    },

    /// Some IDs could not be found while they were required to be.
    #[error("{count} input ID(s) not found among the IDs to match against")]
    UnmatchedIds {
        /// Number of IDs without a match.
        count: usize,
    },
}

impl CatalogError {
    pub(crate) fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    pub(crate) fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}
