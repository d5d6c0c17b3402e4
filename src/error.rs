//! Error-handling module for the crate

use thiserror::Error;

use crate::data_type::DataType;

/// Errors caused by references to tables or columns that do not fit a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The catalog holds no relation with this name
    #[error("table {0:?} does not exist")]
    UnknownTable(String),
    /// No column of the schema matches the reference
    #[error("column {0:?} does not exist")]
    UnknownColumn(String),
    /// An unqualified reference matches columns of several relations
    #[error("column reference {0:?} is ambiguous")]
    AmbiguousColumn(String),
    /// Two columns of one schema share the same qualified name
    #[error("column {0:?} appears more than once; use a table alias")]
    DuplicateColumn(String),
    /// A row does not have one value per schema column
    #[error("row has {found} values but the schema has {expected} columns")]
    ArityMismatch {
        /// Number of schema columns
        expected: usize,
        /// Number of values in the offending row
        found: usize,
    },
    /// A value does not match the declared type of its column
    #[error("column {column:?} has type {expected} but received a {found} value")]
    ColumnType {
        /// Name of the column
        column: String,
        /// Declared type
        expected: DataType,
        /// Type of the rejected value
        found: DataType,
    },
}

/// Error-Collection for everything the execution layer can fail with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unresolvable table or column reference
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Two values of incompatible types were compared
    #[error("type error: cannot compare {left} with {right}")]
    TypeMismatch {
        /// Type of the left operand
        left: DataType,
        /// Type of the right operand
        right: DataType,
    },
    /// The requested algorithm or index cannot perform the operation
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

/// Statement-level failure reported by the [`Interpreter`][crate::interpreter::Interpreter].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The statement text was rejected before execution
    #[error("parse error: {0}")]
    Parse(String),
    /// Execution of a well-formed statement failed
    #[error(transparent)]
    Execution(#[from] Error),
}

impl From<SchemaError> for QueryError {
    fn from(value: SchemaError) -> Self {
        Self::Execution(Error::Schema(value))
    }
}

/// A [`PlanConfig`][crate::config::PlanConfig] that cannot be used.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration text is not valid JSON for the expected fields
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// A field holds a value outside its domain
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Result type used throughout the execution layer.
pub type Result<T, E = Error> = std::result::Result<T, E>;
