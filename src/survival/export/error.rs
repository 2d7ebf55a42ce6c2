use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Raised when the source table cannot be read.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    NotFound(PathBuf),

    /// Raised when the file extension does not map to a known table format.
    #[error("unsupported input format '{extension}' for {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// Errors bubbled up from the spreadsheet reader implementation.
    #[error("failed to read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// Errors bubbled up from the delimited text reader.
    #[error("failed to read delimited file {path}: {source}")]
    Delimited {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Raised when the requested worksheet is not part of the workbook.
    #[error("worksheet '{sheet}' not found in {path}")]
    MissingSheet { path: PathBuf, sheet: String },

    /// Raised when two header cells carry the same name.
    #[error("column '{column}' appears more than once in {path}")]
    DuplicateColumn { path: PathBuf, column: String },

    /// Raised when the workbook has no worksheet or the sheet has no header row.
    #[error("no header row found in {0}")]
    NoHeader(PathBuf),
}

/// Raised when rows cannot be selected from the source table.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Raised when a column needed for row selection is absent.
    #[error("required column '{column}' is missing from the source table")]
    MissingColumn { column: String },

    /// Raised when a sex filter is requested on a table without a sex column.
    #[error("sex filter '{requested}' requested but column '{column}' is missing")]
    MissingSexColumn { column: String, requested: String },
}

/// Raised when per-day counts cannot be expanded into event rows.
#[derive(Debug, Error)]
pub enum ExpansionError {
    /// Raised when no filtered tables were supplied.
    #[error("no condition tables to expand")]
    NoConditions,

    /// Raised when the number of tables and conditions disagree.
    #[error("expected {expected} condition tables, got {actual}")]
    ConditionCountMismatch { expected: usize, actual: usize },

    /// Raised when a day column is absent from one of the condition tables.
    #[error("day column '{column}' is missing from the table for condition {condition}")]
    MissingDayColumn { column: String, condition: String },

    /// Raised when the same day column name appears more than once.
    #[error("day column '{column}' appears more than once")]
    DuplicateDayColumn { column: String },

    /// Raised when the expanded table would exceed the output row limit.
    #[error("day column '{column}' pushes the output past {limit} rows")]
    TooManyEvents { column: String, limit: usize },

    /// Raised when a count cell holds something other than a number.
    #[error("non-numeric value '{value}' in column '{column}' for condition {condition}")]
    NonNumeric {
        column: String,
        condition: String,
        value: String,
    },

    /// Raised when a day total is negative or not finite.
    #[error("invalid total {total} in column '{column}' for condition {condition}")]
    InvalidCount {
        column: String,
        condition: String,
        total: f64,
    },
}

/// Raised when the expanded table cannot be persisted.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Wrapper for IO failures while creating, writing or renaming the output.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Errors bubbled up from the delimited text writer.
    #[error("failed to encode delimited output {path}: {source}")]
    Delimited {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Errors bubbled up from the Excel writer implementation.
    #[error("failed to build workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
}

/// Raised when the run configuration is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Raised when the configuration file cannot be opened.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Raised when JSON parsing fails.
    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("at least one condition must be configured")]
    NoConditions,

    #[error("condition value {0} is not a finite number")]
    NonFiniteCondition(f64),

    #[error("duplicate condition label '{0}'")]
    DuplicateLabel(String),

    #[error("setting '{0}' must not be empty")]
    EmptySetting(&'static str),
}

/// Error type covering the different failure cases that can occur while the
/// tool loads, filters, expands, or writes survival data.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Expansion(#[from] ExpansionError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_errors_keep_their_context() {
        let err: ExportError = FilterError::MissingSexColumn {
            column: "sex".into(),
            requested: "F".into(),
        }
        .into();
        let message = err.to_string();
        assert!(message.contains("'sex'"));
        assert!(message.contains("'F'"));

        let err: ExportError = LoadError::NotFound(PathBuf::from("/tmp/missing.xlsx")).into();
        assert!(err.to_string().contains("/tmp/missing.xlsx"));
    }
}
