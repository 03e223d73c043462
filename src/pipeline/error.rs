//! Error types for the analysis core.
//!
//! Each variant carries enough context (row index, column, model or term name)
//! for the caller to locate the problem without re-running the analysis.

use chrono::NaiveDateTime;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised by feature derivation, summarization, fitting and comparison.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A required input column is not present in the table.
    #[error("Required column '{column}' not found. Available columns: {available:?}")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// A row was submitted before the respondent was born.
    ///
    /// `row` is the zero-based index in the input table.
    #[error("Row {row}: submit time {submit} is earlier than birth time {birth}")]
    TemporalOrder {
        row: usize,
        submit: NaiveDateTime,
        birth: NaiveDateTime,
    },

    /// A timestamp string could not be parsed.
    #[error("Row {row}: cannot parse '{value}' in column '{column}' as a timestamp")]
    InvalidTimestamp {
        column: String,
        row: usize,
        value: String,
    },

    /// A text value in a numeric column could not be parsed as a number.
    #[error("Row {row}: cannot parse '{value}' in column '{column}' as a number")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },

    /// A column's type cannot be read in the role it was mapped to.
    #[error("Column '{column}' has type {dtype}; expected {expected}")]
    UnsupportedColumnType {
        column: String,
        dtype: String,
        expected: &'static str,
    },

    /// The design matrix is not full column rank.
    ///
    /// `term` is the first column found to be a linear combination of the
    /// columns before it.
    #[error("Model '{model}': design matrix is rank deficient at term '{term}'")]
    RankDeficient { model: String, term: String },

    /// Fewer observations than estimated parameters (or equal).
    #[error(
        "Model '{model}': {observations} complete observation(s) for {parameters} parameter(s)"
    )]
    InsufficientData {
        model: String,
        observations: usize,
        parameters: usize,
    },

    /// Two models were fit on different samples, so their R² are not comparable.
    #[error(
        "Models were fit on different samples (baseline n={baseline_n}, extended n={extended_n})"
    )]
    IncomparableModels {
        baseline_n: usize,
        extended_n: usize,
    },

    /// A formula string could not be parsed.
    #[error("Invalid model formula '{formula}': {message}")]
    InvalidFormula { formula: String, message: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Convenience alias used throughout the analysis core.
pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
