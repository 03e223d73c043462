//! Dataset loader for CSV and Parquet survey exports

use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::Path;

use crate::utils::{create_spinner, finish_with_success};

/// Load a dataset lazily (CSV or Parquet based on extension).
///
/// CSV timestamps are parsed into temporal columns where polars can infer
/// them; anything left as text is parsed during feature derivation.
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<LazyFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    // 0 means full table scan
    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(schema_length)
            .with_try_parse_dates(true)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    Ok(lf)
}

/// Load a dataset into memory behind a spinner.
///
/// Returns the frame with its row count, column count and estimated size in MB.
pub fn load_dataset_with_progress(
    path: &Path,
    infer_schema_length: usize,
) -> Result<(DataFrame, usize, usize, f64)> {
    let spinner = create_spinner(&format!("Loading {}...", path.display()));
    let df = load_dataset(path, infer_schema_length)?
        .collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
    finish_with_success(&spinner, "Dataset read");

    let (rows, cols) = df.shape();
    let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);

    Ok((df, rows, cols, memory_mb))
}

/// Keep only rows whose `column` is at least `threshold`.
///
/// Rows with a missing value in `column` are dropped too. Returns the filtered
/// frame and the number of removed rows.
pub fn filter_min_outcome(df: &DataFrame, column: &str, threshold: f64) -> Result<(DataFrame, usize)> {
    if df.column(column).is_err() {
        anyhow::bail!(
            "Cannot filter on '{}': column not found in dataset",
            column
        );
    }

    let before = df.height();
    let filtered = df
        .clone()
        .lazy()
        .filter(col(column).cast(DataType::Float64).gt_eq(lit(threshold)))
        .collect()
        .with_context(|| format!("Failed to filter rows on '{}'", column))?;
    let removed = before - filtered.height();

    Ok((filtered, removed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_min_outcome_drops_low_and_missing() {
        let df = df! {
            "player_rating" => [Some(10500.0f64), Some(11000.0), None, Some(12500.0)],
        }
        .unwrap();
        let (filtered, removed) = filter_min_outcome(&df, "player_rating", 11000.0).unwrap();
        assert_eq!(filtered.height(), 2);
        assert_eq!(removed, 2);
    }

    #[test]
    fn test_filter_min_outcome_unknown_column() {
        let df = df! { "a" => [1.0f64] }.unwrap();
        assert!(filter_min_outcome(&df, "b", 0.0).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let result = load_dataset(Path::new("data.xlsx"), 100);
        assert!(result.is_err());
    }
}
