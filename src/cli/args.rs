//! Command-line argument definitions using clap

use clap::Parser;
use std::path::PathBuf;

use crate::pipeline::{
    AnalysisConfig, AnalysisResult, ColumnMapping, ComparisonPolicy, ModelSpec,
    TemporalOrderPolicy,
};
use crate::report::ReportConfig;

/// agefit - Does age explain the outcome beyond practice? Fits a practice-only
/// model and a practice-plus-age model and reports the gain in R²
#[derive(Parser, Debug)]
#[command(name = "agefit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory for the JSON report and CSV tables.
    /// Defaults to an 'agefit_output' directory next to the input file.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Skip writing report files; only print the terminal summary
    #[arg(long, default_value = "false")]
    pub no_export: bool,

    /// Column holding the outcome score
    #[arg(long, default_value = "outcome_score")]
    pub outcome_column: String,

    /// Column holding the survey submission timestamp
    #[arg(long, default_value = "submit_instant")]
    pub submit_column: String,

    /// Column holding the respondent's birth timestamp
    #[arg(long, default_value = "birth_instant")]
    pub birth_column: String,

    /// Column holding the total months of practice
    #[arg(long, default_value = "practice_months")]
    pub practice_months_column: String,

    /// Column holding the count of practice events
    #[arg(long, default_value = "practice_count")]
    pub practice_count_column: String,

    /// What to do with rows submitted before the birth timestamp.
    /// Options: "exclude" (drop and report the rows, default) or "abort"
    #[arg(long, default_value = "exclude")]
    pub temporal_policy: TemporalOrderPolicy,

    /// What to do when the two models were fitted on different row counts.
    /// Options: "strict" (refuse ΔR², default) or "warn" (compute and warn)
    #[arg(long, default_value = "strict")]
    pub comparison_policy: ComparisonPolicy,

    /// Override the baseline model formula, e.g. "outcome_score ~ practice_years + practice_count".
    /// Terms use derived column names; `x^2` and `a:b` are supported.
    #[arg(long)]
    pub baseline_formula: Option<String>,

    /// Override the extended model formula
    #[arg(long)]
    pub extended_formula: Option<String>,

    /// Keep only rows whose outcome is at least this value before analysis
    #[arg(long, value_parser = validate_finite)]
    pub min_outcome: Option<f64>,

    /// Number of rows to use for schema inference (CSV only).
    /// Higher values improve type detection for ambiguous columns but may be slower.
    /// Use 0 for full table scan (very slow for large files).
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

impl Cli {
    /// The column mapping described by the column flags.
    pub fn column_mapping(&self) -> ColumnMapping {
        ColumnMapping {
            outcome_score: self.outcome_column.clone(),
            submit_instant: self.submit_column.clone(),
            birth_instant: self.birth_column.clone(),
            practice_months: self.practice_months_column.clone(),
            practice_count: self.practice_count_column.clone(),
        }
    }

    /// Build the analysis configuration, parsing any formula overrides.
    pub fn analysis_config(&self) -> AnalysisResult<AnalysisConfig> {
        let mut config = AnalysisConfig {
            columns: self.column_mapping(),
            temporal_policy: self.temporal_policy,
            comparison_policy: self.comparison_policy,
            ..Default::default()
        };
        if let Some(formula) = &self.baseline_formula {
            config.baseline = ModelSpec::parse("Model0", formula)?;
        }
        if let Some(formula) = &self.extended_formula {
            config.extended = ModelSpec::parse("Model1", formula)?;
        }
        Ok(config)
    }

    /// Get the output directory, deriving it from the input if not explicitly provided.
    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            let parent = self
                .input
                .parent()
                .unwrap_or_else(|| std::path::Path::new("."));
            parent.join("agefit_output")
        })
    }

    /// `None` when export is disabled.
    pub fn report_config(&self) -> Option<ReportConfig> {
        if self.no_export {
            None
        } else {
            Some(ReportConfig::new(self.resolved_output_dir()))
        }
    }

    /// Raw outcome column the minimum filter applies to.
    pub fn min_outcome_filter(&self) -> Option<(&str, f64)> {
        self.min_outcome.map(|t| (self.outcome_column.as_str(), t))
    }
}

/// Validator for numeric thresholds
fn validate_finite(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("threshold must be a finite number, got {}", value))
    }
}
