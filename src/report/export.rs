//! Analysis export: JSON report plus CSV tables

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use polars::prelude::*;
use serde::Serialize;

use crate::pipeline::{
    AnalysisConfig, AnalysisRun, ColumnMapping, Comparison, ComparisonPolicy, ModelOutcome,
    TemporalOrderPolicy, TemporalViolation, TermEstimate, TidyRow, TrendLine, VariableSummary,
};

pub const REPORT_FILE: &str = "analysis_report.json";
pub const EFFECTS_FILE: &str = "effects.csv";
pub const DESCRIPTIVES_FILE: &str = "descriptives.csv";
pub const CORRELATION_FILE: &str = "correlation_matrix.csv";

/// Where and what to export.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub write_json: bool,
    pub write_csv: bool,
}

impl ReportConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            write_json: true,
            write_csv: true,
        }
    }

    pub fn path_for(&self, file: &str) -> PathBuf {
        self.output_dir.join(file)
    }
}

/// Metadata about the analysis run
#[derive(Debug, Serialize)]
pub struct RunMetadata {
    /// Timestamp of the analysis (ISO 8601 format)
    pub timestamp: String,
    pub agefit_version: String,
    pub input_file: String,
    pub columns: ColumnMapping,
    pub temporal_policy: TemporalOrderPolicy,
    pub comparison_policy: ComparisonPolicy,
    /// Rows kept after feature derivation
    pub rows_analyzed: usize,
    pub rows_excluded: usize,
}

/// One model's fit, or the reason it has none.
#[derive(Debug, Serialize)]
pub struct ModelReport<'a> {
    pub name: &'a str,
    pub formula: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_obs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_squared: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adj_r_squared: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f_statistic: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f_p_value: Option<f64>,
    pub estimates: &'a [TermEstimate],
}

impl<'a> From<&'a ModelOutcome> for ModelReport<'a> {
    fn from(outcome: &'a ModelOutcome) -> Self {
        match &outcome.fit {
            Ok(result) => ModelReport {
                name: &outcome.spec.name,
                formula: result.formula.clone(),
                status: "fitted",
                error: None,
                n_obs: Some(result.n_obs),
                r_squared: Some(result.r_squared),
                adj_r_squared: Some(result.adj_r_squared),
                f_statistic: Some(result.f_statistic),
                f_p_value: Some(result.f_p_value),
                estimates: &result.estimates,
            },
            Err(e) => ModelReport {
                name: &outcome.spec.name,
                formula: outcome.spec.formula(),
                status: "failed",
                error: Some(e.to_string()),
                n_obs: None,
                r_squared: None,
                adj_r_squared: None,
                f_statistic: None,
                f_p_value: None,
                estimates: &[],
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CorrelationReport<'a> {
    pub variables: &'a [String],
    pub values: Vec<Vec<f64>>,
}

/// Complete analysis export
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub metadata: RunMetadata,
    pub excluded_rows: &'a [TemporalViolation],
    pub negative_start_rows: &'a [usize],
    pub descriptives: &'a [VariableSummary],
    pub correlation: CorrelationReport<'a>,
    pub models: Vec<ModelReport<'a>>,
    pub effects: &'a [TidyRow],
    pub comparison: &'a Comparison,
    pub trends: Vec<&'a TrendLine>,
}

/// Assemble the serializable report for a run.
pub fn build_report<'a>(
    run: &'a AnalysisRun,
    input: &Path,
    config: &AnalysisConfig,
) -> AnalysisReport<'a> {
    AnalysisReport {
        metadata: RunMetadata {
            timestamp: Utc::now().to_rfc3339(),
            agefit_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: input.display().to_string(),
            columns: config.columns.clone(),
            temporal_policy: config.temporal_policy,
            comparison_policy: config.comparison_policy,
            rows_analyzed: run.derived.height(),
            rows_excluded: run.derived.excluded.len(),
        },
        excluded_rows: &run.derived.excluded,
        negative_start_rows: &run.derived.negative_start_rows,
        descriptives: &run.descriptives,
        correlation: CorrelationReport {
            variables: &run.correlation.variables,
            values: run.correlation.to_rows(),
        },
        models: vec![
            ModelReport::from(&run.baseline),
            ModelReport::from(&run.extended),
        ],
        effects: &run.effects,
        comparison: &run.comparison,
        trends: run.trends.iter().filter_map(|t| t.line.as_ref().ok()).collect(),
    }
}

/// Write the configured report files, returning the paths written.
pub fn export_analysis(
    run: &AnalysisRun,
    input: &Path,
    analysis_config: &AnalysisConfig,
    report_config: &ReportConfig,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(&report_config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            report_config.output_dir.display()
        )
    })?;

    let mut written = Vec::new();

    if report_config.write_json {
        let path = report_config.path_for(REPORT_FILE);
        let report = build_report(run, input, analysis_config);
        let json = serde_json::to_string_pretty(&report)
            .context("Failed to serialize analysis report to JSON")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write analysis report to {}", path.display()))?;
        written.push(path);
    }

    if report_config.write_csv {
        let path = report_config.path_for(EFFECTS_FILE);
        write_csv(&mut effects_frame(&run.effects)?, &path)?;
        written.push(path);

        let path = report_config.path_for(DESCRIPTIVES_FILE);
        write_csv(&mut descriptives_frame(&run.descriptives)?, &path)?;
        written.push(path);

        let path = report_config.path_for(CORRELATION_FILE);
        write_csv(
            &mut correlation_frame(&run.correlation.variables, &run.correlation.to_rows())?,
            &path,
        )?;
        written.push(path);
    }

    Ok(written)
}

/// Tidy rows as a table, one row per (model, term).
pub fn effects_frame(rows: &[TidyRow]) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Column::new(
            "model_name".into(),
            rows.iter().map(|r| r.model_name.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "term".into(),
            rows.iter().map(|r| r.term.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "coefficient".into(),
            rows.iter().map(|r| r.coefficient).collect::<Vec<_>>(),
        ),
        Column::new(
            "standardized_coefficient".into(),
            rows.iter()
                .map(|r| r.standardized_coefficient)
                .collect::<Vec<_>>(),
        ),
        Column::new(
            "std_error".into(),
            rows.iter().map(|r| r.std_error).collect::<Vec<_>>(),
        ),
        Column::new(
            "p_value".into(),
            rows.iter().map(|r| r.p_value).collect::<Vec<_>>(),
        ),
    ])
    .context("Failed to build effects table")?;
    Ok(df)
}

pub fn descriptives_frame(rows: &[VariableSummary]) -> Result<DataFrame> {
    let stat = |f: fn(&VariableSummary) -> f64| rows.iter().map(f).collect::<Vec<f64>>();
    let df = DataFrame::new(vec![
        Column::new(
            "variable".into(),
            rows.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "count".into(),
            rows.iter().map(|s| s.count as u64).collect::<Vec<_>>(),
        ),
        Column::new("mean".into(), stat(|s| s.mean)),
        Column::new("std".into(), stat(|s| s.std)),
        Column::new("min".into(), stat(|s| s.min)),
        Column::new("25%".into(), stat(|s| s.q25)),
        Column::new("50%".into(), stat(|s| s.q50)),
        Column::new("75%".into(), stat(|s| s.q75)),
        Column::new("max".into(), stat(|s| s.max)),
    ])
    .context("Failed to build descriptives table")?;
    Ok(df)
}

/// Square matrix with a leading `variable` label column.
pub fn correlation_frame(variables: &[String], values: &[Vec<f64>]) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(variables.len() + 1);
    columns.push(Column::new(
        "variable".into(),
        variables.iter().map(String::as_str).collect::<Vec<_>>(),
    ));
    for (j, name) in variables.iter().enumerate() {
        let column: Vec<f64> = values.iter().map(|row| row[j]).collect();
        columns.push(Column::new(name.as_str().into(), column));
    }
    DataFrame::new(columns).context("Failed to build correlation table")
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    CsvWriter::new(&mut file)
        .finish(df)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
    Ok(())
}
