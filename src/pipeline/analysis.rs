//! End-to-end analysis: derive → describe → fit → tidy → compare
//!
//! Derivation errors abort the run. Fit errors stay with the model that
//! raised them; the other model is still fitted and the comparison is marked
//! not computable.

use polars::prelude::DataFrame;
use serde::Serialize;

use super::compare::{compare_models, ComparisonPolicy, VarianceGain};
use super::describe::{
    correlation_matrix, describe, CorrelationMatrix, VariableSummary, DEFAULT_DESCRIBE_VARIABLES,
};
use super::design::ModelSpec;
use super::error::{AnalysisError, AnalysisResult};
use super::features::{
    derive_features, numeric_values, ColumnMapping, DerivedTable, TemporalOrderPolicy,
};
use super::ols::{fit_ols, ModelResult};
use super::tidy::{tidy, TidyRow};
use super::trend::{trend_line, TrendLine, DEFAULT_TREND_PREDICTORS};

/// Everything the analysis core needs besides the table itself.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub columns: ColumnMapping,
    pub temporal_policy: TemporalOrderPolicy,
    pub comparison_policy: ComparisonPolicy,
    pub baseline: ModelSpec,
    pub extended: ModelSpec,
    pub describe_variables: Vec<String>,
    pub trend_predictors: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            temporal_policy: TemporalOrderPolicy::default(),
            comparison_policy: ComparisonPolicy::default(),
            baseline: ModelSpec::baseline(),
            extended: ModelSpec::extended(),
            describe_variables: DEFAULT_DESCRIBE_VARIABLES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            trend_predictors: DEFAULT_TREND_PREDICTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// A model spec together with its fit, successful or not.
#[derive(Debug)]
pub struct ModelOutcome {
    pub spec: ModelSpec,
    pub fit: AnalysisResult<ModelResult>,
}

impl ModelOutcome {
    pub fn result(&self) -> Option<&ModelResult> {
        self.fit.as_ref().ok()
    }

    pub fn error(&self) -> Option<&AnalysisError> {
        self.fit.as_ref().err()
    }
}

/// Result of the variance-gain step.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Comparison {
    Computed(VarianceGain),
    NotComputable { reason: String },
}

impl Comparison {
    pub fn gain(&self) -> Option<&VarianceGain> {
        match self {
            Comparison::Computed(gain) => Some(gain),
            Comparison::NotComputable { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct TrendOutcome {
    pub predictor: String,
    pub line: AnalysisResult<TrendLine>,
}

/// All outputs of one analysis run.
#[derive(Debug)]
pub struct AnalysisRun {
    pub derived: DerivedTable,
    pub descriptives: Vec<VariableSummary>,
    pub correlation: CorrelationMatrix,
    pub baseline: ModelOutcome,
    pub extended: ModelOutcome,
    pub effects: Vec<TidyRow>,
    pub comparison: Comparison,
    pub trends: Vec<TrendOutcome>,
}

/// Run the full analysis on a raw table.
pub fn run_analysis(df: &DataFrame, config: &AnalysisConfig) -> AnalysisResult<AnalysisRun> {
    let derived = derive_features(df, &config.columns, config.temporal_policy)?;
    analyze_derived(derived, config)
}

/// Run every step after feature derivation.
pub fn analyze_derived(derived: DerivedTable, config: &AnalysisConfig) -> AnalysisResult<AnalysisRun> {
    let variables: Vec<&str> = config.describe_variables.iter().map(String::as_str).collect();
    let descriptives = describe(&derived.df, &variables)?;
    let correlation = correlation_matrix(&derived.df, &variables)?;

    let baseline = fit_model(&derived.df, &config.baseline);
    let extended = fit_model(&derived.df, &config.extended);

    let effects = effect_rows(&derived.df, &[&baseline, &extended])?;
    let comparison = compare_outcomes(&baseline, &extended, config.comparison_policy);
    let trends = fit_trends(
        &derived.df,
        &config.baseline.response,
        &config.trend_predictors,
    );

    Ok(AnalysisRun {
        derived,
        descriptives,
        correlation,
        baseline,
        extended,
        effects,
        comparison,
        trends,
    })
}

pub fn fit_model(df: &DataFrame, spec: &ModelSpec) -> ModelOutcome {
    ModelOutcome {
        spec: spec.clone(),
        fit: fit_ols(df, spec),
    }
}

/// Tidy rows of every successfully fitted model.
///
/// The outcome sd is taken over the full non-missing response column.
pub fn effect_rows(df: &DataFrame, outcomes: &[&ModelOutcome]) -> AnalysisResult<Vec<TidyRow>> {
    let mut rows = Vec::new();
    for outcome in outcomes {
        if let Some(result) = outcome.result() {
            let y: Vec<f64> = numeric_values(df, &outcome.spec.response)?
                .into_iter()
                .flatten()
                .collect();
            rows.extend(tidy(result, &y));
        }
    }
    Ok(rows)
}

pub fn compare_outcomes(
    baseline: &ModelOutcome,
    extended: &ModelOutcome,
    policy: ComparisonPolicy,
) -> Comparison {
    match (&baseline.fit, &extended.fit) {
        (Ok(a), Ok(b)) => match compare_models(a, b, policy) {
            Ok(gain) => Comparison::Computed(gain),
            Err(e) => Comparison::NotComputable {
                reason: e.to_string(),
            },
        },
        (Err(e), _) => Comparison::NotComputable {
            reason: format!("{} could not be fitted: {}", baseline.spec.name, e),
        },
        (_, Err(e)) => Comparison::NotComputable {
            reason: format!("{} could not be fitted: {}", extended.spec.name, e),
        },
    }
}

/// One trend line of `response` per predictor.
pub fn fit_trends(df: &DataFrame, response: &str, predictors: &[String]) -> Vec<TrendOutcome> {
    predictors
        .iter()
        .map(|predictor| TrendOutcome {
            predictor: predictor.clone(),
            line: trend_line(df, response, predictor),
        })
        .collect()
}
