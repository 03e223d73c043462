//! Incremental explanatory power of the extended model over the baseline

use serde::Serialize;

use super::error::{AnalysisError, AnalysisResult};
use super::ols::{f_upper_tail_p, ModelResult};

/// How to treat models fit on different sample sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonPolicy {
    /// Refuse the comparison with [`AnalysisError::IncomparableModels`].
    #[default]
    Strict,
    /// Compute ΔR² anyway and attach a warning.
    Warn,
}

impl std::str::FromStr for ComparisonPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(ComparisonPolicy::Strict),
            "warn" => Ok(ComparisonPolicy::Warn),
            other => Err(format!(
                "Unknown comparison policy '{}'. Use 'strict' or 'warn'",
                other
            )),
        }
    }
}

/// Partial F test for nested models fit on the same rows.
#[derive(Debug, Clone, Serialize)]
pub struct NestedFTest {
    pub f_statistic: f64,
    pub df_num: usize,
    pub df_den: usize,
    pub p_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VarianceGain {
    pub baseline_model: String,
    pub extended_model: String,
    pub baseline_r_squared: f64,
    pub extended_r_squared: f64,
    pub delta_r_squared: f64,
    /// Present when the baseline terms are a subset of the extended terms.
    pub nested_test: Option<NestedFTest>,
    /// Set when the comparison went ahead despite mismatched samples.
    pub warning: Option<String>,
}

/// `ΔR² = R²(extended) − R²(baseline)`, refusing mismatched samples.
pub fn variance_gain(baseline: &ModelResult, extended: &ModelResult) -> AnalysisResult<VarianceGain> {
    compare_models(baseline, extended, ComparisonPolicy::Strict)
}

pub fn compare_models(
    baseline: &ModelResult,
    extended: &ModelResult,
    policy: ComparisonPolicy,
) -> AnalysisResult<VarianceGain> {
    let same_sample = baseline.n_obs == extended.n_obs;

    let warning = if same_sample {
        None
    } else {
        let err = AnalysisError::IncomparableModels {
            baseline_n: baseline.n_obs,
            extended_n: extended.n_obs,
        };
        match policy {
            ComparisonPolicy::Strict => return Err(err),
            ComparisonPolicy::Warn => Some(err.to_string()),
        }
    };

    let nested_test = if same_sample && is_nested(baseline, extended) {
        nested_f_test(baseline, extended)
    } else {
        None
    };

    Ok(VarianceGain {
        baseline_model: baseline.name.clone(),
        extended_model: extended.name.clone(),
        baseline_r_squared: baseline.r_squared,
        extended_r_squared: extended.r_squared,
        delta_r_squared: extended.r_squared - baseline.r_squared,
        nested_test,
        warning,
    })
}

fn is_nested(baseline: &ModelResult, extended: &ModelResult) -> bool {
    baseline.n_params() < extended.n_params()
        && baseline
            .terms()
            .iter()
            .all(|t| extended.terms().contains(t))
}

/// `F = ((SSR_a − SSR_b)/(p_b − p_a)) / (SSR_b/(N − p_b))`.
fn nested_f_test(baseline: &ModelResult, extended: &ModelResult) -> Option<NestedFTest> {
    let df_num = extended.n_params().checked_sub(baseline.n_params())?;
    let df_den = extended.df_resid;
    if df_num == 0 || df_den == 0 {
        return None;
    }

    let numerator = (baseline.ssr - extended.ssr).max(0.0) / df_num as f64;
    let denominator = extended.ssr / df_den as f64;
    let f_statistic = if denominator > 0.0 {
        numerator / denominator
    } else if numerator > 0.0 {
        f64::INFINITY
    } else {
        f64::NAN
    };

    Some(NestedFTest {
        f_statistic,
        df_num,
        df_den,
        p_value: f_upper_tail_p(f_statistic, df_num as f64, df_den as f64),
    })
}
