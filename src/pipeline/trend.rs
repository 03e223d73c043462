//! Bivariate trend lines of the outcome against single predictors

use polars::prelude::DataFrame;
use serde::Serialize;

use super::design::{ModelSpec, Term};
use super::error::AnalysisResult;
use super::features::{PRACTICE_YEARS, START_AGE_YEARS};
use super::ols::fit_ols;

pub const DEFAULT_TREND_PREDICTORS: [&str; 2] = [START_AGE_YEARS, PRACTICE_YEARS];

#[derive(Debug, Clone, Serialize)]
pub struct TrendLine {
    pub response: String,
    pub predictor: String,
    pub intercept: f64,
    pub slope: f64,
    pub r_squared: f64,
    pub n_obs: usize,
}

/// Fit `response ~ predictor` on the rows where both are present.
pub fn trend_line(df: &DataFrame, response: &str, predictor: &str) -> AnalysisResult<TrendLine> {
    let spec = ModelSpec::new(
        format!("{} vs {}", response, predictor),
        response,
        vec![Term::Linear(predictor.to_string())],
    );
    let fit = fit_ols(df, &spec)?;

    Ok(TrendLine {
        response: response.to_string(),
        predictor: predictor.to_string(),
        intercept: fit.coefficient("Intercept").unwrap_or(f64::NAN),
        slope: fit.coefficient(predictor).unwrap_or(f64::NAN),
        r_squared: fit.r_squared,
        n_obs: fit.n_obs,
    })
}
