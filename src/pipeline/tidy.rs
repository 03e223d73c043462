//! Effect summaries: one row per model term with a standardized coefficient
//!
//! `beta_std = b * sd(design column) / sd(outcome)`. The predictor sd comes
//! from the design-matrix column that was actually fit, so a squared term is
//! scaled by the spread of the squared values, not of the raw variable.

use serde::Serialize;

use super::describe::sample_std;
use super::ols::ModelResult;

/// One line of the effect-summary report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TidyRow {
    pub model_name: String,
    pub term: String,
    pub coefficient: f64,
    /// `None` for the intercept.
    pub standardized_coefficient: Option<f64>,
    pub std_error: f64,
    pub p_value: f64,
}

/// Lazy, restartable sequence of [`TidyRow`]s for one model.
#[derive(Debug, Clone)]
pub struct TidyRows<'a> {
    result: &'a ModelResult,
    sd_outcome: f64,
    next: usize,
}

impl Iterator for TidyRows<'_> {
    type Item = TidyRow;

    fn next(&mut self) -> Option<TidyRow> {
        let j = self.next;
        let term = self.result.design.terms.get(j)?;
        let estimate = &self.result.estimates[j];
        self.next += 1;

        let standardized_coefficient = if term.is_intercept() {
            None
        } else {
            let sd_x = sample_std(&self.result.design.column_at(j));
            Some(estimate.coefficient * sd_x / self.sd_outcome)
        };

        Some(TidyRow {
            model_name: self.result.name.clone(),
            term: estimate.term.clone(),
            coefficient: estimate.coefficient,
            standardized_coefficient,
            std_error: estimate.std_error,
            p_value: estimate.p_value,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.result.design.terms.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TidyRows<'_> {}

/// Tidy rows for `result`, standardizing against the sd of `outcome`.
pub fn tidy<'a>(result: &'a ModelResult, outcome: &[f64]) -> TidyRows<'a> {
    TidyRows {
        result,
        sd_outcome: sample_std(outcome),
        next: 0,
    }
}
