//! Descriptive statistics and pairwise-complete Pearson correlation

use faer::Mat;
use polars::prelude::*;
use serde::Serialize;

use super::error::AnalysisResult;
use super::features::{
    numeric_values, CURRENT_AGE_YEARS, OUTCOME_SCORE, PRACTICE_COUNT, PRACTICE_YEARS,
    START_AGE_YEARS,
};

/// Variables summarized by default, outcome first.
pub const DEFAULT_DESCRIBE_VARIABLES: [&str; 5] = [
    OUTCOME_SCORE,
    CURRENT_AGE_YEARS,
    START_AGE_YEARS,
    PRACTICE_YEARS,
    PRACTICE_COUNT,
];

/// Summary statistics for one numeric variable.
///
/// Statistics that are undefined for the available data are NaN.
#[derive(Debug, Clone, Serialize)]
pub struct VariableSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
}

/// Symmetric correlation matrix with its variable order.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub variables: Vec<String>,
    pub values: Mat<f64>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.variables.iter().position(|v| v == a)?;
        let j = self.variables.iter().position(|v| v == b)?;
        Some(self.values[(i, j)])
    }

    /// Row-major copy, for export.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.values.nrows())
            .map(|i| (0..self.values.ncols()).map(|j| self.values[(i, j)]).collect())
            .collect()
    }
}

/// Summarize each variable over its non-missing values.
pub fn describe(df: &DataFrame, variables: &[&str]) -> AnalysisResult<Vec<VariableSummary>> {
    variables
        .iter()
        .map(|name| {
            numeric_values(df, name)
                .map(|values| summarize(name, values.into_iter().flatten().collect()))
        })
        .collect()
}

fn summarize(name: &str, mut values: Vec<f64>) -> VariableSummary {
    let count = values.len();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let (min, max) = match (values.first(), values.last()) {
        (Some(&lo), Some(&hi)) => (lo, hi),
        _ => (f64::NAN, f64::NAN),
    };

    VariableSummary {
        name: name.to_string(),
        count,
        mean: mean(&values),
        std: sample_std(&values),
        min,
        q25: quantile_sorted(&values, 0.25),
        q50: quantile_sorted(&values, 0.50),
        q75: quantile_sorted(&values, 0.75),
        max,
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (N−1 denominator); NaN below two values.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|x| (x - m) * (x - m)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Linear interpolation between closest ranks of sorted data.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Pearson correlation matrix over pairwise-complete observations.
///
/// Each cell uses only the rows where both variables are present, so a
/// missing value in one column never removes data from unrelated cells.
pub fn correlation_matrix(df: &DataFrame, variables: &[&str]) -> AnalysisResult<CorrelationMatrix> {
    let columns: Vec<Vec<Option<f64>>> = variables
        .iter()
        .map(|name| numeric_values(df, name))
        .collect::<AnalysisResult<_>>()?;

    let k = columns.len();
    let mut values = Mat::<f64>::zeros(k, k);

    for i in 0..k {
        for j in i..k {
            let r = if i == j {
                let present: Vec<f64> = columns[i].iter().flatten().copied().collect();
                if present.len() >= 2 && sample_std(&present) > 0.0 {
                    1.0
                } else {
                    f64::NAN
                }
            } else {
                pairwise_pearson(&columns[i], &columns[j])
            };
            values[(i, j)] = r;
            values[(j, i)] = r;
        }
    }

    Ok(CorrelationMatrix {
        variables: variables.iter().map(|s| s.to_string()).collect(),
        values,
    })
}

/// Pearson correlation of the rows where both inputs are present.
///
/// NaN when fewer than two complete pairs remain or either side is constant.
pub fn pairwise_pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => Some((*a, *b)),
            _ => None,
        })
        .collect();

    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }

    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_matches_linear_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile_sorted(&sorted, 0.25) - 1.75).abs() < 1e-12);
        assert!((quantile_sorted(&sorted, 0.5) - 2.5).abs() < 1e-12);
        assert!((quantile_sorted(&sorted, 0.75) - 3.25).abs() < 1e-12);
        assert!(quantile_sorted(&[], 0.5).is_nan());
    }

    #[test]
    fn test_sample_std_uses_n_minus_one() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // Population std is 2.0; sample std is sqrt(32/7)
        assert!((sample_std(&values) - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(sample_std(&[1.0]).is_nan());
    }

    #[test]
    fn test_describe_skips_missing() {
        let df = df! {
            "x" => [Some(1.0f64), None, Some(3.0), Some(5.0)],
        }
        .unwrap();
        let summary = describe(&df, &["x"]).unwrap();
        assert_eq!(summary[0].count, 3);
        assert!((summary[0].mean - 3.0).abs() < 1e-12);
        assert_eq!(summary[0].min, 1.0);
        assert_eq!(summary[0].max, 5.0);
        assert!((summary[0].q50 - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_pairwise_pearson_ignores_incomplete_pairs() {
        let x = [Some(1.0), Some(2.0), None, Some(4.0)];
        let y = [Some(2.0), Some(4.0), Some(100.0), Some(8.0)];
        assert!((pairwise_pearson(&x, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pairwise_pearson_constant_is_nan() {
        let x = [Some(1.0), Some(1.0), Some(1.0)];
        let y = [Some(2.0), Some(4.0), Some(5.0)];
        assert!(pairwise_pearson(&x, &y).is_nan());
    }
}
