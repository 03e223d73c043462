//! Ordinary least squares via QR decomposition
//!
//! The design matrix is factored as `X = QR` (Householder QR from faer), so
//! coefficients solve `Rβ = Qᵀy` by back substitution and the coefficient
//! covariance uses `(XᵀX)⁻¹ = R⁻¹R⁻ᵀ`. The normal equations are never formed.

use faer::{Mat, MatRef};
use polars::prelude::DataFrame;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

use super::design::{DesignMatrix, ModelSpec, Term};
use super::error::{AnalysisError, AnalysisResult};

/// A design column counts as dependent on earlier columns when the part of it
/// orthogonal to them is below this fraction of its norm.
pub const RANK_TOLERANCE: f64 = 1e-10;

/// Per-term inference for a fitted model.
#[derive(Debug, Clone, Serialize)]
pub struct TermEstimate {
    pub term: String,
    pub coefficient: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
}

/// Immutable result of one OLS fit.
///
/// The design matrix used for the fit is kept so that effect sizes can be
/// standardized by the expanded columns (squared and interaction terms
/// included) instead of the raw input variables.
#[derive(Debug, Clone)]
pub struct ModelResult {
    pub name: String,
    pub formula: String,
    pub estimates: Vec<TermEstimate>,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    pub ssr: f64,
    pub sst: f64,
    pub n_obs: usize,
    pub df_resid: usize,
    pub design: DesignMatrix,
}

impl ModelResult {
    pub fn n_params(&self) -> usize {
        self.estimates.len()
    }

    pub fn estimate(&self, term: &str) -> Option<&TermEstimate> {
        self.estimates.iter().find(|e| e.term == term)
    }

    pub fn coefficient(&self, term: &str) -> Option<f64> {
        self.estimate(term).map(|e| e.coefficient)
    }

    pub fn terms(&self) -> &[Term] {
        &self.design.terms
    }
}

/// Fit `spec` on the rows of `df` complete for its variables.
pub fn fit_ols(df: &DataFrame, spec: &ModelSpec) -> AnalysisResult<ModelResult> {
    let design = DesignMatrix::build(df, spec)?;
    fit_design(&spec.name, &spec.formula(), design)
}

/// Fit an already-built design matrix.
pub fn fit_design(name: &str, formula: &str, design: DesignMatrix) -> AnalysisResult<ModelResult> {
    let n = design.nrows();
    let p = design.ncols();

    if n <= p {
        return Err(AnalysisError::InsufficientData {
            model: name.to_string(),
            observations: n,
            parameters: p,
        });
    }

    let qr = design.x.as_ref().qr();
    let r = qr.thin_R();
    let q = qr.compute_thin_Q();

    for j in 0..p {
        let norm = column_norm(&design.x, j);
        if norm == 0.0 || r[(j, j)].abs() <= RANK_TOLERANCE * norm {
            return Err(AnalysisError::RankDeficient {
                model: name.to_string(),
                term: design.terms[j].name(),
            });
        }
    }

    let y = &design.y;
    let qty: Vec<f64> = (0..p)
        .map(|j| (0..n).map(|i| q[(i, j)] * y[i]).sum())
        .collect();
    let beta = back_substitute(r, &qty);
    let r_inv = upper_triangular_inverse(r);

    let mut ssr = 0.0;
    for (i, &yi) in y.iter().enumerate() {
        let fitted: f64 = (0..p).map(|j| design.x[(i, j)] * beta[j]).sum();
        let resid = yi - fitted;
        ssr += resid * resid;
    }

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let sst: f64 = y.iter().map(|v| (v - y_mean) * (v - y_mean)).sum();

    let df_resid = n - p;
    let sigma2 = ssr / df_resid as f64;

    let estimates = design
        .terms
        .iter()
        .enumerate()
        .map(|(j, term)| {
            let var_jj: f64 = (j..p).map(|k| r_inv[(j, k)] * r_inv[(j, k)]).sum();
            let std_error = (sigma2 * var_jj).sqrt();
            let t_value = beta[j] / std_error;
            TermEstimate {
                term: term.name(),
                coefficient: beta[j],
                std_error,
                t_value,
                p_value: t_two_sided_p(t_value, df_resid as f64),
            }
        })
        .collect();

    let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { f64::NAN };
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df_resid as f64;

    let df_model = p.saturating_sub(1);
    let (f_statistic, f_p_value) = if df_model == 0 {
        (f64::NAN, f64::NAN)
    } else {
        let f = (r_squared / df_model as f64) / ((1.0 - r_squared) / df_resid as f64);
        (f, f_upper_tail_p(f, df_model as f64, df_resid as f64))
    };

    Ok(ModelResult {
        name: name.to_string(),
        formula: formula.to_string(),
        estimates,
        r_squared,
        adj_r_squared,
        f_statistic,
        f_p_value,
        ssr,
        sst,
        n_obs: n,
        df_resid,
        design,
    })
}

fn column_norm(x: &Mat<f64>, j: usize) -> f64 {
    (0..x.nrows()).map(|i| x[(i, j)] * x[(i, j)]).sum::<f64>().sqrt()
}

/// Solve `Rβ = b` for upper-triangular `R`.
fn back_substitute(r: MatRef<'_, f64>, b: &[f64]) -> Vec<f64> {
    let p = b.len();
    let mut beta = vec![0.0; p];
    for j in (0..p).rev() {
        let tail: f64 = ((j + 1)..p).map(|k| r[(j, k)] * beta[k]).sum();
        beta[j] = (b[j] - tail) / r[(j, j)];
    }
    beta
}

fn upper_triangular_inverse(r: MatRef<'_, f64>) -> Mat<f64> {
    let p = r.ncols();
    let mut inv = Mat::<f64>::zeros(p, p);
    for col in 0..p {
        let mut e = vec![0.0; p];
        e[col] = 1.0;
        let x = back_substitute(r, &e);
        for (row, value) in x.into_iter().enumerate() {
            inv[(row, col)] = value;
        }
    }
    inv
}

/// Two-sided p-value of a t statistic.
pub fn t_two_sided_p(t: f64, df: f64) -> f64 {
    if t.is_nan() {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

/// Upper-tail p-value of an F statistic.
pub fn f_upper_tail_p(f: f64, df1: f64, df2: f64) -> f64 {
    if f.is_nan() {
        return f64::NAN;
    }
    if f.is_infinite() {
        return 0.0;
    }
    match FisherSnedecor::new(df1, df2) {
        Ok(dist) => dist.sf(f.max(0.0)),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_simple_line_recovered() {
        // y = 2 + 3x on x = 0..5
        let df = df! {
            "x" => [0.0f64, 1.0, 2.0, 3.0, 4.0],
            "y" => [2.0f64, 5.0, 8.0, 11.0, 14.0],
        }
        .unwrap();
        let spec = ModelSpec::parse("line", "y ~ x").unwrap();
        let fit = fit_ols(&df, &spec).unwrap();

        assert!((fit.coefficient("Intercept").unwrap() - 2.0).abs() < 1e-10);
        assert!((fit.coefficient("x").unwrap() - 3.0).abs() < 1e-10);
        assert!((fit.r_squared - 1.0).abs() < 1e-10);
        assert_eq!(fit.n_obs, 5);
        assert_eq!(fit.df_resid, 3);
    }

    #[test]
    fn test_standard_errors_match_closed_form() {
        // Simple regression: se(slope) = sqrt(sigma2 / Sxx)
        let xs = [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ys = [1.2f64, 1.9, 3.2, 3.8, 5.1, 6.3];
        let df = df! { "x" => xs, "y" => ys }.unwrap();
        let fit = fit_ols(&df, &ModelSpec::parse("m", "y ~ x").unwrap()).unwrap();

        let n = xs.len() as f64;
        let mx = xs.iter().sum::<f64>() / n;
        let sxx: f64 = xs.iter().map(|x| (x - mx) * (x - mx)).sum();
        let sigma2 = fit.ssr / (n - 2.0);
        let expected_se = (sigma2 / sxx).sqrt();

        let slope = fit.estimate("x").unwrap();
        assert!((slope.std_error - expected_se).abs() < 1e-10);
        assert!(slope.p_value < 0.001);
        assert!((slope.t_value - slope.coefficient / slope.std_error).abs() < 1e-12);
    }

    #[test]
    fn test_insufficient_data() {
        let df = df! {
            "x" => [1.0f64, 2.0],
            "y" => [1.0f64, 3.0],
        }
        .unwrap();
        let err = fit_ols(&df, &ModelSpec::parse("m", "y ~ x").unwrap()).unwrap_err();
        match err {
            AnalysisError::InsufficientData {
                observations,
                parameters,
                ..
            } => {
                assert_eq!(observations, 2);
                assert_eq!(parameters, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicated_column_is_rank_deficient() {
        let df = df! {
            "a" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
            "b" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
            "y" => [1.0f64, 3.0, 2.0, 5.0, 4.0],
        }
        .unwrap();
        let err = fit_ols(&df, &ModelSpec::parse("dup", "y ~ a + b").unwrap()).unwrap_err();
        match err {
            AnalysisError::RankDeficient { model, term } => {
                assert_eq!(model, "dup");
                assert_eq!(term, "b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_constant_predictor_collides_with_intercept() {
        let df = df! {
            "a" => [7.0f64; 5],
            "y" => [1.0f64, 3.0, 2.0, 5.0, 4.0],
        }
        .unwrap();
        let err = fit_ols(&df, &ModelSpec::parse("c", "y ~ a").unwrap()).unwrap_err();
        assert!(matches!(err, AnalysisError::RankDeficient { ref term, .. } if term == "a"));
    }

    #[test]
    fn test_p_value_helpers() {
        assert_eq!(t_two_sided_p(f64::INFINITY, 5.0), 0.0);
        assert!(t_two_sided_p(f64::NAN, 5.0).is_nan());
        assert!((t_two_sided_p(0.0, 5.0) - 1.0).abs() < 1e-12);
        // t = 2.571 is the 97.5% quantile at 5 df
        assert!((t_two_sided_p(2.5706, 5.0) - 0.05).abs() < 1e-3);
        assert!((f_upper_tail_p(0.0, 2.0, 10.0) - 1.0).abs() < 1e-12);
    }
}
