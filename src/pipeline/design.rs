//! Model terms, formula parsing and design-matrix construction

use std::collections::BTreeSet;
use std::fmt;

use faer::Mat;
use polars::prelude::*;
use serde::Serialize;

use super::error::{AnalysisError, AnalysisResult};
use super::features::{
    numeric_values, CURRENT_AGE_YEARS, OUTCOME_SCORE, PRACTICE_COUNT, PRACTICE_YEARS,
    START_AGE_YEARS,
};

pub const INTERCEPT: &str = "Intercept";

/// One column of a design matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Term {
    Intercept,
    Linear(String),
    /// `x^2`, an explicit column of squared values.
    Square(String),
    /// `a:b`, the elementwise product of two variables.
    Interaction(String, String),
}

impl Term {
    pub fn name(&self) -> String {
        match self {
            Term::Intercept => INTERCEPT.to_string(),
            Term::Linear(v) => v.clone(),
            Term::Square(v) => format!("{}^2", v),
            Term::Interaction(a, b) => format!("{}:{}", a, b),
        }
    }

    pub fn is_intercept(&self) -> bool {
        matches!(self, Term::Intercept)
    }

    /// Input variables this term reads.
    pub fn variables(&self) -> Vec<&str> {
        match self {
            Term::Intercept => Vec::new(),
            Term::Linear(v) | Term::Square(v) => vec![v.as_str()],
            Term::Interaction(a, b) => vec![a.as_str(), b.as_str()],
        }
    }

    fn value(&self, row: &dyn Fn(&str) -> f64) -> f64 {
        match self {
            Term::Intercept => 1.0,
            Term::Linear(v) => row(v),
            Term::Square(v) => {
                let x = row(v);
                x * x
            }
            Term::Interaction(a, b) => row(a) * row(b),
        }
    }

    fn parse(token: &str, formula: &str) -> AnalysisResult<Term> {
        let invalid = |message: String| AnalysisError::InvalidFormula {
            formula: formula.to_string(),
            message,
        };

        let token = token.trim();
        if token.is_empty() {
            return Err(invalid("empty term".to_string()));
        }
        if token == "1" {
            return Ok(Term::Intercept);
        }

        // I(x**2) is accepted as a synonym of x^2
        let token = match token.strip_prefix("I(").and_then(|t| t.strip_suffix(')')) {
            Some(inner) => inner.trim(),
            None => token,
        };

        if let Some((base, power)) = token.split_once("**").or_else(|| token.split_once('^')) {
            let base = base.trim();
            return match power.trim() {
                "2" if is_identifier(base) => Ok(Term::Square(base.to_string())),
                "2" => Err(invalid(format!("'{}' is not a column name", base))),
                other => Err(invalid(format!("only squared terms are supported, got power {}", other))),
            };
        }

        if let Some((a, b)) = token.split_once(':') {
            let (a, b) = (a.trim(), b.trim());
            if !is_identifier(a) || !is_identifier(b) {
                return Err(invalid(format!("invalid interaction '{}'", token)));
            }
            return Ok(Term::Interaction(a.to_string(), b.to_string()));
        }

        if is_identifier(token) {
            Ok(Term::Linear(token.to_string()))
        } else {
            Err(invalid(format!("'{}' is not a column name", token)))
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !s.starts_with(|c: char| c.is_ascii_digit())
}

/// A named linear model: response plus terms, intercept first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSpec {
    pub name: String,
    pub response: String,
    pub terms: Vec<Term>,
}

impl ModelSpec {
    /// Build a spec with an intercept followed by `terms` (duplicates removed).
    pub fn new(name: impl Into<String>, response: impl Into<String>, terms: Vec<Term>) -> Self {
        let mut all = vec![Term::Intercept];
        for term in terms {
            if !all.contains(&term) {
                all.push(term);
            }
        }
        Self {
            name: name.into(),
            response: response.into(),
            terms: all,
        }
    }

    /// Practice volume only.
    pub fn baseline() -> Self {
        Self::new(
            "Model0",
            OUTCOME_SCORE,
            vec![
                Term::Linear(PRACTICE_YEARS.to_string()),
                Term::Linear(PRACTICE_COUNT.to_string()),
            ],
        )
    }

    /// Practice volume plus current age (linear and squared) and start age.
    pub fn extended() -> Self {
        Self::new(
            "Model1",
            OUTCOME_SCORE,
            vec![
                Term::Linear(PRACTICE_YEARS.to_string()),
                Term::Linear(PRACTICE_COUNT.to_string()),
                Term::Linear(CURRENT_AGE_YEARS.to_string()),
                Term::Square(CURRENT_AGE_YEARS.to_string()),
                Term::Linear(START_AGE_YEARS.to_string()),
            ],
        )
    }

    /// Parse `response ~ a + b + a^2 + a:b`.
    ///
    /// The intercept is always included.
    pub fn parse(name: impl Into<String>, formula: &str) -> AnalysisResult<Self> {
        let (response, rhs) = formula
            .split_once('~')
            .ok_or_else(|| AnalysisError::InvalidFormula {
                formula: formula.to_string(),
                message: "expected 'response ~ terms'".to_string(),
            })?;

        let response = response.trim();
        if !is_identifier(response) {
            return Err(AnalysisError::InvalidFormula {
                formula: formula.to_string(),
                message: format!("'{}' is not a column name", response),
            });
        }

        let terms = rhs
            .split('+')
            .map(|t| Term::parse(t, formula))
            .collect::<AnalysisResult<Vec<_>>>()?;

        Ok(Self::new(name, response, terms))
    }

    pub fn term_names(&self) -> Vec<String> {
        self.terms.iter().map(Term::name).collect()
    }

    /// The formula in `response ~ a + b` form, without the implicit intercept.
    pub fn formula(&self) -> String {
        let rhs: Vec<String> = self
            .terms
            .iter()
            .filter(|t| !t.is_intercept())
            .map(Term::name)
            .collect();
        let rhs = if rhs.is_empty() {
            "1".to_string()
        } else {
            rhs.join(" + ")
        };
        format!("{} ~ {}", self.response, rhs)
    }

    /// Distinct input variables used by the terms, sorted.
    pub fn variables(&self) -> BTreeSet<&str> {
        self.terms.iter().flat_map(|t| t.variables()).collect()
    }

    /// True when every term of `self` also appears in `other`.
    pub fn is_nested_in(&self, other: &ModelSpec) -> bool {
        self.response == other.response && self.terms.iter().all(|t| other.terms.contains(t))
    }
}

/// Expanded predictor matrix for one model fit.
///
/// Rows are the table rows complete for the response and every variable the
/// terms read (listwise deletion per model).
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub terms: Vec<Term>,
    pub x: Mat<f64>,
    pub y: Vec<f64>,
    /// Table row index of each design row.
    pub rows: Vec<usize>,
}

impl DesignMatrix {
    pub fn build(df: &DataFrame, spec: &ModelSpec) -> AnalysisResult<Self> {
        let mut names: Vec<&str> = spec.variables().into_iter().collect();
        names.push(spec.response.as_str());

        let columns: Vec<(&str, Vec<Option<f64>>)> = names
            .iter()
            .map(|name| numeric_values(df, name).map(|values| (*name, values)))
            .collect::<AnalysisResult<_>>()?;

        let complete: Vec<usize> = (0..df.height())
            .filter(|&row| columns.iter().all(|(_, values)| values[row].is_some()))
            .collect();

        let lookup = |row: usize, name: &str| -> f64 {
            columns
                .iter()
                .find(|(n, _)| *n == name)
                .and_then(|(_, values)| values[row])
                .unwrap_or(f64::NAN)
        };

        let n = complete.len();
        let p = spec.terms.len();
        let mut x = Mat::<f64>::zeros(n, p);
        let mut y = Vec::with_capacity(n);

        for (i, &row) in complete.iter().enumerate() {
            let get = |name: &str| lookup(row, name);
            for (j, term) in spec.terms.iter().enumerate() {
                x[(i, j)] = term.value(&get);
            }
            y.push(get(spec.response.as_str()));
        }

        Ok(Self {
            terms: spec.terms.clone(),
            x,
            y,
            rows: complete,
        })
    }

    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.x.ncols()
    }

    pub fn column_at(&self, j: usize) -> Vec<f64> {
        (0..self.nrows()).map(|i| self.x[(i, j)]).collect()
    }
}
