//! Feature derivation: age and practice features from raw survey columns
//!
//! Ages use whole elapsed days divided by a fixed 365.25-day year so that
//! every downstream coefficient is reproducible across runs and platforms.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use serde::Serialize;

use super::error::{AnalysisError, AnalysisResult};

pub const OUTCOME_SCORE: &str = "outcome_score";
pub const SUBMIT_INSTANT: &str = "submit_instant";
pub const BIRTH_INSTANT: &str = "birth_instant";
pub const PRACTICE_MONTHS: &str = "practice_months";
pub const PRACTICE_COUNT: &str = "practice_count";
pub const CURRENT_AGE_YEARS: &str = "current_age_years";
pub const PRACTICE_YEARS: &str = "practice_years";
pub const START_AGE_YEARS: &str = "start_age_years";

/// Fixed average year length used for fractional ages.
pub const DAYS_PER_YEAR: f64 = 365.25;
pub const MONTHS_PER_YEAR: f64 = 12.0;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Names of the raw input columns, keyed by their canonical role.
///
/// Mapped columns are renamed to the canonical names during derivation, so
/// everything downstream refers to `outcome_score`, `practice_count`, etc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub outcome_score: String,
    pub submit_instant: String,
    pub birth_instant: String,
    pub practice_months: String,
    pub practice_count: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            outcome_score: OUTCOME_SCORE.to_string(),
            submit_instant: SUBMIT_INSTANT.to_string(),
            birth_instant: BIRTH_INSTANT.to_string(),
            practice_months: PRACTICE_MONTHS.to_string(),
            practice_count: PRACTICE_COUNT.to_string(),
        }
    }
}

impl ColumnMapping {
    /// `(raw, canonical)` pairs in a fixed order.
    pub fn pairs(&self) -> [(&str, &'static str); 5] {
        [
            (self.submit_instant.as_str(), SUBMIT_INSTANT),
            (self.birth_instant.as_str(), BIRTH_INSTANT),
            (self.practice_months.as_str(), PRACTICE_MONTHS),
            (self.practice_count.as_str(), PRACTICE_COUNT),
            (self.outcome_score.as_str(), OUTCOME_SCORE),
        ]
    }
}

/// What to do with a row whose submit time precedes its birth time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalOrderPolicy {
    /// Drop the row and record it in [`DerivedTable::excluded`].
    #[default]
    Exclude,
    /// Fail the whole derivation with [`AnalysisError::TemporalOrder`].
    Abort,
}

impl std::str::FromStr for TemporalOrderPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exclude" => Ok(TemporalOrderPolicy::Exclude),
            "abort" => Ok(TemporalOrderPolicy::Abort),
            other => Err(format!(
                "Unknown temporal policy '{}'. Use 'exclude' or 'abort'",
                other
            )),
        }
    }
}

/// A row dropped because `submit_instant < birth_instant`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalViolation {
    pub row: usize,
    pub submit: NaiveDateTime,
    pub birth: NaiveDateTime,
}

/// Output of [`derive_features`].
#[derive(Debug, Clone)]
pub struct DerivedTable {
    /// Input columns (mapped ones renamed) plus the three derived columns.
    pub df: DataFrame,
    /// Rows excluded under [`TemporalOrderPolicy::Exclude`].
    pub excluded: Vec<TemporalViolation>,
    /// Input row indices whose `start_age_years` came out negative.
    pub negative_start_rows: Vec<usize>,
    /// Input row index of every row kept in `df`, in order.
    pub source_rows: Vec<usize>,
}

impl DerivedTable {
    pub fn height(&self) -> usize {
        self.df.height()
    }
}

/// Append `current_age_years`, `practice_years` and `start_age_years`.
///
/// The input frame is not modified. Null or blank cells give null derived
/// values for that row; they are not errors. Text that does not parse as a
/// timestamp or number is an error naming the column and input row.
pub fn derive_features(
    df: &DataFrame,
    mapping: &ColumnMapping,
    policy: TemporalOrderPolicy,
) -> AnalysisResult<DerivedTable> {
    let available: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    for (raw, _) in mapping.pairs() {
        if !available.iter().any(|c| c == raw) {
            return Err(AnalysisError::MissingColumn {
                column: raw.to_string(),
                available,
            });
        }
    }

    let mut out = df.clone();
    for (raw, canonical) in mapping.pairs() {
        if raw != canonical {
            out.rename(raw, canonical.into())?;
        }
    }

    let submit = timestamp_values(&out, SUBMIT_INSTANT)?;
    let birth = timestamp_values(&out, BIRTH_INSTANT)?;
    let months = numeric_values(&out, PRACTICE_MONTHS)?;
    // Validated here so a bad cell is reported by its input row index.
    numeric_values(&out, PRACTICE_COUNT)?;
    numeric_values(&out, OUTCOME_SCORE)?;

    let n = out.height();
    let mut keep = Vec::with_capacity(n);
    let mut excluded = Vec::new();
    let mut current_age = Vec::with_capacity(n);
    let mut practice_years = Vec::with_capacity(n);
    let mut start_age = Vec::with_capacity(n);
    let mut negative_start_rows = Vec::new();
    let mut source_rows = Vec::with_capacity(n);

    for row in 0..n {
        if let (Some(s), Some(b)) = (submit[row], birth[row]) {
            if s < b {
                match policy {
                    TemporalOrderPolicy::Abort => {
                        return Err(AnalysisError::TemporalOrder {
                            row,
                            submit: s,
                            birth: b,
                        })
                    }
                    TemporalOrderPolicy::Exclude => {
                        excluded.push(TemporalViolation {
                            row,
                            submit: s,
                            birth: b,
                        });
                        keep.push(false);
                        current_age.push(None);
                        practice_years.push(None);
                        start_age.push(None);
                        continue;
                    }
                }
            }
        }

        let age = match (submit[row], birth[row]) {
            (Some(s), Some(b)) => Some(age_in_years(s, b)),
            _ => None,
        };
        let years = months[row].map(|m| m / MONTHS_PER_YEAR);
        let start = match (age, years) {
            (Some(a), Some(y)) => Some(a - y),
            _ => None,
        };

        if start.is_some_and(|v| v < 0.0) {
            negative_start_rows.push(row);
        }

        keep.push(true);
        source_rows.push(row);
        current_age.push(age);
        practice_years.push(years);
        start_age.push(start);
    }

    out.with_column(Column::new(CURRENT_AGE_YEARS.into(), current_age))?;
    out.with_column(Column::new(PRACTICE_YEARS.into(), practice_years))?;
    out.with_column(Column::new(START_AGE_YEARS.into(), start_age))?;

    if !excluded.is_empty() {
        let mask = BooleanChunked::new("keep".into(), keep.as_slice());
        out = out.filter(&mask)?;
    }

    Ok(DerivedTable {
        df: out,
        excluded,
        negative_start_rows,
        source_rows,
    })
}

/// Fractional age from whole elapsed days over a 365.25-day year.
pub fn age_in_years(submit: NaiveDateTime, birth: NaiveDateTime) -> f64 {
    (submit - birth).num_days() as f64 / DAYS_PER_YEAR
}

fn lookup<'a>(df: &'a DataFrame, name: &str) -> AnalysisResult<&'a Column> {
    df.column(name).map_err(|_| AnalysisError::MissingColumn {
        column: name.to_string(),
        available: df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect(),
    })
}

/// Read a column as `f64` values, treating nulls and NaN as missing.
///
/// Text columns are parsed value by value; blank cells are missing and any
/// other unparseable text is an [`AnalysisError::InvalidNumber`].
pub fn numeric_values(df: &DataFrame, name: &str) -> AnalysisResult<Vec<Option<f64>>> {
    let column = lookup(df, name)?;

    match column.dtype() {
        DataType::String => {
            let ca = column.str()?;
            ca.iter()
                .enumerate()
                .map(|(row, value)| match value.map(str::trim) {
                    None | Some("") => Ok(None),
                    Some(text) => text
                        .parse::<f64>()
                        .map(|x| Some(x).filter(|x| !x.is_nan()))
                        .map_err(|_| AnalysisError::InvalidNumber {
                            column: name.to_string(),
                            row,
                            value: text.to_string(),
                        }),
                })
                .collect()
        }
        dtype if dtype.is_primitive_numeric() || dtype.is_bool() || dtype.is_null() => {
            let float_col = column.cast(&DataType::Float64)?;
            let ca = float_col.f64()?;
            Ok(ca
                .iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect())
        }
        other => Err(AnalysisError::UnsupportedColumnType {
            column: name.to_string(),
            dtype: other.to_string(),
            expected: "a numeric or text column",
        }),
    }
}

/// Read a column of `Date`, `Datetime` or string values as timestamps.
///
/// Integer columns are rejected rather than read as epoch offsets.
pub fn timestamp_values(
    df: &DataFrame,
    name: &str,
) -> AnalysisResult<Vec<Option<NaiveDateTime>>> {
    let column = lookup(df, name)?;

    match column.dtype() {
        DataType::String => {
            let ca = column.str()?;
            ca.iter()
                .enumerate()
                .map(|(row, value)| match value.map(str::trim) {
                    None | Some("") => Ok(None),
                    Some(text) => {
                        parse_timestamp(text)
                            .map(Some)
                            .ok_or_else(|| AnalysisError::InvalidTimestamp {
                                column: name.to_string(),
                                row,
                                value: text.to_string(),
                            })
                    }
                })
                .collect()
        }
        DataType::Date | DataType::Datetime(_, _) | DataType::Null => {
            let millis = column
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                .cast(&DataType::Int64)?;
            let ca = millis.i64()?;
            Ok(ca
                .iter()
                .map(|v| v.and_then(DateTime::from_timestamp_millis).map(|d| d.naive_utc()))
                .collect())
        }
        other => Err(AnalysisError::UnsupportedColumnType {
            column: name.to_string(),
            dtype: other.to_string(),
            expected: "a date, datetime or text column",
        }),
    }
}

/// Parse a timestamp written in one of the accepted ISO-like layouts.
///
/// Date-only values are taken as midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    None
}
