//! Shared test utilities and fixture generators
#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tempfile::TempDir;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Practice months for the five-respondent scenario: 1 through 5 years.
pub const FIVE_ROW_MONTHS: [f64; 5] = [12.0, 24.0, 36.0, 48.0, 60.0];

/// Counts that are exactly `10 * practice_years` (collinear with practice).
pub const PROPORTIONAL_COUNTS: [f64; 5] = [10.0, 20.0, 30.0, 40.0, 50.0];

/// Counts that vary independently of practice years.
pub const INDEPENDENT_COUNTS: [f64; 5] = [10.0, 25.0, 27.0, 44.0, 50.0];

fn at_midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Five respondents with an outcome that is exactly
/// `1000 + 60 * practice_years + 2 * practice_count`.
pub fn create_five_row_frame(counts: [f64; 5]) -> DataFrame {
    let submit = at_midnight(2024, 6, 1);
    let births = [
        at_midnight(1990, 1, 15),
        at_midnight(1985, 7, 2),
        at_midnight(1979, 3, 30),
        at_midnight(1995, 11, 11),
        at_midnight(1970, 5, 5),
    ];

    let outcome: Vec<f64> = FIVE_ROW_MONTHS
        .iter()
        .zip(counts.iter())
        .map(|(m, c)| 1000.0 + 60.0 * (m / 12.0) + 2.0 * c)
        .collect();

    df! {
        "submit_instant" => vec![format_ts(submit); 5],
        "birth_instant" => births.iter().map(|b| format_ts(*b)).collect::<Vec<_>>(),
        "practice_months" => FIVE_ROW_MONTHS.to_vec(),
        "practice_count" => counts.to_vec(),
        "outcome_score" => outcome,
    }
    .unwrap()
}

/// Random but internally consistent survey responses.
///
/// Practice never exceeds age and every submission follows birth. The outcome
/// depends on practice, count and a curved age effect plus noise.
pub fn create_survey_frame(rows: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let base_submit = at_midnight(2024, 1, 1);

    let mut submit = Vec::with_capacity(rows);
    let mut birth = Vec::with_capacity(rows);
    let mut months = Vec::with_capacity(rows);
    let mut counts = Vec::with_capacity(rows);
    let mut outcome = Vec::with_capacity(rows);

    for _ in 0..rows {
        let submitted = base_submit + Duration::days(rng.gen_range(0..365));
        let age_days: i64 = rng.gen_range(18 * 365..70 * 365);
        let born = submitted - Duration::days(age_days);
        let age_years = age_days as f64 / 365.25;

        let max_months = ((age_years - 5.0) * 12.0).max(1.0) as i64;
        let practice_months = rng.gen_range(0..=max_months) as f64;
        let practice_count = rng.gen_range(0..500) as f64;

        let practice_years = practice_months / 12.0;
        let score = 10_000.0 + 45.0 * practice_years + 1.5 * practice_count
            - 0.8 * (age_years - 40.0).powi(2)
            + rng.gen_range(-150.0..150.0);

        submit.push(format_ts(submitted));
        birth.push(format_ts(born));
        months.push(practice_months);
        counts.push(practice_count);
        outcome.push(score);
    }

    df! {
        "submit_instant" => submit,
        "birth_instant" => birth,
        "practice_months" => months,
        "practice_count" => counts,
        "outcome_score" => outcome,
    }
    .unwrap()
}

/// Append one respondent whose submission precedes their birth.
pub fn with_time_travel_row(df: &DataFrame) -> DataFrame {
    let extra = df! {
        "submit_instant" => [format_ts(at_midnight(1999, 1, 1))],
        "birth_instant" => [format_ts(at_midnight(2001, 1, 1))],
        "practice_months" => [12.0f64],
        "practice_count" => [3.0f64],
        "outcome_score" => [99_999.0f64],
    }
    .unwrap();
    df.vstack(&extra).unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("survey.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("survey.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

pub fn assert_close(actual: f64, expected: f64, tol: f64, what: &str) {
    assert!(
        (actual - expected).abs() <= tol,
        "{}: expected {} within {}, got {}",
        what,
        expected,
        tol,
        actual
    );
}
