//! Integration tests for model fitting and standardized effects

use agefit::pipeline::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn practice_model() -> ModelSpec {
    ModelSpec::parse("Model0", "outcome_score ~ practice_years + practice_count").unwrap()
}

#[test]
fn test_five_rows_exact_fit_recovers_coefficients() {
    let df = create_five_row_frame(INDEPENDENT_COUNTS);
    let derived = derive_features(&df, &ColumnMapping::default(), TemporalOrderPolicy::Abort)
        .unwrap();
    let result = fit_ols(&derived.df, &practice_model()).unwrap();

    assert_eq!(result.n_obs, 5);
    assert_eq!(result.df_resid, 2);
    assert_close(result.r_squared, 1.0, 1e-6, "R²");
    assert_close(result.coefficient(INTERCEPT).unwrap(), 1000.0, 1e-6, "Intercept");
    assert_close(result.coefficient(PRACTICE_YEARS).unwrap(), 60.0, 1e-6, "practice_years");
    assert_close(result.coefficient(PRACTICE_COUNT).unwrap(), 2.0, 1e-6, "practice_count");
}

#[test]
fn test_five_rows_proportional_counts_are_rank_deficient() {
    let df = create_five_row_frame(PROPORTIONAL_COUNTS);
    let derived = derive_features(&df, &ColumnMapping::default(), TemporalOrderPolicy::Abort)
        .unwrap();
    let err = fit_ols(&derived.df, &practice_model()).unwrap_err();
    match err {
        AnalysisError::RankDeficient { model, term } => {
            assert_eq!(model, "Model0");
            assert_eq!(term, PRACTICE_COUNT);
        }
        other => panic!("expected RankDeficient, got {other}"),
    }
}

#[test]
fn test_default_extended_model_is_collinear_in_start_age() {
    // start_age_years is current_age_years minus practice_years on every row
    let df = create_survey_frame(120, 5);
    let derived = derive_features(&df, &ColumnMapping::default(), TemporalOrderPolicy::Abort)
        .unwrap();
    let err = fit_ols(&derived.df, &ModelSpec::extended()).unwrap_err();
    match err {
        AnalysisError::RankDeficient { term, .. } => assert_eq!(term, START_AGE_YEARS),
        other => panic!("expected RankDeficient, got {other}"),
    }
}

#[test]
fn test_baseline_fit_on_survey() {
    let df = create_survey_frame(300, 21);
    let derived = derive_features(&df, &ColumnMapping::default(), TemporalOrderPolicy::Abort)
        .unwrap();
    let result = fit_ols(&derived.df, &ModelSpec::baseline()).unwrap();

    assert_eq!(result.n_obs, 300);
    assert_eq!(result.n_params(), 3);
    assert!(result.r_squared > 0.0 && result.r_squared < 1.0);
    assert!(result.adj_r_squared <= result.r_squared);
    assert!(result.f_p_value < 0.05);
    assert!(result.coefficient(PRACTICE_COUNT).unwrap() > 0.0);
    for est in &result.estimates {
        assert!(est.std_error > 0.0, "{} should have a positive std error", est.term);
        assert!((0.0..=1.0).contains(&est.p_value));
    }
}

#[test]
fn test_tidy_rows_follow_model_terms() {
    let df = create_survey_frame(200, 8);
    let derived = derive_features(&df, &ColumnMapping::default(), TemporalOrderPolicy::Abort)
        .unwrap();
    let spec = ModelSpec::parse(
        "Model1",
        "outcome_score ~ practice_years + practice_count + current_age_years + current_age_years^2",
    )
    .unwrap();
    let result = fit_ols(&derived.df, &spec).unwrap();
    let y: Vec<f64> = numeric_values(&derived.df, OUTCOME_SCORE)
        .unwrap()
        .into_iter()
        .flatten()
        .collect();

    let rows: Vec<TidyRow> = tidy(&result, &y).collect();
    let terms: Vec<&str> = rows.iter().map(|r| r.term.as_str()).collect();
    assert_eq!(
        terms,
        vec![
            INTERCEPT,
            PRACTICE_YEARS,
            PRACTICE_COUNT,
            CURRENT_AGE_YEARS,
            "current_age_years^2"
        ]
    );

    assert!(rows[0].standardized_coefficient.is_none());
    for row in &rows[1..] {
        let beta = row.standardized_coefficient.unwrap();
        assert!(beta.is_finite());
        assert_eq!(row.model_name, "Model1");
    }

    // The curved age effect shows up with a negative square term
    assert!(rows[4].coefficient < 0.0);
}
