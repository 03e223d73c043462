//! Benchmark for model fitting and the correlation matrix
//!
//! Run with: cargo bench --bench regression_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polars::prelude::*;
use rand::prelude::*;
use rand::SeedableRng;

use agefit::pipeline::{correlation_matrix, fit_ols, ModelSpec, Term};

const PREDICTORS: [&str; 5] = ["x0", "x1", "x2", "x3", "x4"];

/// Generate a table with five predictors and a noisy linear response
fn generate_test_dataframe(n_rows: usize, seed: u64) -> DataFrame {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let predictors: Vec<Vec<f64>> = PREDICTORS
        .iter()
        .map(|_| (0..n_rows).map(|_| rng.gen::<f64>() * 100.0).collect())
        .collect();

    let y: Vec<f64> = (0..n_rows)
        .map(|i| {
            let signal: f64 = predictors
                .iter()
                .enumerate()
                .map(|(j, col)| (j as f64 + 1.0) * col[i])
                .sum();
            signal + rng.gen::<f64>() * 50.0
        })
        .collect();

    let mut columns: Vec<Column> = PREDICTORS
        .iter()
        .zip(predictors)
        .map(|(name, values)| Column::new((*name).into(), values))
        .collect();
    columns.push(Column::new("y".into(), y));

    DataFrame::new(columns).expect("Failed to create DataFrame")
}

fn full_model() -> ModelSpec {
    let mut terms: Vec<Term> = PREDICTORS.iter().map(|p| Term::Linear(p.to_string())).collect();
    terms.push(Term::Square("x0".to_string()));
    ModelSpec::new("bench", "y", terms)
}

/// Fit time as the row count grows
fn benchmark_fit_by_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit_by_rows");
    group.sample_size(30);

    let spec = full_model();
    for n_rows in [1_000, 10_000, 100_000] {
        let df = generate_test_dataframe(n_rows, 42);
        group.throughput(Throughput::Elements(n_rows as u64));
        group.bench_with_input(BenchmarkId::new("fit_ols", n_rows), &df, |b, df| {
            b.iter(|| fit_ols(black_box(df), black_box(&spec)).expect("fit failed"))
        });
    }

    group.finish();
}

fn benchmark_correlation_by_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation_by_rows");
    group.sample_size(30);

    let mut variables = PREDICTORS.to_vec();
    variables.push("y");
    for n_rows in [1_000, 10_000, 100_000] {
        let df = generate_test_dataframe(n_rows, 7);
        group.throughput(Throughput::Elements(n_rows as u64));
        group.bench_with_input(BenchmarkId::new("pairwise", n_rows), &df, |b, df| {
            b.iter(|| correlation_matrix(black_box(df), black_box(&variables)).expect("corr failed"))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_fit_by_rows, benchmark_correlation_by_rows);
criterion_main!(benches);
