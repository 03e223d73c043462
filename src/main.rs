//! agefit: practice-versus-age regression CLI
//!
//! Loads survey responses, derives ages and practice duration, and compares a
//! practice-only model with a practice-plus-age model.

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use console::style;

use agefit::cli::Cli;
use agefit::pipeline::{
    analyze_derived, derive_features, filter_min_outcome, load_dataset_with_progress,
};
use agefit::report::{display_run, export_analysis, run_warnings};
use agefit::utils::{
    create_spinner, finish_derivation, finish_fitting, finish_with_success, print_banner,
    print_completion, print_config, print_count, print_info, print_step_header, print_step_time,
    print_success, print_warning,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = cli.analysis_config()?;
    let report_config = cli.report_config();

    // Print styled banner
    print_banner(env!("CARGO_PKG_VERSION"));

    // Print configuration card
    print_config(
        &cli.input,
        &config.columns,
        report_config.as_ref().map(|r| r.output_dir.as_path()),
    );

    // Step 1: Load dataset
    print_step_header(1, "Load Dataset");

    let step_start = Instant::now();
    let (mut df, rows, cols, memory_mb) =
        load_dataset_with_progress(&cli.input, cli.infer_schema_length)?;
    print_success("Dataset loaded");

    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);

    if let Some((column, threshold)) = cli.min_outcome_filter() {
        let (filtered, removed) = filter_min_outcome(&df, column, threshold)?;
        df = filtered;
        if removed > 0 {
            print_count(
                "row(s) below the outcome minimum",
                removed,
                Some(&format!("(<{})", threshold)),
            );
        } else {
            print_info("No rows below the outcome minimum");
        }
    }
    print_step_time(step_start.elapsed());

    // Step 2: Derive features
    print_step_header(2, "Derive Features");

    let step_start = Instant::now();
    let spinner = create_spinner("Deriving ages and practice duration...");
    let derived = derive_features(&df, &config.columns, config.temporal_policy)?;
    finish_derivation(&spinner, derived.excluded.len());
    print_info(&format!("{} row(s) carried into the analysis", derived.height()));
    print_step_time(step_start.elapsed());

    // Step 3: Describe, fit, tidy and compare
    print_step_header(3, "Fit Models");

    let step_start = Instant::now();
    let spinner = create_spinner("Fitting baseline and extended models...");
    let run = analyze_derived(derived, &config)?;
    let outcomes = [&run.baseline, &run.extended];
    let fitted = outcomes.iter().filter(|o| o.result().is_some()).count();
    finish_fitting(&spinner, fitted, outcomes.len());
    print_step_time(step_start.elapsed());

    display_run(&run);

    let warnings = run_warnings(&run);
    if !warnings.is_empty() {
        println!();
        for warning in &warnings {
            print_warning(warning);
        }
    }

    // Step 4: Export
    if let Some(report_config) = &report_config {
        print_step_header(4, "Save Results");

        let step_start = Instant::now();
        let spinner = create_spinner("Writing report files...");
        let written = export_analysis(&run, &cli.input, &config, report_config)?;
        finish_with_success(
            &spinner,
            &format!("Saved to {}", report_config.output_dir.display()),
        );
        for path in &written {
            println!("      {} {}", style("•").dim(), path.display());
        }
        print_step_time(step_start.elapsed());
    }

    // Final completion message
    print_completion();

    Ok(())
}
