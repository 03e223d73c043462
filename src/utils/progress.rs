//! Step spinners for the terminal run

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const TICK_INTERVAL: Duration = Duration::from_millis(100);

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("    {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(TICK_CHARS)
}

/// Spinner shown while a pipeline step runs.
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner().with_style(spinner_style());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(TICK_INTERVAL);
    pb
}

pub fn finish_with_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✅ {}", message));
}

pub fn finish_with_warning(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("⚠️  {}", message));
}

/// Close the derivation spinner; any excluded row turns it into a warning.
pub fn finish_derivation(pb: &ProgressBar, excluded: usize) {
    if excluded == 0 {
        finish_with_success(pb, "Derived current age, practice years and start age");
    } else {
        finish_with_warning(
            pb,
            &format!(
                "Derived features; {} row(s) excluded for submit-before-birth",
                excluded
            ),
        );
    }
}

/// Close the fitting spinner with how many of `total` models produced a fit.
pub fn finish_fitting(pb: &ProgressBar, fitted: usize, total: usize) {
    if fitted == total {
        finish_with_success(pb, "Both models fitted");
    } else {
        finish_with_warning(pb, &format!("{} of {} models fitted", fitted, total));
    }
}
