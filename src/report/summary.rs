//! Terminal tables for an analysis run

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{
    AnalysisRun, Comparison, CorrelationMatrix, ModelOutcome, TidyRow, TrendOutcome,
    VariableSummary,
};

/// Significance level used to highlight p-values.
const ALPHA: f64 = 0.05;

/// Print every table of a run, in pipeline order.
pub fn display_run(run: &AnalysisRun) {
    print_section("📊", "DESCRIPTIVE STATISTICS");
    print_table(&descriptives_table(&run.descriptives));

    print_section("🔗", "CORRELATION MATRIX");
    print_table(&correlation_table(&run.correlation));

    print_section("📐", "MODEL FIT");
    print_table(&model_fit_table(&[&run.baseline, &run.extended]));

    print_section("📋", "EFFECTS");
    if run.effects.is_empty() {
        println!("      {}", style("No model could be fitted").dim());
    } else {
        print_table(&effects_table(&run.effects));
    }

    if !run.trends.is_empty() {
        print_section("📈", "TRENDS");
        print_table(&trend_table(&run.trends));
    }

    print_section("⚖️ ", "VARIANCE GAIN");
    print_table(&comparison_table(&run.comparison));
}

/// Warning lines describing rows and models the run had to leave out.
pub fn run_warnings(run: &AnalysisRun) -> Vec<String> {
    let mut warnings = Vec::new();

    if !run.derived.excluded.is_empty() {
        let rows: Vec<String> = run
            .derived
            .excluded
            .iter()
            .map(|v| v.row.to_string())
            .collect();
        warnings.push(format!(
            "Excluded {} row(s) submitted before birth: rows {}",
            run.derived.excluded.len(),
            rows.join(", ")
        ));
    }

    if !run.derived.negative_start_rows.is_empty() {
        let rows: Vec<String> = run
            .derived
            .negative_start_rows
            .iter()
            .map(|r| r.to_string())
            .collect();
        warnings.push(format!(
            "{} row(s) report more practice than age (negative start age): rows {}",
            run.derived.negative_start_rows.len(),
            rows.join(", ")
        ));
    }

    for outcome in [&run.baseline, &run.extended] {
        if let Some(err) = outcome.error() {
            warnings.push(format!("{} not fitted: {}", outcome.spec.name, err));
        }
    }

    match &run.comparison {
        Comparison::Computed(gain) => {
            if let Some(w) = &gain.warning {
                warnings.push(w.clone());
            }
        }
        Comparison::NotComputable { reason } => {
            warnings.push(format!("ΔR² not computable: {}", reason));
        }
    }

    warnings
}

pub fn descriptives_table(rows: &[VariableSummary]) -> Table {
    let mut table = new_table(&[
        "Variable", "Count", "Mean", "Std", "Min", "25%", "50%", "75%", "Max",
    ]);

    for s in rows {
        table.add_row(vec![
            Cell::new(&s.name).add_attribute(Attribute::Bold),
            Cell::new(s.count).set_alignment(CellAlignment::Right),
            num_cell(s.mean, 3),
            num_cell(s.std, 3),
            num_cell(s.min, 3),
            num_cell(s.q25, 3),
            num_cell(s.q50, 3),
            num_cell(s.q75, 3),
            num_cell(s.max, 3),
        ]);
    }

    table
}

pub fn correlation_table(matrix: &CorrelationMatrix) -> Table {
    let mut header = vec![""];
    header.extend(matrix.variables.iter().map(String::as_str));
    let mut table = new_table(&header);

    for (i, row) in matrix.to_rows().iter().enumerate() {
        let mut cells = vec![Cell::new(&matrix.variables[i]).add_attribute(Attribute::Bold)];
        for (j, &r) in row.iter().enumerate() {
            let cell = num_cell(r, 3);
            // Strong off-diagonal pairs stand out
            let cell = if i != j && r.abs() >= 0.7 {
                cell.fg(Color::Yellow)
            } else {
                cell
            };
            cells.push(cell);
        }
        table.add_row(cells);
    }

    table
}

pub fn model_fit_table(outcomes: &[&ModelOutcome]) -> Table {
    let mut table = new_table(&["Model", "Formula", "N", "R²", "Adj. R²", "F", "p(F)"]);

    for outcome in outcomes {
        match outcome.result() {
            Some(result) => {
                table.add_row(vec![
                    Cell::new(&result.name).add_attribute(Attribute::Bold),
                    Cell::new(&result.formula),
                    Cell::new(result.n_obs).set_alignment(CellAlignment::Right),
                    num_cell(result.r_squared, 4),
                    num_cell(result.adj_r_squared, 4),
                    num_cell(result.f_statistic, 2),
                    p_cell(result.f_p_value),
                ]);
            }
            None => {
                table.add_row(vec![
                    Cell::new(&outcome.spec.name).add_attribute(Attribute::Bold),
                    Cell::new(outcome.spec.formula()),
                    Cell::new("not fitted").fg(Color::Red),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                ]);
            }
        }
    }

    table
}

pub fn effects_table(rows: &[TidyRow]) -> Table {
    let mut table = new_table(&["Model", "Term", "Coef", "Std. coef", "Std. err", "p"]);

    for row in rows {
        let std_coef = match row.standardized_coefficient {
            Some(b) => num_cell(b, 4),
            None => Cell::new("-").set_alignment(CellAlignment::Right),
        };
        table.add_row(vec![
            Cell::new(&row.model_name),
            Cell::new(&row.term).add_attribute(Attribute::Bold),
            num_cell(row.coefficient, 4),
            std_coef,
            num_cell(row.std_error, 4),
            p_cell(row.p_value),
        ]);
    }

    table
}

pub fn trend_table(trends: &[TrendOutcome]) -> Table {
    let mut table = new_table(&["Predictor", "Intercept", "Slope", "R²", "N"]);

    for trend in trends {
        match &trend.line {
            Ok(line) => {
                table.add_row(vec![
                    Cell::new(&line.predictor).add_attribute(Attribute::Bold),
                    num_cell(line.intercept, 3),
                    num_cell(line.slope, 3),
                    num_cell(line.r_squared, 4),
                    Cell::new(line.n_obs).set_alignment(CellAlignment::Right),
                ]);
            }
            Err(e) => {
                table.add_row(vec![
                    Cell::new(&trend.predictor).add_attribute(Attribute::Bold),
                    Cell::new(e.to_string()).fg(Color::Red),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                ]);
            }
        }
    }

    table
}

pub fn comparison_table(comparison: &Comparison) -> Table {
    let mut table = new_table(&["Metric", "Value"]);

    match comparison {
        Comparison::Computed(gain) => {
            table.add_row(vec![
                Cell::new(format!("R² {}", gain.baseline_model)),
                num_cell(gain.baseline_r_squared, 4),
            ]);
            table.add_row(vec![
                Cell::new(format!("R² {}", gain.extended_model)),
                num_cell(gain.extended_r_squared, 4),
            ]);
            table.add_row(vec![
                Cell::new("ΔR²").add_attribute(Attribute::Bold),
                num_cell(gain.delta_r_squared, 4)
                    .fg(Color::Green)
                    .add_attribute(Attribute::Bold),
            ]);
            if let Some(test) = &gain.nested_test {
                table.add_row(vec![
                    Cell::new(format!("F({}, {})", test.df_num, test.df_den)),
                    num_cell(test.f_statistic, 3),
                ]);
                table.add_row(vec![Cell::new("p(F)"), p_cell(test.p_value)]);
            }
        }
        Comparison::NotComputable { reason } => {
            table.add_row(vec![
                Cell::new("ΔR²").add_attribute(Attribute::Bold),
                Cell::new("not computable").fg(Color::Red),
            ]);
            table.add_row(vec![Cell::new("Reason"), Cell::new(reason)]);
        }
    }

    table
}

/// Format a statistic, printing undefined values as `NaN`.
pub fn format_number(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{:.*}", decimals, value)
    }
}

pub fn format_p_value(p: f64) -> String {
    if p.is_nan() {
        "NaN".to_string()
    } else if p < 0.001 {
        "<0.001".to_string()
    } else {
        format!("{:.3}", p)
    }
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        header
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn num_cell(value: f64, decimals: usize) -> Cell {
    Cell::new(format_number(value, decimals)).set_alignment(CellAlignment::Right)
}

fn p_cell(p: f64) -> Cell {
    let cell = Cell::new(format_p_value(p)).set_alignment(CellAlignment::Right);
    if p < ALPHA {
        cell.fg(Color::Green)
    } else {
        cell
    }
}

fn print_section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_table(table: &Table) {
    // Indent the table
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}
