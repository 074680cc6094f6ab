//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use screentest_harness::{BatchOutcome, BatchReport};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for BatchOutcome {
    fn headers() -> Vec<&'static str> {
        vec!["Screen", "Status", "Time (ms)", "Chars", "Errors"]
    }

    fn row(&self) -> Vec<String> {
        let status = if self.is_success() { "pass" } else { "FAIL" };
        match (&self.result, &self.failure) {
            (Some(result), _) => vec![
                self.screen_path.clone(),
                status.to_string(),
                result.render_time_ms.to_string(),
                result.output_chars().to_string(),
                result.error_messages.join("\n"),
            ],
            (None, failure) => vec![
                self.screen_path.clone(),
                status.to_string(),
                "-".to_string(),
                "-".to_string(),
                failure.clone().unwrap_or_default(),
            ],
        }
    }
}

/// Print a batch report
pub fn print_report(report: &BatchReport, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(BatchOutcome::headers());
            for outcome in &report.outcomes {
                table.add_row(outcome.row());
            }

            println!("{table}");
            print_summary(report);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (i, outcome) in report.outcomes.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let row = outcome.row();
                for (header, value) in BatchOutcome::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
            }
            print_summary(report);
        }
    }
}

fn print_summary(report: &BatchReport) {
    let line = format!(
        "{} passed, {} failed in {} ms | {} renders, {} errors, {} chars since {}",
        report.passed,
        report.failed,
        report.duration_ms,
        report.stats.render_count,
        report.stats.error_count,
        report.stats.total_output_chars,
        report.stats.started_at.to_rfc3339(),
    );
    if report.failed == 0 {
        println!("✅ {}", line.green());
    } else {
        println!("❌ {}", line.red());
    }
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}
