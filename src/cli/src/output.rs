//! Table and summary formatting for CLI output.

use std::fmt::Write;

use a3s_ferry_core::task::{RunSummary, TaskOutcome, TaskResult};
use comfy_table::{ContentArrangement, Table};

const RULE_WIDTH: usize = 60;

/// Create a styled table with the given headers.
pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(headers);
    table
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn status_label(outcome: TaskOutcome) -> &'static str {
    match outcome {
        TaskOutcome::Succeeded => "OK",
        TaskOutcome::Skipped => "SKIPPED",
        TaskOutcome::Failed => "FAILED",
    }
}

fn detail(result: &TaskResult) -> String {
    if let Some(message) = &result.message {
        return message.clone();
    }
    let elapsed = format!("{:.1}s", result.elapsed.as_secs_f64());
    match result.size_bytes {
        Some(size) => format!("{} in {elapsed}", format_bytes(size)),
        None => elapsed,
    }
}

/// Render the end-of-run report for a batch.
pub fn render_summary(title: &str, summary: &RunSummary) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "Total: {}  Succeeded: {}  Skipped: {}  Failed: {}",
        summary.total(),
        summary.succeeded.len(),
        summary.skipped.len(),
        summary.failed.len()
    );
    let _ = writeln!(out, "Duration: {:.1}s", summary.duration.as_secs_f64());

    if summary.total() > 0 {
        let mut table = new_table(&["STATUS", "IMAGE", "DETAIL"]);
        for result in summary.iter() {
            table.add_row([
                status_label(result.outcome).to_string(),
                result.identity.clone(),
                detail(result),
            ]);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{table}");
    }

    let _ = write!(out, "{rule}");
    out
}
