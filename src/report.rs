//! Console and JSON reporting of a run.

use std::path::Path;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::engine::{Run, StepReport, StepStatus};
use crate::errors::Error;

/// One table row per step plus a totals row.
#[must_use]
pub fn summary_table(run: &Run) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            header_cell("#"),
            header_cell("Step"),
            header_cell("Kind"),
            header_cell("Status"),
            header_cell("Rows in"),
            header_cell("Rows out"),
            header_cell("Renamed"),
            header_cell("Failed rows"),
        ]);
    for index in [0, 4, 5, 6, 7] {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }

    let (mut rows_in, mut rows_out, mut renamed, mut failed) = (0, 0, 0, 0);
    for (index, report) in run.reports.iter().enumerate() {
        rows_in += report.rows_in;
        rows_out += report.rows_out;
        renamed += report.replacements;
        failed += report.failures.len();
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&report.name),
            Cell::new(report.kind),
            status_cell(report.status),
            count_cell(report.rows_in),
            count_cell(report.rows_out),
            count_cell(report.replacements),
            count_cell(report.failures.len()).fg(if report.failures.is_empty() {
                Color::DarkGrey
            } else {
                Color::Red
            }),
        ]);
    }

    table.add_row(vec![
        Cell::new(""),
        Cell::new("TOTAL").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(rows_in).add_attribute(Attribute::Bold),
        Cell::new(rows_out).add_attribute(Attribute::Bold),
        Cell::new(renamed).add_attribute(Attribute::Bold),
        Cell::new(failed).add_attribute(Attribute::Bold),
    ]);
    table
}

/// Lines for the manual follow-up section: every step note, every step that
/// did not apply, and every failed row.
#[must_use]
pub fn follow_ups(run: &Run) -> Vec<String> {
    let mut lines = Vec::new();
    for report in &run.reports {
        if report.status.needs_attention() {
            let detail = report.detail.as_deref().unwrap_or("see failed rows");
            lines.push(format!("{} [{}]: {detail}", report.name, report.status));
        }
        for failure in &report.failures {
            lines.push(format!(
                "{}: line {}: {}: {}",
                report.name, failure.line, failure.error, failure.text
            ));
        }
        for note in &report.notes {
            lines.push(format!("{}: {note}", report.name));
        }
    }
    lines
}

/// The full console report.
#[must_use]
pub fn render(run: &Run, written: &[impl AsRef<Path>]) -> String {
    let mut out = String::new();
    out.push_str(&summary_table(run).to_string());
    out.push('\n');

    if !written.is_empty() {
        out.push_str("\nWrote:\n");
        for path in written {
            out.push_str(&format!("  {}\n", path.as_ref().display()));
        }
    }

    let follow_ups = follow_ups(run);
    if !follow_ups.is_empty() {
        out.push_str("\nManual follow-up:\n");
        for line in follow_ups {
            out.push_str(&format!("  - {line}\n"));
        }
    }
    out
}

/// Write the step reports as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_json(path: &Path, reports: &[StepReport]) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(reports).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source: source.into(),
    })?;
    std::fs::write(path, json + "\n").map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize) -> Cell {
    if count == 0 {
        Cell::new("-").fg(Color::DarkGrey)
    } else {
        Cell::new(count)
    }
}

fn status_cell(status: StepStatus) -> Cell {
    let color = match status {
        StepStatus::Applied => Color::Green,
        StepStatus::Partial | StepStatus::NotFound | StepStatus::Empty => Color::Yellow,
        StepStatus::RowFailures | StepStatus::Failed => Color::Red,
    };
    Cell::new(status).fg(color)
}
