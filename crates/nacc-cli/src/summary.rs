use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use nacc_cli::runner::GearRun;
use nacc_model::{ErrorLocation, FileError, Identifier};
use nacc_scheduler::RunSummary;

use crate::commands::Outcome;

/// Errors listed in the terminal before the table is cut off.
const MAX_LISTED_ERRORS: usize = 50;

pub fn print_summary(outcome: &Outcome) {
    match outcome {
        Outcome::Gear(run) => print_gear_summary(run),
        Outcome::Schedule(summary) => print_schedule_summary(summary),
        Outcome::Identifiers(records) => print_identifiers(records),
    }
}

fn print_gear_summary(run: &GearRun) {
    println!("Gear: {}", run.gear);
    println!("Input: {}", run.input.display());

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Rows"),
        header_cell("Failed"),
        header_cell("Errors"),
        header_cell("Alerts"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    let status = if run.succeeded {
        Cell::new("ok").fg(Color::Green)
    } else {
        Cell::new("failed").fg(Color::Red).add_attribute(Attribute::Bold)
    };
    table.add_row(vec![
        Cell::new(run.stats.rows),
        count_cell(run.stats.failed_rows, Color::Red),
        count_cell(run.errors.error_count(), Color::Red),
        count_cell(run.errors.alert_count(), Color::Yellow),
        status,
    ]);
    for index in 0..4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    println!("{table}");

    for (label, value) in &run.details {
        println!("{label}: {value}");
    }
    if !run.outputs.is_empty() {
        println!("Outputs:");
        for path in &run.outputs {
            println!("  {}", path.display());
        }
    }

    let errors = run.errors.errors();
    if !errors.is_empty() {
        println!();
        print_error_table(errors);
    }
}

fn print_error_table(errors: &[FileError]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Line"),
        header_cell("Type"),
        header_cell("Code"),
        header_cell("Field"),
        header_cell("Message"),
    ]);
    apply_error_table_style(&mut table);
    for error in errors.iter().take(MAX_LISTED_ERRORS) {
        let (line, field) = match &error.location {
            Some(ErrorLocation::Csv { line, column_name }) => {
                (Cell::new(line), Cell::new(column_name))
            }
            Some(ErrorLocation::Json { key_path }) => (dim_cell("-"), Cell::new(key_path)),
            None => (dim_cell("-"), dim_cell("-")),
        };
        let kind = if error.is_error() {
            Cell::new(error.error_type.as_str()).fg(Color::Red)
        } else {
            Cell::new(error.error_type.as_str()).fg(Color::Yellow)
        };
        table.add_row(vec![
            line,
            kind,
            Cell::new(error.code.as_str()),
            field,
            Cell::new(&error.message),
        ]);
    }
    align_column(&mut table, 0, CellAlignment::Right);
    println!("{table}");
    if errors.len() > MAX_LISTED_ERRORS {
        println!(
            "... {} more; write the full report with --errors",
            errors.len() - MAX_LISTED_ERRORS
        );
    }
}

fn print_schedule_summary(summary: &RunSummary) {
    println!("Scans: {}", summary.scans);
    if summary.submitted.is_empty() {
        println!("No queued files found.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Module"),
        header_cell("File"),
    ]);
    apply_table_style(&mut table);
    for (index, (module, file)) in summary.submitted.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(module).add_attribute(Attribute::Bold),
            Cell::new(file),
        ]);
    }
    align_column(&mut table, 0, CellAlignment::Right);
    println!("{table}");
}

fn print_identifiers(records: &[Identifier]) {
    if records.is_empty() {
        println!("No identifiers found.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("NACCID"),
        header_cell("ADCID"),
        header_cell("PTID"),
        header_cell("GUID"),
    ]);
    apply_table_style(&mut table);
    for record in records {
        table.add_row(vec![
            Cell::new(&record.naccid).add_attribute(Attribute::Bold),
            Cell::new(&record.adcid),
            Cell::new(&record.ptid),
            record
                .guid
                .as_ref()
                .map_or_else(|| dim_cell("-"), Cell::new),
        ]);
    }
    align_column(&mut table, 1, CellAlignment::Right);
    println!("{table}");
    println!("{} record(s)", records.len());
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_error_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(120)
        .set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Fixed(8)),
            ColumnConstraint::UpperBoundary(Width::Fixed(8)),
            ColumnConstraint::UpperBoundary(Width::Fixed(22)),
            ColumnConstraint::UpperBoundary(Width::Fixed(16)),
            ColumnConstraint::UpperBoundary(Width::Percentage(55)),
        ]);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
