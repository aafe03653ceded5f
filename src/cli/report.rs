use std::io::Write;

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::{FilterArgs, ReportFormat, Session};
use crate::error::Result;
use crate::reports::{run_report, Report, ReportOutput};
use crate::table::Value;

pub fn run(db: Option<&str>, key: &str, filters: &FilterArgs, format: ReportFormat) -> Result<()> {
    let report: Report = key.parse()?;
    let session = Session::open(db)?;
    let ctx = filters.to_context(&session.catalog, &session.settings)?;
    let out = run_report(&session.conn, report, &ctx)?;

    match format {
        ReportFormat::Csv => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&out.csv()?.bytes)?;
            stdout.flush()?;
        }
        ReportFormat::Table => {
            println!("{}", report.title().bold());
            println!("{}", report.describe_filters(&ctx, &session.catalog).dimmed());
            if out.table.is_empty() {
                println!("{}", "No rows.".yellow());
            } else {
                println!("{}", render(&out));
                println!("{} rows", out.table.len());
            }
        }
    }
    Ok(())
}

/// Terminal table with numbers right-aligned.
pub(crate) fn render(out: &ReportOutput) -> Table {
    let mut table = Table::new();
    table.set_header(out.table.columns());
    for row in out.table.rows() {
        table.add_row(row.iter().map(|value| {
            let cell = Cell::new(value.to_string());
            match value {
                Value::Integer(_) | Value::Real(_) => cell.set_alignment(CellAlignment::Right),
                _ => cell,
            }
        }));
    }
    table
}
