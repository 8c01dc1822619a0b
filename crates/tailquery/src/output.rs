//! Output formatting: table or JSON.
//!
//! Table output uses `tabled`; rows have a dynamic column set, so they go
//! through `tabled::builder::Builder`. JSON output serializes rows as-is.

use std::io::{self, Write};

use tabled::builder::Builder;
use tabled::{Table, Tabled, settings::Style};

use tailquery_core::{ColumnDefinition, Row, TableKind};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Render generated rows, columns in schema order.
pub fn render_rows(
    format: OutputFormat,
    columns: &[ColumnDefinition],
    rows: &[Row],
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(columns.iter().map(|c| c.name));
            for row in rows {
                builder.push_record(
                    columns
                        .iter()
                        .map(|c| row.get(c.name).map_or("", String::as_str)),
                );
            }
            Ok(builder.build().with(Style::rounded()).to_string())
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(rows)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(rows)?),
    }
}

#[derive(Debug, Tabled, serde::Serialize)]
struct SchemaRow {
    #[tabled(rename = "Table")]
    table: &'static str,
    #[tabled(rename = "Column")]
    column: &'static str,
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    column_type: String,
}

/// Render the schema of the given tables.
pub fn render_schema(format: OutputFormat, tables: &[TableKind]) -> Result<String, CliError> {
    let rows: Vec<SchemaRow> = tables
        .iter()
        .flat_map(|kind| {
            kind.columns().iter().map(|c| SchemaRow {
                table: kind.name(),
                column: c.name,
                column_type: c.column_type.to_string(),
            })
        })
        .collect();

    match format {
        OutputFormat::Table => Ok(Table::new(&rows).with(Style::rounded()).to_string()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&rows)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(&rows)?),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}
