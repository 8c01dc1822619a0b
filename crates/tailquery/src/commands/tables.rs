//! `tables`: print table schemas. Needs no credentials.

use strum::IntoEnumIterator;

use tailquery_core::TableKind;

use crate::cli::{GlobalOpts, TablesArgs};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &TablesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let tables: Vec<TableKind> = match args.table {
        Some(kind) => vec![kind],
        None => TableKind::iter().collect(),
    };
    let rendered = output::render_schema(global.output, &tables)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
