//! `query`: one full scan of a table, printed and discarded.

use tracing::debug;

use tailquery_config::Settings;
use tailquery_core::{QueryContext, TailnetService, generate};

use crate::cli::{GlobalOpts, QueryArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: &QueryArgs, settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let service = TailnetService::from_config(&settings.service_config()?)?;

    let rows = generate(&service, args.table, &QueryContext::default()).await?;
    debug!(table = args.table.name(), rows = rows.len(), "scan complete");

    let rendered = output::render_rows(global.output, args.table.columns(), &rows)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
