//! Config subcommand handlers.

use tailquery_config::Settings;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// `config path`: the file that is (or would be) read.
pub fn print_path(global: &GlobalOpts) {
    let path = global
        .config_file
        .clone()
        .unwrap_or_else(tailquery_config::config_path);
    output::print_output(&path.display().to_string(), global.quiet);
}

/// `config show`: the merged settings, API key masked.
pub fn show(settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let rendered = match global.output {
        OutputFormat::Table => settings.to_toml()?,
        OutputFormat::Json => serde_json::to_string_pretty(&settings.redacted())?,
        OutputFormat::JsonCompact => serde_json::to_string(&settings.redacted())?,
    };
    output::print_output(rendered.trim_end(), global.quiet);
    Ok(())
}
