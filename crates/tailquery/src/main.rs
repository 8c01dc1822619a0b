mod cli;
mod commands;
mod error;
mod output;
mod server;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ConfigArgs, ConfigCommand};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    // Neither schemas nor the config location depend on loaded settings.
    match cli.command {
        Command::Tables(ref args) => return commands::tables::handle(args, &cli.global),
        Command::Config(ConfigArgs {
            command: ConfigCommand::Path,
        }) => {
            commands::config_cmd::print_path(&cli.global);
            return Ok(());
        }
        _ => {}
    }

    let settings = tailquery_config::load(cli.global.config_file.as_deref(), &cli.overrides())?;
    tracing::debug!(command = ?cli.command, "dispatching command");

    match cli.command {
        Command::Config(_) => commands::config_cmd::show(&settings, &cli.global),
        Command::Query(ref args) => commands::query::handle(args, &settings, &cli.global).await,
        Command::Serve(_) => commands::serve::handle(&settings).await,
        Command::Tables(_) => Ok(()),
    }
}
