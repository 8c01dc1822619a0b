//! Clap derive structures for the `tailquery` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use tailquery_config::{Overrides, TailscaleOverrides};
use tailquery_core::TableKind;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tailquery -- a Tailscale tailnet as osquery-style tables
#[derive(Debug, Parser)]
#[command(
    name = "tailquery",
    version,
    about = "Expose a Tailscale tailnet as SQL tables",
    long_about = "Serves tailscale_devices, tailscale_users, tailscale_tags and\n\
        tailscale_device_tags to a query host over a local socket, or runs a\n\
        single table scan from the command line.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long = "config", env = "TAILQUERY_CONFIG", global = true)]
    pub config_file: Option<PathBuf>,

    /// Tailnet name ("-" for the tailnet owning the API key)
    #[arg(long, global = true)]
    pub tailnet: Option<String>,

    /// Tailscale API base URL
    #[arg(long, global = true, hide = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TAILQUERY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the tables to a query host over a Unix socket
    Serve(ServeArgs),

    /// Scan one table and print its rows
    #[command(alias = "q")]
    Query(QueryArgs),

    /// List tables and their columns
    Tables(TablesArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Extension socket path
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// Seconds to wait for a response (0 = no limit)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Seconds between socket keep-alive checks
    #[arg(long)]
    pub interval: Option<u64>,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Table to scan
    #[arg(value_parser = parse_table)]
    pub table: TableKind,
}

#[derive(Debug, Args)]
pub struct TablesArgs {
    /// Show only this table
    #[arg(value_parser = parse_table)]
    pub table: Option<TableKind>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,
    /// Print the merged configuration (API key masked)
    Show,
}

fn parse_table(name: &str) -> Result<TableKind, String> {
    TableKind::from_name(name).map_err(|e| e.to_string())
}

impl Cli {
    /// Command-line values as the topmost configuration layer.
    pub fn overrides(&self) -> Overrides {
        let mut overrides = Overrides {
            tailscale: TailscaleOverrides {
                tailnet: self.global.tailnet.clone(),
                api_url: self.global.api_url.clone(),
            },
            ..Overrides::default()
        };
        if let Command::Serve(ref args) = self.command {
            overrides.socket.clone_from(&args.socket);
            overrides.timeout = args.timeout;
            overrides.interval = args.interval;
        }
        overrides
    }
}
