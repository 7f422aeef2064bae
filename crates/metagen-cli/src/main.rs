//! metagen CLI
//!
//! Crosswalks an ESRI MapServer WSDL into a DCAT-US `data.json` record and a
//! markdown gap report, optionally asking an LLM to suggest the fields the
//! WSDL cannot supply.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod crosswalk;

const LOG_ENV: &str = "METAGEN_LOG";

#[derive(Parser)]
#[command(name = "metagen")]
#[command(
    author,
    version,
    about = "AI-assisted metadata generation for geospatial services"
)]
struct Cli {
    /// Log progress at info level (overridden by METAGEN_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an ESRI WSDL into a DCAT-US catalog record plus a gap report.
    Crosswalk(crosswalk::CrosswalkArgs),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (e.g. under a test harness) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Crosswalk(args) => crosswalk::cmd_crosswalk(&args),
    }
}
