pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "geo-etl")]
#[command(about = "Turns municipal CSV exports into GeoJSON and loads them into PostGIS")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "geo-etl.toml")]
    pub config: String,

    /// Run only the job with this name
    #[arg(short, long)]
    pub job: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log as JSON lines instead of the compact format
    #[arg(long)]
    pub json_logs: bool,
}
