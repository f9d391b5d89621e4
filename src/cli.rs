use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "s3r")]
#[command(about = "Restore versioned S3 objects to a point in time", long_about = None)]
pub struct Cli {
    /// Path to a JSON configuration file. Defaults to ./s3r.json when present.
    #[arg(long, global = true, env = "S3R_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Restore bucket objects
    Restore(RestoreArgs),
    /// List object versions. Not implemented
    List(ListArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RestoreArgs {
    /// Source bucket.
    #[arg(long)]
    pub bucket: String,

    /// Restore point in time in UNIX timestamp format (seconds).
    #[arg(long, allow_hyphen_values = true)]
    pub timestamp: String,

    /// Object prefix.
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Region override.
    #[arg(long)]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible storage.
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Number of copy operations kept in flight.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Keep restoring the remaining objects after a copy fails.
    #[arg(long)]
    pub keep_going: bool,

    /// Attempts per storage request, including the first.
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    #[arg(long, default_value = "")]
    pub since: String,
}
