use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "denial-explorer")]
#[command(about = "Denial Explorer backend (claims ingest + dashboard API)", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a claims export and write the denial report as JSON.
    Analyze(AnalyzeArgs),
    /// Serve the dashboard page and the upload/analyze HTTP API.
    Serve(ServeArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Claims export to analyze (.csv or .xlsx).
    #[arg(long)]
    pub input: String,

    /// How many buckets to keep in each ranked table (and per heatmap axis).
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Write the JSON report here instead of stdout.
    #[arg(long)]
    pub output: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8787)]
    pub port: u16,

    /// How many buckets to keep in each ranked table (and per heatmap axis).
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Reject uploads larger than this many MiB.
    #[arg(long, default_value_t = 32)]
    pub max_upload_mb: usize,
}
