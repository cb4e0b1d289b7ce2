use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "camscout")]
#[command(version)]
#[command(about = "Find RTSP cameras on a network and the stream paths they serve", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sweep targets for RTSP ports and enumerate stream paths on every open one
    Scan(ScanArgs),

    /// Interrogate a single RTSP endpoint with OPTIONS, optionally walking a playback
    Probe(ProbeArgs),

    /// Validate and split an rtsp:// URL, optionally checking that it plays
    CheckUrl(CheckUrlArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Targets: IP, CIDR, range or hostname, comma separated. Defaults to the local /24
    #[arg(short = 't', long)]
    pub targets: Option<String>,

    /// Ports to sweep. Examples: 554,8554 or 550-560. Defaults to the common RTSP ports
    #[arg(short = 'P', long)]
    pub ports: Option<String>,

    /// Tuning preset: default, fast, gentle
    #[arg(long, default_value = "default", value_parser = ["default", "fast", "gentle"])]
    pub preset: String,

    /// Connect timeout in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// RTSP response timeout in milliseconds
    #[arg(long)]
    pub rtsp_timeout: Option<u64>,

    /// Concurrent connect probes
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Concurrent RTSP path probes
    #[arg(long)]
    pub channel_workers: Option<usize>,

    /// Upper bound on dispatches per second
    #[arg(short = 'r', long)]
    pub rate_limit: Option<u32>,

    /// Path discovery mode: quick, full, numbered
    #[arg(short, long, default_value = "full", value_parser = ["quick", "full", "numbered"])]
    pub mode: String,

    /// Highest channel number tried in numbered mode
    #[arg(long)]
    pub channels_max: Option<u32>,

    /// Username sent with every DESCRIBE
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password sent with every DESCRIBE
    #[arg(short, long)]
    pub password: Option<String>,

    /// Try common factory credentials on paths that demand authentication
    #[arg(long)]
    pub brute: bool,

    /// JSON file replacing the built-in path catalog
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Confirm working streams with ffprobe
    #[arg(long)]
    pub check: bool,

    /// Stop after the port sweep
    #[arg(long)]
    pub skip_channels: bool,

    /// Output format: text, json, csv
    #[arg(short, long, default_value = "text", value_parser = ["text", "json", "csv"])]
    pub output_format: String,

    /// Write results to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Host to interrogate
    pub host: String,

    #[arg(long, default_value = "554")]
    pub port: u16,

    /// Also walk DESCRIBE/SETUP/PLAY on this path
    #[arg(long)]
    pub path: Option<String>,

    #[arg(short, long)]
    pub username: Option<String>,

    #[arg(short, long)]
    pub password: Option<String>,

    /// RTSP response timeout in milliseconds
    #[arg(long, default_value = "5000")]
    pub timeout: u64,
}

#[derive(Args, Debug, Clone)]
pub struct CheckUrlArgs {
    pub url: String,

    /// Connect and verify that the stream plays
    #[arg(long)]
    pub play: bool,

    /// RTSP response timeout in milliseconds
    #[arg(long, default_value = "5000")]
    pub timeout: u64,
}
