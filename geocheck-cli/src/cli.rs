use clap::Parser;
use std::path::PathBuf;

/// Verify a geocoding service against known-good and deliberately invalid records
#[derive(Parser, Debug)]
#[command(name = "geocheck")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Checks forward and reverse geocoding lookups of a Nominatim-compatible service", long_about = None)]
pub struct Args {
    /// Base URL of the geocoding service [default: public Nominatim]
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Directory the record tables are regenerated into [default: geocheck-data]
    #[arg(short = 'd', long = "data-dir", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Do not scrape landmarks (landmark table stays empty)
    #[arg(long = "no-landmarks")]
    pub no_landmarks: bool,

    /// Page landmark names and coordinates are scraped from
    #[arg(long = "landmarks-url", value_name = "URL")]
    pub landmarks_url: Option<String>,

    /// Seed for the probe generators (random when omitted)
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Boundary coordinate pairs per generation mode
    #[arg(long = "probes")]
    pub probes: Option<usize>,

    /// Number of garbage free-text queries
    #[arg(long = "garbage")]
    pub garbage: Option<usize>,

    /// Tolerance for structured forward lookups, in degrees
    #[arg(long = "structured-tolerance")]
    pub structured_tolerance: Option<f64>,

    /// Tolerance for free-text forward lookups, in degrees
    #[arg(long = "free-text-tolerance")]
    pub free_text_tolerance: Option<f64>,

    /// Minimum milliseconds between requests
    #[arg(long = "interval-ms")]
    pub interval_ms: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long = "timeout")]
    pub timeout_secs: Option<u64>,

    /// Print the full report as JSON on stdout
    #[arg(long = "json")]
    pub json: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Parses command-line arguments
pub fn parse_args() -> Args {
    Args::parse()
}
