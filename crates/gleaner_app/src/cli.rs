use std::path::PathBuf;

use clap::Parser;

use crate::logging::LogDestination;

/// Download gallery images from a forum page.
#[derive(Debug, Parser)]
#[command(name = "gleaner", version, about)]
pub struct Cli {
    /// Target page URL.
    #[arg(long)]
    pub url: String,

    /// Directory images and the run report are written to.
    #[arg(long, default_value = "./images")]
    pub output_dir: PathBuf,

    /// Proxy server: host:port, scheme://host:port, or [ipv6]:port.
    #[arg(long)]
    pub proxy: Option<String>,

    /// Concurrent download workers.
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// Cap on images attempted per run.
    #[arg(long, default_value_t = 50)]
    pub max_images: usize,

    /// Attempts per image before giving up.
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 15)]
    pub timeout_secs: u64,

    /// Smallest file size accepted, in bytes.
    #[arg(long, default_value_t = 4096)]
    pub min_bytes: u64,

    /// Minimum image width; 0 disables the dimension check.
    #[arg(long, default_value_t = 0)]
    pub min_width: u32,

    /// Minimum image height; 0 disables the dimension check.
    #[arg(long, default_value_t = 0)]
    pub min_height: u32,

    /// Lower bound of the politeness delay, in seconds.
    #[arg(long, default_value_t = 0.5)]
    pub delay_min: f64,

    /// Upper bound of the politeness delay, in seconds.
    #[arg(long, default_value_t = 1.5)]
    pub delay_max: f64,

    /// Where log output goes.
    #[arg(long, value_enum, default_value_t = LogDestination::Terminal)]
    pub log: LogDestination,

    /// RON file overriding filter and fetch defaults.
    #[arg(long)]
    pub options: Option<PathBuf>,
}
