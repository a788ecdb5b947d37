mod commands;
mod config;
mod fetcher;
mod page;
mod progress;
mod utils;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

/// Download an InfoQ presentation (page, slides and video) for offline viewing.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL of the presentation to download
    #[arg(index = 1)]
    url: String,

    /// Directory to save downloaded presentations
    #[arg(short = 'd', long = "download-dir", default_value = "downloads")]
    download_dir: PathBuf,

    /// Bytes written and flushed per progress update
    #[arg(long = "chunk-size", default_value_t = 10 * 1024)]
    chunk_size: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config {
        download_dir: args.download_dir,
        chunk_size: args.chunk_size,
        ..Config::default()
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(commands::run(args.url, config))
}
