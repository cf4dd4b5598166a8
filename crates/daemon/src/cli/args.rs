pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "hoard")]
#[command(about = "Content-addressable file hosting with size-based expiry")]
pub struct Args {
    /// Base URL of a running daemon (defaults to localhost on the configured port)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the hoard config directory (defaults to ~/.hoard)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
