pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "bui")]
#[command(about = "Publish encrypted UI blocks as NFTs")]
#[command(version)]
pub struct Args {
    /// IPFS gateway used to fetch content that is not in the local store
    #[arg(long, global = true, default_value = "https://ipfs.io")]
    pub gateway: Url,

    /// Path to the bui config directory (defaults to ~/.bui)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
