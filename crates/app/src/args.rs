pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "arfs")]
#[command(about = "Write and read encrypted ArFS drives, folders and files")]
pub struct Args {
    /// Path to the arfs config directory (defaults to ~/.arfs)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
