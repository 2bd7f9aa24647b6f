//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pagebridge content data bridge CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Config file name (default: pagebridge.toml)
    #[arg(short = 'C', long, default_value = "pagebridge.toml")]
    pub config: PathBuf,

    /// Cache file path (overrides config)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run one transform pass over the content input file
    Transform {
        /// Content objects JSON file produced by the fetch stage
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Transform, then watch the input file and notify live clients on change
    Serve {
        /// Content objects JSON file produced by the fetch stage
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Live update socket port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List page paths from the cache file
    Paths,

    /// Print merged props for a page path
    Props {
        /// Request path (leading slash optional)
        path: String,
    },
}
