//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mediasift",
    version,
    author = "neur0map",
    about = "Semantic search over local photo and video libraries",
    long_about = "mediasift embeds every photo and video under a directory with a CLIP model, \
                  keeps the vectors in a checkpointed local index, and ranks the library \
                  against free-text queries. Re-indexing only embeds new files."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/mediasift/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index new media files (Ctrl-C stops after a checkpoint)
    Index {
        /// Directory to index (defaults to indexing.media_dir)
        dir: Option<PathBuf>,

        /// Profile to use (e.g., "careful", "rescan")
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Search the index with a text query
    Search {
        /// Search query text
        query: String,

        /// Maximum number of results to rank before paging
        #[arg(short, long)]
        limit: Option<usize>,

        /// Page to show, starting at 1
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Results per page (defaults to search.per_page)
        #[arg(long)]
        per_page: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show index status
    Status {
        /// Show status in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
