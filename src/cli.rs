//! Command-line interface definitions for newscast.
//!
//! Secrets can be provided via command-line flags or environment variables;
//! everything else lives in the YAML configuration file.

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for one newscast run.
///
/// # Examples
///
/// ```sh
/// # Normal run against the configured wiki
/// newscast --config newscast.yaml
///
/// # Render everything but write nothing
/// newscast --dry-run
///
/// # Re-classify two articles that were misread
/// newscast --force 12345 --force 12346
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "newscast.yaml")]
    pub config: PathBuf,

    /// Log rendered documents instead of writing them; the ledger is not advanced
    #[arg(long)]
    pub dry_run: bool,

    /// Article ids to classify again even if they are already known
    #[arg(long, value_name = "ID", num_args = 1..)]
    pub force: Vec<String>,

    /// Skip fetching new articles and only update documents
    #[arg(long)]
    pub skip_ingest: bool,

    /// Publisher API key
    #[arg(long, env = "NEXON_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Wiki bot username
    #[arg(long, env = "WIKI_USERNAME")]
    pub wiki_username: Option<String>,

    /// Wiki bot password
    #[arg(long, env = "WIKI_PASSWORD", hide_env_values = true)]
    pub wiki_password: Option<String>,
}
