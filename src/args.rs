use clap::{Parser, Subcommand};

use crate::config::{timeout_from_secs, ClientConfig};
use crate::error::ZoektError;

/// Zoekt code search CLI: search code, list indexed repositories and run
/// batches of queries against a Zoekt server.
#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = "A command-line client for the Zoekt code search JSON API, with filter helpers, highlighted results and concurrent batch searches."
)]
pub struct Args {
    /// Zoekt server hostname.
    #[clap(long, env = "ZOEKT_HOST", default_value = "localhost", global = true)]
    pub host: String,

    /// Zoekt server port.
    #[clap(long, env = "ZOEKT_PORT", default_value = "6070", global = true)]
    pub port: u16,

    /// Full server URL; overrides host and port.
    #[clap(long, env = "ZOEKT_URL", global = true)]
    pub url: Option<String>,

    /// Request timeout in seconds.
    #[clap(long, env = "ZOEKT_TIMEOUT", default_value = "10.0", global = true)]
    pub timeout: f64,

    /// Enable debug output.
    #[clap(long, global = true)]
    pub debug: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search code using Zoekt.
    Search {
        /// Zoekt query, e.g. `repo:myorg "error handling"`.
        query: String,

        /// Number of context lines around each match.
        #[clap(short, long, default_value = "3")]
        context: u32,

        /// Maximum number of files to display.
        #[clap(short = 'm', long, default_value = "20")]
        max_matches: u32,

        /// Output raw JSON.
        #[clap(long)]
        json: bool,

        /// Filter by language.
        #[clap(short, long)]
        language: Option<String>,

        /// Filter by file pattern.
        #[clap(short, long)]
        file: Option<String>,

        /// Filter by repository.
        #[clap(short, long)]
        repo: Option<String>,

        /// Enable case sensitivity.
        #[clap(long)]
        case_sensitive: bool,

        /// Columns per tab when rendering matched lines.
        #[clap(long, default_value = "4")]
        tab_size: usize,
    },

    /// List repositories matching a query.
    List {
        /// Repository query, e.g. `repo:myorg`. Lists everything when empty.
        #[clap(default_value = "")]
        query: String,

        /// Output raw JSON.
        #[clap(long)]
        json: bool,

        /// Print repository names only.
        #[clap(long)]
        minimal: bool,
    },

    /// Run several searches concurrently and append results to a JSON lines file.
    Batch {
        /// Queries to run.
        #[clap(short, long, num_args = 1.., required = true)]
        words: Vec<String>,

        /// Output file path for search results in JSON lines format.
        #[clap(short, long, default_value = "search_results.json")]
        output: String,

        /// Maximum number of concurrent searches.
        #[clap(short = 'c', long, default_value = "4")]
        concurrency: usize,
    },
}

impl Args {
    /// Client settings from the flags, resolved the same way as
    /// [`ClientConfig::from_env`].
    pub fn client_config(&self) -> Result<ClientConfig, ZoektError> {
        let config = ClientConfig::from_endpoint(self.url.as_deref(), &self.host, self.port);
        Ok(config.timeout(timeout_from_secs(self.timeout)?))
    }
}
