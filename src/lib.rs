//! # Zoekt Client
//!
//! A Rust library for querying a Zoekt code search server: structured
//! search and repository listing over its JSON API, typed results, and
//! helpers for building filtered queries and rendering matches.
//!
//! ## Main Components
//!
//! - [`ZoektClient`] / [`BlockingZoektClient`]: HTTP clients with retries
//! - [`QueryComponents`]: parse, edit and rebuild `key:value` filter queries
//! - [`evaluate_file_url_template`]: turn a result's URL templates into links
//! - [`adjust_offset_for_tabs`]: map match columns onto tab-expanded lines
//! - [`BatchRunner`]: concurrent searches with progress display
//!
//! ## Example
//!
//! ```no_run
//! use zoekt_client::{ClientConfig, QueryComponents, SearchOptions, ZoektClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let client = ZoektClient::new(ClientConfig::new("localhost", 6070))?;
//!
//!     // Narrow a user query down to Rust files in one organisation
//!     let mut query = QueryComponents::parse("\"error handling\" -repo:archive");
//!     query.set_language("rust");
//!     query.add_repo_pattern("myorg/");
//!
//!     let result = client.search(&query.build(), &SearchOptions::default()).await?;
//!     for file in &result.files {
//!         println!("{}/{}", file.repository, file.file_name);
//!         if let Some(url) = result.file_url(file, file.first_line_number()) {
//!             println!("  {url}");
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

mod args;
mod batch;
mod blocking;
mod client;
mod config;
mod error;
pub mod highlight;
pub mod models;
mod options;
mod query;
pub mod render;
mod url_template;

// Re-export main components for documentation and external use
pub use crate::args::{Args, Command};
pub use crate::batch::BatchRunner;
pub use crate::blocking::BlockingZoektClient;
pub use crate::client::ZoektClient;
pub use crate::config::{ClientConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use crate::error::ZoektError;
pub use crate::highlight::{adjust_offset_for_tabs, DEFAULT_TAB_SIZE};
pub use crate::models::{
    decode_base64, ChunkMatch, FileMatch, LineMatch, Position, Range, RepositoryInfo,
    RepositoryList, SearchResult,
};
pub use crate::options::{ListOptions, ListOptionsField, ListRequest, SearchOptions, SearchRequest};
pub use crate::query::{build_query, parse_query_components, FilterValue, QueryComponents};
pub use crate::url_template::{
    evaluate_file_url_template, evaluate_repo_url_template, TemplateArg, UrlTemplate,
};
