//! Request bodies and options for the search and list endpoints.

use std::time::Duration;

use serde::{Serialize, Serializer};

/// Durations go over the wire as integer nanoseconds.
fn serialize_nanos<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(duration) => {
            serializer.serialize_u64(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
        }
        None => serializer.serialize_none(),
    }
}

/// Search options. Unset fields are left to the server's defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate_doc_count: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whole: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_max_match_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_max_match_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_repo_max_match_count: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_nanos"
    )]
    pub max_wall_time: Option<Duration>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_nanos"
    )]
    pub flush_wall_time: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_doc_display_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_match_display_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_context_lines: Option<u32>,
    pub chunk_matches: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_document_ranks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ranks_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_score: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_match_count_per_file: Option<u32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            estimate_doc_count: None,
            whole: None,
            shard_max_match_count: None,
            total_max_match_count: None,
            shard_repo_max_match_count: None,
            max_wall_time: None,
            flush_wall_time: None,
            max_doc_display_count: None,
            max_match_display_count: None,
            num_context_lines: None,
            chunk_matches: true,
            use_document_ranks: None,
            document_ranks_weight: None,
            trace: None,
            debug_score: None,
            max_match_count_per_file: None,
        }
    }
}

impl SearchOptions {
    pub fn with_context_lines(mut self, lines: u32) -> Self {
        self.num_context_lines = Some(lines);
        self
    }

    pub fn with_max_doc_display_count(mut self, count: u32) -> Self {
        self.max_doc_display_count = Some(count);
        self
    }

    pub fn with_max_wall_time(mut self, limit: Duration) -> Self {
        self.max_wall_time = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListOptionsField {
    #[default]
    Full,
    ReposMap,
}

impl ListOptionsField {
    pub const fn code(self) -> u8 {
        match self {
            ListOptionsField::Full => 0,
            ListOptionsField::ReposMap => 2,
        }
    }
}

impl Serialize for ListOptionsField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListOptions {
    pub field: ListOptionsField,
}

/// Body of `POST /api/search`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    #[serde(rename = "Q")]
    pub query: String,
    #[serde(rename = "RepoIDs", skip_serializing_if = "Option::is_none")]
    pub repo_ids: Option<Vec<u32>>,
    #[serde(rename = "Opts")]
    pub options: SearchOptions,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, options: SearchOptions) -> Self {
        Self {
            query: query.into(),
            repo_ids: None,
            options,
        }
    }

    pub fn with_repo_ids(mut self, repo_ids: Vec<u32>) -> Self {
        self.repo_ids = Some(repo_ids);
        self
    }
}

/// Body of `POST /api/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRequest {
    #[serde(rename = "Q")]
    pub query: String,
    #[serde(rename = "Opts", skip_serializing_if = "Option::is_none")]
    pub options: Option<ListOptions>,
}
