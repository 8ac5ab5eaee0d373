//! Response models for the Zoekt `/api/search` and `/api/list` endpoints.
//!
//! Field names follow the server's PascalCase JSON. Collections the server
//! may send as `null` decode as empty.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ZoektError;
use crate::url_template::{evaluate_file_url_template, evaluate_repo_url_template};

/// Decode base64 match content, replacing invalid UTF-8.
pub fn decode_base64(content: &str) -> Result<String, ZoektError> {
    let bytes = STANDARD.decode(content)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamps with an offset, or naive ones taken as UTC.
fn parse_timestamp<E: serde::de::Error>(raw: &str) -> Result<DateTime<Utc>, E> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| E::custom(format!("invalid timestamp {raw:?}: {e}")))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.is_empty() => parse_timestamp(&raw).map(Some),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Position {
    pub byte_offset: u32,
    pub line_number: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Symbol {
    #[serde(default)]
    pub sym: String,
    pub kind: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub parent_kind: Option<String>,
}

/// One matched span inside a [`LineMatch`]; offsets are in bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineFragmentMatch {
    #[serde(default)]
    pub line_offset: usize,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub match_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineMatch {
    pub line_number: u32,
    /// Base64-encoded line content.
    pub line: String,
    #[serde(default)]
    pub before: Option<Vec<String>>,
    #[serde(default)]
    pub after: Option<Vec<String>>,
    #[serde(default)]
    pub file_name: bool,
    #[serde(default)]
    pub score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub line_fragments: Vec<LineFragmentMatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedContext {
    pub before: Vec<String>,
    pub after: Vec<String>,
}

impl LineMatch {
    pub fn decoded_line(&self) -> Result<String, ZoektError> {
        decode_base64(&self.line)
    }

    pub fn decoded_context(&self) -> Result<DecodedContext, ZoektError> {
        let decode_all = |lines: &Option<Vec<String>>| -> Result<Vec<String>, ZoektError> {
            lines
                .iter()
                .flatten()
                .map(|line| decode_base64(line))
                .collect()
        };
        Ok(DecodedContext {
            before: decode_all(&self.before)?,
            after: decode_all(&self.after)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChunkMatch {
    /// Base64-encoded chunk content, whole lines.
    pub content: String,
    pub content_start: Position,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ranges: Vec<Range>,
    #[serde(default)]
    pub symbol_info: Option<Vec<Option<Symbol>>>,
    #[serde(default)]
    pub file_name: bool,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub debug_score: Option<String>,
    #[serde(default)]
    pub best_line_match: Option<u32>,
}

impl ChunkMatch {
    pub fn decoded_content(&self) -> Result<String, ZoektError> {
        decode_base64(&self.content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileMatch {
    pub file_name: String,
    pub repository: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub branches: Vec<String>,
    #[serde(default)]
    pub line_matches: Option<Vec<LineMatch>>,
    #[serde(default)]
    pub chunk_matches: Option<Vec<ChunkMatch>>,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub debug: Option<String>,
}

impl FileMatch {
    /// The line a link to this file should point at: the best line of the
    /// first chunk, else the first line match.
    pub fn first_line_number(&self) -> Option<u32> {
        let chunk_line = self.chunk_matches.as_ref().and_then(|chunks| {
            chunks
                .first()
                .map(|c| c.best_line_match.unwrap_or(c.content_start.line_number))
        });
        chunk_line.or_else(|| {
            self.line_matches
                .as_ref()
                .and_then(|lines| lines.first())
                .map(|l| l.line_number)
        })
    }
}

/// Search statistics, sent inline with the result fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SearchStats {
    pub content_bytes_loaded: i64,
    pub index_bytes_loaded: i64,
    pub crashes: i64,
    /// Nanoseconds.
    pub duration: i64,
    pub file_count: i64,
    pub shard_files_considered: i64,
    pub files_considered: i64,
    pub files_loaded: i64,
    pub files_skipped: i64,
    pub shards_scanned: i64,
    pub shards_skipped: i64,
    pub shards_skipped_filter: i64,
    pub match_count: i64,
    pub ngram_matches: i64,
    pub ngram_lookups: i64,
    pub wait: i64,
    pub match_tree_construction: i64,
    pub match_tree_search: i64,
    pub regexps_considered: i64,
    pub flush_reason: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: Vec<FileMatch>,
    /// File URL templates keyed by repository name.
    #[serde(rename = "RepoURLs", default, deserialize_with = "null_as_default")]
    pub repo_urls: HashMap<String, String>,
    /// Line fragment templates keyed by repository name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub line_fragments: HashMap<String, String>,
    #[serde(flatten)]
    pub stats: SearchStats,
}

impl SearchResult {
    /// Link to `file`, at `line_number` when the repository has a line fragment template.
    pub fn file_url(&self, file: &FileMatch, line_number: Option<u32>) -> Option<String> {
        let template = self.repo_urls.get(&file.repository)?;
        let fragment = self.line_fragments.get(&file.repository).map(String::as_str);
        Some(evaluate_file_url_template(
            template,
            &file.version,
            &file.file_name,
            fragment,
            line_number,
        ))
    }

    pub fn repo_url(&self, repository: &str) -> Option<String> {
        let url = evaluate_repo_url_template(self.repo_urls.get(repository)?);
        (!url.is_empty()).then_some(url)
    }
}

/// A branch entry; older servers send bare names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RepositoryBranch {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BranchRepr {
    Name(String),
    Full(RepositoryBranch),
}

fn deserialize_branches<'de, D>(deserializer: D) -> Result<Vec<RepositoryBranch>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<BranchRepr>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|branch| match branch {
            BranchRepr::Name(name) => RepositoryBranch {
                name,
                version: String::new(),
            },
            BranchRepr::Full(full) => full,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Repository {
    #[serde(rename = "TenantID", default)]
    pub tenant_id: i64,
    #[serde(rename = "ID", default)]
    pub id: u32,
    pub name: String,
    #[serde(rename = "URL", default)]
    pub url: String,
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub source: String,
    #[serde(default, deserialize_with = "deserialize_branches")]
    pub branches: Vec<RepositoryBranch>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sub_repo_map: HashMap<String, serde_json::Value>,
    #[serde(rename = "CommitURLTemplate", default)]
    pub commit_url_template: String,
    #[serde(rename = "FileURLTemplate", default)]
    pub file_url_template: String,
    #[serde(default)]
    pub line_fragment_template: String,
    #[serde(default)]
    pub raw_config: Option<HashMap<String, String>>,
    #[serde(default)]
    pub rank: f64,
    #[serde(default)]
    pub index_options: String,
    #[serde(default)]
    pub has_symbols: bool,
    #[serde(default)]
    pub tombstone: bool,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub latest_commit_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexMetadata {
    #[serde(default)]
    pub index_format_version: i64,
    #[serde(default)]
    pub index_feature_version: i64,
    #[serde(default)]
    pub index_min_reader_version: i64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub index_time: DateTime<Utc>,
    #[serde(rename = "PlainASCII", default)]
    pub plain_ascii: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language_map: HashMap<String, u32>,
    #[serde(default)]
    pub zoekt_version: String,
    #[serde(rename = "ID", default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RepositoryStats {
    pub repos: i64,
    pub shards: i64,
    pub documents: i64,
    pub index_bytes: i64,
    pub content_bytes: i64,
    pub new_lines_count: i64,
    pub default_branch_new_lines_count: i64,
    pub other_branches_new_lines_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RepositoryInfo {
    pub repository: Repository,
    pub index_metadata: IndexMetadata,
    #[serde(default)]
    pub stats: RepositoryStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RepositoryList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub repos: Vec<RepositoryInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub repos_map: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub crashes: i64,
    #[serde(default)]
    pub stats: RepositoryStats,
}
