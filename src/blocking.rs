//! Blocking counterpart of [`crate::ZoektClient`].

use std::thread;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::client::decode_response;
use crate::config::ClientConfig;
use crate::error::ZoektError;
use crate::models::{RepositoryList, SearchResult};
use crate::options::{ListOptions, ListRequest, SearchOptions, SearchRequest};
use crate::query::QueryComponents;

/// Must not be created or dropped inside an async runtime.
#[derive(Debug, Clone)]
pub struct BlockingZoektClient {
    client: Client,
    config: ClientConfig,
}

impl BlockingZoektClient {
    pub fn new(config: ClientConfig) -> Result<Self, ZoektError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|e| ZoektError::Config(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResult, ZoektError> {
        self.search_request(&SearchRequest::new(query, options.clone()))
    }

    /// Send a search, sleeping between attempts on connection failures and timeouts.
    pub fn search_request(&self, request: &SearchRequest) -> Result<SearchResult, ZoektError> {
        debug!("Search query: {}", request.query);
        let url = self.config.search_url();
        let attempts = self.config.max_retries.max(1);

        for attempt in 0..attempts {
            match self.post(&url, request, "Result") {
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let delay = self.config.backoff_for(attempt);
                    warn!(
                        "Search attempt {} of {} failed: {}; retrying in {:?}",
                        attempt + 1,
                        attempts,
                        e,
                        delay
                    );
                    thread::sleep(delay);
                }
                result => return result,
            }
        }

        Err(ZoektError::Connection(
            "Failed to connect to Zoekt server after retries".to_string(),
        ))
    }

    pub fn list_repositories(
        &self,
        query: &str,
        options: Option<ListOptions>,
    ) -> Result<RepositoryList, ZoektError> {
        debug!("List repositories query: {}", query);
        let request = ListRequest {
            query: query.to_string(),
            options,
        };
        self.post(&self.config.list_url(), &request, "List")
    }

    pub fn search_by_language(
        &self,
        query: &str,
        language: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, ZoektError> {
        let mut components = QueryComponents::parse(query);
        components.set_language(language);
        self.search(&components.build(), options)
    }

    pub fn search_by_file_pattern(
        &self,
        query: &str,
        file_pattern: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, ZoektError> {
        let mut components = QueryComponents::parse(query);
        components.add_file_pattern(file_pattern);
        self.search(&components.build(), options)
    }

    pub fn search_by_repo(
        &self,
        query: &str,
        repo_pattern: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, ZoektError> {
        let mut components = QueryComponents::parse(query);
        components.add_repo_pattern(repo_pattern);
        self.search(&components.build(), options)
    }

    pub fn search_case_sensitive(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, ZoektError> {
        let mut components = QueryComponents::parse(query);
        components.set_case_sensitive();
        self.search(&components.build(), options)
    }

    pub fn search_symbols(
        &self,
        query: &str,
        symbol_type: Option<&str>,
        options: &SearchOptions,
    ) -> Result<SearchResult, ZoektError> {
        let mut components = QueryComponents::parse(query);
        components.set_symbol(symbol_type);
        self.search(&components.build(), options)
    }

    pub fn search_with_context(
        &self,
        query: &str,
        context_lines: u32,
        options: &SearchOptions,
    ) -> Result<SearchResult, ZoektError> {
        self.search(query, &options.clone().with_context_lines(context_lines))
    }

    /// Searches one query after another; see [`crate::ZoektClient::search_batch`]
    /// for the concurrent version.
    pub fn search_batch(
        &self,
        queries: &[String],
        options: &SearchOptions,
    ) -> Result<Vec<(String, SearchResult)>, ZoektError> {
        queries
            .iter()
            .map(|query| Ok((query.clone(), self.search(query, options)?)))
            .collect()
    }

    fn post<B, T>(&self, url: &str, body: &B, envelope: &str) -> Result<T, ZoektError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("Requesting URL: {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|e| ZoektError::from_transport(e, self.config.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| ZoektError::from_transport(e, self.config.timeout))?;
        decode_response(status, &text, envelope)
    }
}
