use std::sync::Arc;

use futures::future::try_join_all;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ZoektError;
use crate::models::{RepositoryList, SearchResult};
use crate::options::{ListOptions, ListRequest, SearchOptions, SearchRequest};
use crate::query::QueryComponents;

/// Asynchronous client for a Zoekt server's JSON API.
#[derive(Debug, Clone)]
pub struct ZoektClient {
    client: Client,
    config: Arc<ClientConfig>,
}

impl ZoektClient {
    /// Create a new ZoektClient instance
    pub fn new(config: ClientConfig) -> Result<Self, ZoektError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|e| ZoektError::Config(e.to_string()))?;

        Ok(ZoektClient {
            client,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Search code, retrying connection failures and timeouts
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, ZoektError> {
        self.search_request(&SearchRequest::new(query, options.clone()))
            .await
    }

    pub async fn search_request(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchResult, ZoektError> {
        debug!("Search query: {}", request.query);
        let url = self.config.search_url();
        let attempts = self.config.max_retries.max(1);

        for attempt in 0..attempts {
            match self.post(&url, request, "Result").await {
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let delay = self.config.backoff_for(attempt);
                    warn!(
                        "Search attempt {} of {} failed: {}; retrying in {:?}",
                        attempt + 1,
                        attempts,
                        e,
                        delay
                    );
                    sleep(delay).await;
                }
                result => return result,
            }
        }

        Err(ZoektError::Connection(
            "Failed to connect to Zoekt server after retries".to_string(),
        ))
    }

    /// List repositories matching `query` (e.g. `repo:abc`); empty lists everything
    pub async fn list_repositories(
        &self,
        query: &str,
        options: Option<ListOptions>,
    ) -> Result<RepositoryList, ZoektError> {
        debug!("List repositories query: {}", query);
        let request = ListRequest {
            query: query.to_string(),
            options,
        };
        self.post(&self.config.list_url(), &request, "List").await
    }

    pub async fn search_by_language(
        &self,
        query: &str,
        language: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, ZoektError> {
        let mut components = QueryComponents::parse(query);
        components.set_language(language);
        self.search(&components.build(), options).await
    }

    pub async fn search_by_file_pattern(
        &self,
        query: &str,
        file_pattern: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, ZoektError> {
        let mut components = QueryComponents::parse(query);
        components.add_file_pattern(file_pattern);
        self.search(&components.build(), options).await
    }

    pub async fn search_by_repo(
        &self,
        query: &str,
        repo_pattern: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, ZoektError> {
        let mut components = QueryComponents::parse(query);
        components.add_repo_pattern(repo_pattern);
        self.search(&components.build(), options).await
    }

    pub async fn search_case_sensitive(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, ZoektError> {
        let mut components = QueryComponents::parse(query);
        components.set_case_sensitive();
        self.search(&components.build(), options).await
    }

    pub async fn search_symbols(
        &self,
        query: &str,
        symbol_type: Option<&str>,
        options: &SearchOptions,
    ) -> Result<SearchResult, ZoektError> {
        let mut components = QueryComponents::parse(query);
        components.set_symbol(symbol_type);
        self.search(&components.build(), options).await
    }

    pub async fn search_with_context(
        &self,
        query: &str,
        context_lines: u32,
        options: &SearchOptions,
    ) -> Result<SearchResult, ZoektError> {
        let options = options.clone().with_context_lines(context_lines);
        self.search(query, &options).await
    }

    /// Run several searches concurrently, at most `concurrency` at a time.
    ///
    /// Results come back in input order. The first failure fails the batch
    /// and no further queries are sent.
    pub async fn search_batch(
        &self,
        queries: &[String],
        options: &SearchOptions,
        concurrency: usize,
    ) -> Result<Vec<(String, SearchResult)>, ZoektError> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

        let tasks = queries.iter().map(|query| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| ZoektError::Connection(e.to_string()))?;
                match self.search(query, options).await {
                    Ok(result) => Ok((query.clone(), result)),
                    Err(e) => {
                        // Queued queries fail to acquire instead of being sent
                        semaphore.close();
                        Err(e)
                    }
                }
            }
        });

        try_join_all(tasks).await
    }

    async fn post<B, T>(&self, url: &str, body: &B, envelope: &str) -> Result<T, ZoektError>
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
            .await
            .map_err(|e| ZoektError::from_transport(e, self.config.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ZoektError::from_transport(e, self.config.timeout))?;
        decode_response(status, &text, envelope)
    }
}

/// Turn a response into `T`, unwrapping the `envelope` field when present.
///
/// Non-success statuses become [`ZoektError::Api`] carrying the body's
/// `Error` field, or the raw body.
pub(crate) fn decode_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    envelope: &str,
) -> Result<T, ZoektError> {
    if !status.is_success() {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("Error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    "Unknown error".to_string()
                } else {
                    body.to_string()
                }
            });
        return Err(ZoektError::Api {
            status_code: status.as_u16(),
            message,
        });
    }

    let mut value: Value = serde_json::from_str(body)?;
    let payload = value.get_mut(envelope).map(Value::take).unwrap_or(value);
    serde_json::from_value(payload)
        .map_err(|e| ZoektError::Parse(format!("unexpected {envelope} payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_envelope() {
        let result: SearchResult = decode_response(
            StatusCode::OK,
            r#"{"Result": {"Files": null, "MatchCount": 4}}"#,
            "Result",
        )
        .unwrap();
        assert_eq!(result.stats.match_count, 4);
    }

    #[test]
    fn accepts_bare_payload() {
        let list: RepositoryList =
            decode_response(StatusCode::OK, r#"{"Repos": [], "Crashes": 0}"#, "List").unwrap();
        assert!(list.repos.is_empty());
    }

    #[test]
    fn error_field_becomes_api_message() {
        let err = decode_response::<SearchResult>(
            StatusCode::BAD_REQUEST,
            r#"{"Error": "parse error: unbalanced ("}"#,
            "Result",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ZoektError::Api { status_code: 400, ref message } if message == "parse error: unbalanced ("
        ));
    }

    #[test]
    fn non_json_error_body_is_kept() {
        let err = decode_response::<SearchResult>(StatusCode::BAD_GATEWAY, "upstream down", "Result")
            .unwrap_err();
        assert!(matches!(err, ZoektError::Api { ref message, .. } if message == "upstream down"));

        let err = decode_response::<SearchResult>(StatusCode::BAD_GATEWAY, "", "Result").unwrap_err();
        assert!(matches!(err, ZoektError::Api { ref message, .. } if message == "Unknown error"));
    }

    #[test]
    fn malformed_payload_is_a_parse_error() {
        let err = decode_response::<SearchResult>(
            StatusCode::OK,
            r#"{"Result": {"Files": "nope"}}"#,
            "Result",
        )
        .unwrap_err();
        assert!(matches!(err, ZoektError::Parse(_)));

        let err = decode_response::<SearchResult>(StatusCode::OK, "<html>", "Result").unwrap_err();
        assert!(matches!(err, ZoektError::Parse(_)));
    }
}
