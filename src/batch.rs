use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::try_join_all;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Duration;
use tracing::{error, info};

use crate::client::ZoektClient;
use crate::error::ZoektError;
use crate::models::SearchResult;
use crate::options::SearchOptions;

#[derive(Serialize)]
struct BatchLine<'a> {
    query: &'a str,
    result: &'a SearchResult,
}

/// Runs many searches concurrently and appends each result as one JSON line
/// (`{"query": ..., "result": ...}`) to an output file.
pub struct BatchRunner {
    client: ZoektClient,
    output_path: PathBuf,
    options: SearchOptions,
    progress: Arc<MultiProgress>,
    concurrency: usize,
}

impl BatchRunner {
    pub fn new(client: ZoektClient, output_path: impl Into<PathBuf>, concurrency: usize) -> Self {
        BatchRunner {
            client,
            output_path: output_path.into(),
            options: SearchOptions::default(),
            progress: Arc::new(MultiProgress::new()),
            concurrency: concurrency.max(1),
        }
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    /// Suppress the spinners, e.g. when stderr is not a terminal.
    pub fn hidden(self) -> Self {
        self.progress.set_draw_target(ProgressDrawTarget::hidden());
        self
    }

    /// Run all searches with concurrency control
    pub async fn run(&self, queries: Vec<String>) -> Result<Vec<(String, SearchResult)>, ZoektError> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let file = Arc::new(Mutex::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.output_path)
                .await?,
        ));

        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

        // One spinner per distinct query, created upfront so they keep their order
        let mut progress_bars: HashMap<&str, ProgressBar> = HashMap::new();
        for query in &queries {
            progress_bars.entry(query.as_str()).or_insert_with(|| {
                let pb = self.progress.add(ProgressBar::new_spinner());
                pb.set_style(spinner_style.clone());
                pb.set_message(format!("Waiting to search for '{}'", query));
                pb
            });
        }

        let mut tasks = Vec::new();
        for query in &queries {
            let query = query.clone();
            let semaphore = semaphore.clone();
            let client = self.client.clone();
            let options = self.options.clone();
            let file = file.clone();
            let pb = progress_bars
                .get(query.as_str())
                .cloned()
                .unwrap_or_else(ProgressBar::hidden);
            pb.enable_steady_tick(Duration::from_millis(80));

            tasks.push(tokio::spawn(async move {
                // A closed semaphore means another search failed; skip this one
                let Ok(_permit) = semaphore.acquire().await else {
                    pb.finish_with_message(format!("- Skipped '{}'", query));
                    return Ok(None);
                };

                pb.set_message(format!("Searching '{}'", query));
                let outcome = Self::search_one(&client, &query, &options, &file).await;

                match &outcome {
                    Ok(result) => pb.finish_with_message(format!(
                        "✓ '{}': {} matches in {} files",
                        query, result.stats.match_count, result.stats.file_count
                    )),
                    Err(_) => {
                        semaphore.close();
                        pb.finish_with_message(format!("✗ Failed '{}'", query));
                    }
                }
                outcome.map(|result| Some((query, result)))
            }));
        }

        let abort_handles: Vec<AbortHandle> = tasks.iter().map(JoinHandle::abort_handle).collect();
        let joined = try_join_all(tasks.into_iter().map(|task| async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Search task panicked: {}", e);
                    Err(ZoektError::Io(io::Error::other(e)))
                }
            }
        }))
        .await;

        let results: Vec<(String, SearchResult)> = match joined {
            Ok(entries) => entries.into_iter().flatten().collect(),
            Err(e) => {
                error!("Search task error: {}", e);
                for handle in &abort_handles {
                    handle.abort();
                }
                return Err(e);
            }
        };

        info!(
            "All {} searches completed, results appended to '{}'",
            results.len(),
            self.output_path.display()
        );
        Ok(results)
    }

    async fn search_one(
        client: &ZoektClient,
        query: &str,
        options: &SearchOptions,
        file: &Mutex<tokio::fs::File>,
    ) -> Result<SearchResult, ZoektError> {
        let result = client.search(query, options).await?;

        let line = serde_json::to_string(&BatchLine {
            query,
            result: &result,
        })?;
        let mut file_guard = file.lock().await;
        file_guard.write_all(line.as_bytes()).await?;
        file_guard.write_all(b"\n").await?;
        file_guard.flush().await?;

        info!(
            "Saved {} file matches for '{}'",
            result.files.len(),
            query
        );
        Ok(result)
    }
}
