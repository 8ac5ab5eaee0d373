//! Client tests against a mock Zoekt server.

use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zoekt_client::{
    BatchRunner, BlockingZoektClient, ClientConfig, ListOptions, ListOptionsField, SearchOptions,
    SearchRequest, ZoektClient, ZoektError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn search_body(match_count: u32) -> Value {
    json!({
        "Result": {
            "Files": [{
                "FileName": "src/lib.rs",
                "Repository": "org/repo",
                "Version": "0123abcd",
                "Language": "Rust",
                "Branches": ["HEAD"],
                "ChunkMatches": [{
                    "Content": "Zm4gbWFpbigpIHt9Cg==",
                    "ContentStart": {"ByteOffset": 0, "LineNumber": 7, "Column": 1},
                    "Ranges": [{
                        "Start": {"ByteOffset": 3, "LineNumber": 7, "Column": 4},
                        "End": {"ByteOffset": 7, "LineNumber": 7, "Column": 8}
                    }],
                    "SymbolInfo": null,
                    "FileName": false,
                    "Score": 501.0,
                    "BestLineMatch": 7
                }],
                "LineMatches": null,
                "Checksum": "n5Pwo2s0Cg8=",
                "Score": 501.0
            }],
            "RepoURLs": {
                "org/repo": "{{URLJoinPath \"https://git.example.com/org/repo\" \"blob\" .Version .Path}}"
            },
            "LineFragments": {"org/repo": "#L{{.LineNumber}}"},
            "FileCount": 1,
            "MatchCount": match_count,
            "Duration": 1200000
        }
    })
}

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::with_base_url(&server.uri())
        .timeout(Duration::from_secs(5))
        .retries(3, Duration::from_millis(1))
}

async fn mount_search(server: &MockServer, query: &str, match_count: u32) {
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .and(body_partial_json(json!({"Q": query})))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(match_count)))
        .expect(1)
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Async client
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_sends_query_and_decodes_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .and(body_partial_json(json!({
            "Q": "repo:org/repo main",
            "RepoIDs": [3],
            "Opts": {"ChunkMatches": true, "NumContextLines": 2}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(1)))
        .expect(1)
        .mount(&server)
        .await;

    let client = ZoektClient::new(config_for(&server)).unwrap();
    let request = SearchRequest::new(
        "repo:org/repo main",
        SearchOptions::default().with_context_lines(2),
    )
    .with_repo_ids(vec![3]);
    let result = client.search_request(&request).await.unwrap();

    assert_eq!(result.stats.match_count, 1);
    let file = &result.files[0];
    assert_eq!(file.file_name, "src/lib.rs");
    let chunk = &file.chunk_matches.as_ref().unwrap()[0];
    assert_eq!(chunk.decoded_content().unwrap(), "fn main() {}\n");
    assert_eq!(
        result.file_url(file, file.first_line_number()).unwrap(),
        "https://git.example.com/org/repo/blob/0123abcd/src/lib.rs#L7"
    );
}

#[tokio::test]
async fn helpers_rewrite_the_query() {
    let server = MockServer::start().await;
    mount_search(&server, "lang:rust needle", 1).await;
    mount_search(&server, "repo:a file:*.rs needle", 2).await;
    mount_search(&server, "case:yes Needle", 3).await;
    mount_search(&server, "sym: parse", 4).await;
    mount_search(&server, "sym:function parse", 5).await;

    let client = ZoektClient::new(config_for(&server)).unwrap();
    let options = SearchOptions::default();

    let r = client
        .search_by_language("lang:go needle", "rust", &options)
        .await
        .unwrap();
    assert_eq!(r.stats.match_count, 1);

    let r = client
        .search_by_file_pattern("repo:a needle", "*.rs", &options)
        .await
        .unwrap();
    assert_eq!(r.stats.match_count, 2);

    let r = client.search_case_sensitive("Needle", &options).await.unwrap();
    assert_eq!(r.stats.match_count, 3);

    let r = client.search_symbols("parse", None, &options).await.unwrap();
    assert_eq!(r.stats.match_count, 4);

    let r = client
        .search_symbols("parse", Some("function"), &options)
        .await
        .unwrap();
    assert_eq!(r.stats.match_count, 5);
}

#[tokio::test]
async fn search_with_context_sets_context_lines() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .and(body_partial_json(json!({"Opts": {"NumContextLines": 5}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(1)))
        .expect(1)
        .mount(&server)
        .await;

    let client = ZoektClient::new(config_for(&server)).unwrap();
    client
        .search_with_context("needle", 5, &SearchOptions::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn api_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"Error": "bad regexp"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ZoektClient::new(config_for(&server)).unwrap();
    let err = client
        .search("file:(", &SearchOptions::default())
        .await
        .unwrap_err();
    match err {
        ZoektError::Api {
            status_code,
            message,
        } => {
            assert_eq!(status_code, 400);
            assert_eq!(message, "bad regexp");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn timeouts_are_retried_then_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(search_body(1))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let config = ClientConfig::with_base_url(&server.uri())
        .timeout(Duration::from_millis(100))
        .retries(2, Duration::from_millis(1));
    let client = ZoektClient::new(config).unwrap();

    let err = client
        .search("slow", &SearchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ZoektError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ClientConfig::new("127.0.0.1", port).retries(2, Duration::from_millis(1));
    let client = ZoektClient::new(config).unwrap();

    let err = client
        .search("anything", &SearchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ZoektError::Connection(_)), "got {err:?}");
}

#[tokio::test]
async fn list_repositories_unwraps_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/list"))
        .and(body_partial_json(json!({"Q": "repo:org", "Opts": {"Field": 0}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "List": {
                "Repos": [{
                    "Repository": {
                        "ID": 9,
                        "Name": "org/repo",
                        "Branches": [{"Name": "HEAD", "Version": "0123abcd"}],
                        "HasSymbols": true
                    },
                    "IndexMetadata": {"IndexTime": "2025-07-20T19:29:31Z"},
                    "Stats": {"Documents": 12}
                }],
                "ReposMap": null,
                "Crashes": 0,
                "Stats": {"Repos": 1, "Documents": 12}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ZoektClient::new(config_for(&server)).unwrap();
    let list = client
        .list_repositories(
            "repo:org",
            Some(ListOptions {
                field: ListOptionsField::Full,
            }),
        )
        .await
        .unwrap();

    assert_eq!(list.repos.len(), 1);
    assert_eq!(list.repos[0].repository.name, "org/repo");
    assert_eq!(list.repos[0].repository.branches[0].version, "0123abcd");
    assert_eq!(list.stats.documents, 12);
}

#[tokio::test]
async fn batch_preserves_input_order() {
    let server = MockServer::start().await;
    mount_search(&server, "alpha", 1).await;
    mount_search(&server, "beta", 2).await;
    mount_search(&server, "gamma", 3).await;

    let client = ZoektClient::new(config_for(&server)).unwrap();
    let queries = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
    let results = client
        .search_batch(&queries, &SearchOptions::default(), 2)
        .await
        .unwrap();

    let summary: Vec<(&str, i64)> = results
        .iter()
        .map(|(q, r)| (q.as_str(), r.stats.match_count))
        .collect();
    assert_eq!(summary, [("alpha", 1), ("beta", 2), ("gamma", 3)]);
}

async fn mount_failure(server: &MockServer, query: &str) {
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .and(body_partial_json(json!({"Q": query})))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn batch_stops_sending_after_first_error() {
    let server = MockServer::start().await;
    mount_failure(&server, "broken").await;
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .and(body_partial_json(json!({"Q": "later"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(1)))
        .expect(0)
        .mount(&server)
        .await;

    let client = ZoektClient::new(config_for(&server)).unwrap();
    let queries: Vec<String> = ["broken", "later", "later", "later"]
        .iter()
        .map(|q| q.to_string())
        .collect();
    let err = client
        .search_batch(&queries, &SearchOptions::default(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ZoektError::Api { status_code: 500, .. }));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
}

// ---------------------------------------------------------------------------
// Batch runner
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_runner_appends_json_lines() {
    let server = MockServer::start().await;
    mount_search(&server, "alpha", 1).await;
    mount_search(&server, "beta", 2).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("results.jsonl");

    let client = ZoektClient::new(config_for(&server)).unwrap();
    let runner = BatchRunner::new(client, &output, 2).hidden();
    let results = runner
        .run(vec!["alpha".to_string(), "beta".to_string()])
        .await
        .unwrap();
    assert_eq!(results.len(), 2);

    let written = std::fs::read_to_string(&output).unwrap();
    let mut lines: Vec<(String, i64)> = written
        .lines()
        .map(|line| {
            let value: Value = serde_json::from_str(line).unwrap();
            (
                value["query"].as_str().unwrap().to_string(),
                value["result"]["MatchCount"].as_i64().unwrap(),
            )
        })
        .collect();
    lines.sort();
    assert_eq!(
        lines,
        [("alpha".to_string(), 1), ("beta".to_string(), 2)]
    );
}

#[tokio::test]
async fn batch_runner_stops_after_first_error() {
    let server = MockServer::start().await;
    // Every query fails, so whichever task runs first must be the only one sent
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("results.jsonl");

    let client = ZoektClient::new(config_for(&server)).unwrap();
    let runner = BatchRunner::new(client, &output, 1).hidden();
    let queries: Vec<String> = ["one", "two", "three", "four"]
        .iter()
        .map(|q| q.to_string())
        .collect();
    let err = runner.run(queries).await.unwrap_err();
    assert!(matches!(err, ZoektError::Api { status_code: 500, .. }));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
}

// ---------------------------------------------------------------------------
// Blocking client
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_client_matches_async_behaviour() {
    let server = MockServer::start().await;
    mount_search(&server, "repo:org/ needle", 4).await;
    Mock::given(method("POST"))
        .and(path("/api/list"))
        .respond_with(ResponseTemplate::new(503).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let (search, list) = tokio::task::spawn_blocking(move || {
        let client = BlockingZoektClient::new(config).unwrap();
        let search = client.search_by_repo("needle", "org/", &SearchOptions::default());
        let list = client.list_repositories("", None);
        (search, list)
    })
    .await
    .unwrap();

    assert_eq!(search.unwrap().stats.match_count, 4);
    match list.unwrap_err() {
        ZoektError::Api {
            status_code,
            message,
        } => {
            assert_eq!(status_code, 503);
            assert_eq!(message, "Unknown error");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}
