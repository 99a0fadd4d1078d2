//! End-to-end tests for the tweetpipe binary
//!
//! Every test runs in a temporary working directory with a local raw store
//! and `--dry-run`, so neither PostgreSQL nor S3 is needed.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

/// Helper to build a command isolated in `dir`
fn tweetpipe(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tweetpipe").unwrap();
    cmd.current_dir(dir.path())
        .env("TWEETPIPE_STORAGE", "local")
        .env("TWEETPIPE_DATA_DIR", dir.path().join("data"))
        .env("TWITTER_BEARER_TOKEN", "test-token")
        .env_remove("LOG_OUTPUT")
        .env_remove("LOG_LEVEL");
    cmd
}

/// Helper to create one timeline item with every field the parsers read
fn timeline_item(id: u64) -> serde_json::Value {
    json!({
        "id": id,
        "created_at": "Fri May 31 10:00:00 +0000 2019",
        "full_text": "Release notes #rust https://t.co/rel",
        "display_text_range": [0, 19],
        "retweet_count": 1,
        "favorite_count": 2,
        "entities": {"hashtags": [{"text": "rust", "indices": [14, 19]}]},
        "user": {
            "id": 42,
            "screen_name": "alice",
            "name": "Alice",
            "created_at": "Sun Jan 01 00:00:00 +0000 2012",
            "followers_count": 100,
            "friends_count": 10,
            "favourites_count": 3
        }
    })
}

/// Helper to store a raw document the way a previous run would have
fn write_raw_document(dir: &TempDir, key: &str) {
    let document = json!({
        "tweetpipe_metadata": {
            "fetched_at": "Sat Jun 01 12:00:00 +0000 2019",
            "username": "alice",
            "count": 2
        },
        "tweets": [timeline_item(1), timeline_item(2)]
    });
    let file = dir.path().join("data").join(key);
    fs::create_dir_all(file.parent().unwrap()).unwrap();
    fs::write(file, serde_json::to_vec_pretty(&document).unwrap()).unwrap();
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    tweetpipe(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--user-handle"))
        .stdout(predicate::str::contains("--rerun"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_no_arguments_prints_help() {
    let dir = TempDir::new().unwrap();
    tweetpipe(&dir).assert().failure().stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_count_without_handle_fails() {
    let dir = TempDir::new().unwrap();
    tweetpipe(&dir)
        .args(["-c", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--user-handle"));
}

#[test]
fn test_list_empty_store() {
    let dir = TempDir::new().unwrap();
    tweetpipe(&dir)
        .args(["--list", "alice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No raw documents found for prefix 'alice'"));
}

#[test]
fn test_list_stored_documents() {
    let dir = TempDir::new().unwrap();
    write_raw_document(&dir, "bob/20190601T120000Z.json");
    write_raw_document(&dir, "alice/20190601T120000Z.json");

    tweetpipe(&dir)
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Raw documents (2, prefix '')"))
        .stdout(predicate::str::contains("alice/20190601T120000Z.json"))
        .stdout(predicate::str::contains("bob/20190601T120000Z.json"));
}

#[test]
fn test_rerun_dry_run() {
    let dir = TempDir::new().unwrap();
    write_raw_document(&dir, "alice/20190601T120000Z.json");

    tweetpipe(&dir)
        .args(["--rerun", "alice/20190601T120000Z.json", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Raw document: alice/20190601T120000Z.json"))
        .stdout(predicate::str::contains("2 records: 2 loaded"))
        .stdout(predicate::str::contains("Dry run"));
}

#[test]
fn test_rerun_missing_key() {
    let dir = TempDir::new().unwrap();
    tweetpipe(&dir)
        .args(["--rerun", "alice/missing.json", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("alice/missing.json"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_full_run_dry_run() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.1/statuses/user_timeline.json"))
        .and(query_param("screen_name", "alice"))
        .and(query_param("count", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([timeline_item(2), timeline_item(1)])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    tweetpipe(&dir)
        .env("TWITTER_API_URL", mock_server.uri())
        .args(["-u", "alice", "-c", "2", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Raw document: alice/"))
        .stdout(predicate::str::contains("2 records: 2 loaded"));

    // the fetched batch was kept for later reruns
    tweetpipe(&dir)
        .args(["--list", "alice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Raw documents (1, prefix 'alice')"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remote_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.1/statuses/user_timeline.json"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    tweetpipe(&dir)
        .env("TWITTER_API_URL", mock_server.uri())
        .args(["-u", "alice", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("401"));
}
