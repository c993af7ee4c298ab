//! CLI-level tests driving the compiled `nlctx` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn nlctx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("nlctx");
    path
}

fn setup_test_env() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_content = r#"[server]
bind = "127.0.0.1:7431"
"#;
    let config_path = root.join("nlctx.toml");
    fs::write(&config_path, config_content).unwrap();

    // Two issues with fixed (old) publication dates.
    let bundles = r#"[
      {
        "newsletter": {
          "message_id": "<issue-1@digest.example>",
          "newsletter_name": "AI Digest",
          "subject": "Issue 1",
          "primary_url": "https://digest.example/1",
          "published_at": "2020-01-06T09:00:00Z"
        },
        "chunks": [
          { "chunk_id": "1-a", "content": "Funding roundup.", "embedding": [1.0, 0.0] },
          { "chunk_id": "1-b", "content": "Model releases.", "embedding": [0.0, 1.0] }
        ]
      },
      {
        "newsletter": {
          "message_id": "<issue-2@digest.example>",
          "newsletter_name": "AI Digest",
          "subject": "Issue 2",
          "primary_url": "https://digest.example/2",
          "published_at": "2020-01-13T09:00:00Z"
        },
        "chunks": [
          { "chunk_id": "2-a", "content": "Policy news.", "embedding": [0.7, 0.7] }
        ]
      }
    ]"#;
    let data_path = root.join("bundles.json");
    fs::write(&data_path, bundles).unwrap();

    (tmp, config_path, data_path)
}

fn run_nlctx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = nlctx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run nlctx binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_ingest_reports_counts() {
    let (_tmp, config_path, data_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_nlctx(&config_path, &["ingest", data_path.to_str().unwrap()]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("ok: 2 newsletters, 3 chunks"));
}

#[test]
fn test_ingest_rejects_duplicate_chunk_ids() {
    let (_tmp, config_path, _) = setup_test_env();
    let dup = r#"[
      {
        "newsletter": {
          "message_id": "<a@x>",
          "newsletter_name": "n",
          "subject": "s",
          "primary_url": "u",
          "published_at": "2020-01-01T00:00:00Z"
        },
        "chunks": [
          { "chunk_id": "same", "content": "one", "embedding": [1.0] },
          { "chunk_id": "same", "content": "two", "embedding": [1.0] }
        ]
      }
    ]"#;
    let path = config_path.parent().unwrap().join("dup.json");
    fs::write(&path, dup).unwrap();

    let (stdout, stderr, success) = run_nlctx(&config_path, &["ingest", path.to_str().unwrap()]);
    assert!(!success, "duplicate ids should fail: stdout={}", stdout);
    assert!(stderr.contains("duplicate"), "stderr={}", stderr);
}

#[test]
fn test_ingest_rejects_malformed_file() {
    let (_tmp, config_path, _) = setup_test_env();
    let path = config_path.parent().unwrap().join("bad.json");
    fs::write(&path, "{ not json").unwrap();

    let (_, stderr, success) = run_nlctx(&config_path, &["ingest", path.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("parse"), "stderr={}", stderr);
}

#[test]
fn test_query_empty_window_prints_no_results() {
    let (_tmp, config_path, data_path) = setup_test_env();

    // All bundled issues are far older than the 7-day default window, so
    // the query resolves without ever touching an embedding provider.
    let (stdout, stderr, success) = run_nlctx(
        &config_path,
        &["query", "ai news", "--data", data_path.to_str().unwrap()],
    );
    assert!(success, "query failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_query_without_provider_is_an_error() {
    let (_tmp, config_path, data_path) = setup_test_env();

    // A window wide enough to reach the 2020 issues forces an embedding
    // call, which the default (disabled) provider refuses.
    let (stdout, stderr, success) = run_nlctx(
        &config_path,
        &[
            "query",
            "ai news",
            "--data",
            data_path.to_str().unwrap(),
            "--days",
            "36500",
        ],
    );
    assert!(!success, "expected failure: stdout={}", stdout);
    assert!(stderr.contains("disabled"), "stderr={}", stderr);
}

#[test]
fn test_query_rejects_invalid_max_results() {
    let (_tmp, config_path, data_path) = setup_test_env();

    let (_, stderr, success) = run_nlctx(
        &config_path,
        &[
            "query",
            "ai news",
            "--data",
            data_path.to_str().unwrap(),
            "--max-results",
            "51",
        ],
    );
    assert!(!success);
    assert!(stderr.contains("max_results"), "stderr={}", stderr);
}
