#![cfg(feature = "cli")]

use std::io::Write;

use ci_actions::app::run_action;
use ci_actions::{ActionError, CliConfig};
use clap::Parser;
use httpmock::prelude::*;
use serde_json::json;
use tempfile::NamedTempFile;

fn event_file(payload: serde_json::Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", payload).unwrap();
    file
}

fn config(server: &MockServer, event_name: &str, event: &NamedTempFile) -> CliConfig {
    let base_url = server.base_url();
    CliConfig::try_parse_from([
        "ci-actions",
        "--github-token",
        "secret",
        "--github-api-url",
        base_url.as_str(),
        "--event-name",
        event_name,
        "--event-path",
        event.path().to_str().unwrap(),
        "commitguard",
    ])
    .unwrap()
}

fn pull_request_event() -> serde_json::Value {
    json!({
        "action": "synchronize",
        "pull_request": {
            "title": "fix: handle empty tags",
            "number": 7,
            "commits": 3,
            "head": { "ref": "feature-branch", "sha": "head-sha" },
            "base": {
                "ref": "main",
                "repo": { "name": "actions", "owner": { "login": "getoutreach" } }
            }
        }
    })
}

#[tokio::test]
async fn test_pull_request_passes_when_branch_is_behind() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/getoutreach/actions/tags");
            then.status(200).json_body(json!([
                { "name": "commitguard-1700000000", "commit": { "sha": "required-sha" } }
            ]));
        })
        .await;
    let compare = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/getoutreach/actions/compare/feature-branch...required-sha");
            then.status(200).json_body(json!({ "status": "behind" }));
        })
        .await;

    let event = event_file(pull_request_event());
    let summary = run_action(&config(&server, "pull_request", &event)).await.unwrap();

    assert_eq!(summary, "branch contains required commit required-sha");
    compare.assert_async().await;
}

#[tokio::test]
async fn test_pull_request_fails_when_branch_diverged() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/getoutreach/actions/tags");
            then.status(200).json_body(json!([
                { "name": "CommitGuard-1700000000", "commit": { "sha": "required-sha" } }
            ]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/getoutreach/actions/compare/feature-branch...required-sha");
            then.status(200).json_body(json!({ "status": "diverged" }));
        })
        .await;

    let event = event_file(pull_request_event());
    let err = run_action(&config(&server, "pull_request", &event)).await.unwrap_err();

    assert!(matches!(err, ActionError::DivergedHistory { ref status } if status == "diverged"));
    assert!(err.to_string().contains("please rebase"));
}

#[tokio::test]
async fn test_pull_request_without_tags_is_inactive() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/getoutreach/actions/tags");
            then.status(200).json_body(json!([{ "name": "v1.0.0", "commit": { "sha": "release" } }]));
        })
        .await;
    let compare = server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/compare/");
            then.status(200).json_body(json!({ "status": "identical" }));
        })
        .await;

    let event = event_file(pull_request_event());
    let summary = run_action(&config(&server, "pull_request", &event)).await.unwrap();

    assert_eq!(summary, "no CommitGuard tag, nothing to check");
    compare.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_new_marker_tag_reruns_open_pull_request_checks() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/getoutreach/actions/pulls")
                .query_param("state", "open");
            then.status(200).json_body(json!([{ "number": 7 }, { "number": 9 }]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/getoutreach/actions/actions/workflows/pull_request-shared-actions.yaml/runs")
                .query_param("event", "pull_request");
            then.status(200).json_body(json!({
                "total_count": 3,
                "workflow_runs": [
                    { "id": 100, "pull_requests": [{ "number": 7 }] },
                    { "id": 101, "pull_requests": [{ "number": 8 }] },
                    { "id": 102, "pull_requests": [{ "number": 9 }, { "number": 7 }] }
                ]
            }));
        })
        .await;
    let rerun_100 = server
        .mock_async(|when, then| {
            when.method(POST).path("/repos/getoutreach/actions/actions/runs/100/rerun");
            then.status(201);
        })
        .await;
    let rerun_101 = server
        .mock_async(|when, then| {
            when.method(POST).path("/repos/getoutreach/actions/actions/runs/101/rerun");
            then.status(201);
        })
        .await;
    let rerun_102 = server
        .mock_async(|when, then| {
            when.method(POST).path("/repos/getoutreach/actions/actions/runs/102/rerun");
            then.status(403).json_body(json!({ "message": "This workflow run is not completed" }));
        })
        .await;

    let event = event_file(json!({
        "ref": "CommitGuard-1700000600",
        "ref_type": "tag",
        "repository": { "name": "actions", "owner": { "login": "getoutreach" } }
    }));
    let summary = run_action(&config(&server, "create", &event)).await.unwrap();

    assert_eq!(summary, "re-ran 1 workflow runs, 1 could not be re-run");
    rerun_100.assert_async().await;
    rerun_101.assert_hits_async(0).await;
    rerun_102.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_branch_create_is_skipped() {
    let server = MockServer::start_async().await;
    let pulls = server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/getoutreach/actions/pulls");
            then.status(200).json_body(json!([]));
        })
        .await;

    let event = event_file(json!({
        "ref": "commitguard-1700000600",
        "ref_type": "branch",
        "repository": { "name": "actions", "owner": { "login": "getoutreach" } }
    }));
    let summary = run_action(&config(&server, "create", &event)).await.unwrap();

    assert_eq!(summary, "nothing to re-run");
    pulls.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_unknown_event_is_unsupported() {
    let server = MockServer::start_async().await;
    let event = event_file(json!({}));

    let err = run_action(&config(&server, "workflow_dispatch", &event)).await.unwrap_err();
    assert!(matches!(err, ActionError::UnsupportedEvent { ref event } if event == "workflow_dispatch"));
}
