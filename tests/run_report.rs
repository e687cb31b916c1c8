//! Runs the whole report pipeline against a mocked GitHub API and temp files

use repo_growth::application::use_cases::fetch_repository_info::RetryPolicy;
use repo_growth::infrastructures::adapters::primary::cli;
use repo_growth::infrastructures::config::AppConfig;
use serde_json::{Value, json};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, dir: &tempfile::TempDir) -> AppConfig {
    AppConfig {
        github_token: "t0ken".to_string(),
        github_api_url: server.uri(),
        concurrency: 2,
        cache_path: Some(dir.path().join("data/repo-info.json")),
        retry_policy: RetryPolicy {
            cooldown: Duration::from_millis(10),
            max_attempts: 2,
        },
        star_events_path: dir.path().join("star-events.json"),
        repositories: None,
        min_stars_last_year: 1000,
        output_path: dir.path().join("data/out.json"),
    }
}

#[tokio::test]
async fn test_run_writes_report_and_cache() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/a/one"))
        .and(header("authorization", "Bearer t0ken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stargazers_count": 2500,
            "language": "Rust",
            "topics": ["cli", "async"],
            "description": "first"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/b/two"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("star-events.json"),
        serde_json::to_vec(&json!({
            "stars_last_year": {"a/one": 2000, "b/two": 1500, "tiny/repo": 10},
            "windows": [
                {"repo_name": "a/one", "period_days": 30, "penult": 100, "ult": 50},
                {"repo_name": "b/two", "period_days": 365, "penult": 0, "ult": 80}
            ]
        }))?,
    )?;
    let config = config(&server, &dir);

    cli::run(config, CancellationToken::new()).await?;

    let report: Value = serde_json::from_slice(&std::fs::read(dir.path().join("data/out.json"))?)?;
    assert_eq!(
        report,
        json!([
            {
                "Name": "a/one",
                "Url": "https://github.com/a/one",
                "Stars": 2500,
                "Growth30": 1.5,
                "Growth180": 0.0,
                "Growth365": 0.0,
                "Language": "Rust",
                "Topics": "cli, async",
                "Description": "first"
            },
            {
                "Name": "b/two",
                "Url": "https://github.com/b/two",
                "Stars": 0,
                "Growth30": 0.0,
                "Growth180": 0.0,
                "Growth365": 0.0,
                "Language": "",
                "Topics": "",
                "Description": ""
            }
        ])
    );

    let cache: Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("data/repo-info.json"))?)?;
    assert_eq!(cache["a/one"]["Stars"], 2500);
    assert_eq!(cache["b/two"]["Stars"], 0);
    assert!(cache.get("tiny/repo").is_none());
    Ok(())
}

#[tokio::test]
async fn test_cancelled_run_writes_nothing() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("star-events.json"),
        r#"{"stars_last_year": {"a/one": 2000}, "windows": []}"#,
    )?;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = cli::run(config(&server, &dir), cancel).await;

    assert!(result.is_err());
    assert!(!dir.path().join("data/out.json").exists());
    assert!(!dir.path().join("data/repo-info.json").exists());
    Ok(())
}
