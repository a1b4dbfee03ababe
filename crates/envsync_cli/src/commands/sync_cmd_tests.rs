use super::*;
use clap::Parser;
use envsync_core::{NopKind, PlannedChange};
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Parser)]
struct TestCli {
    #[command(flatten)]
    args: SyncArgs,
}

fn parse(args: &[&str]) -> Result<SyncArgs, clap::Error> {
    let mut argv = vec!["envsync", "--owner", "my-org", "--repo", "my-repo"];
    argv.extend_from_slice(args);
    TestCli::try_parse_from(argv).map(|cli| cli.args)
}

fn repo() -> RepoRef {
    RepoRef::new("my-org", "my-repo")
}

#[test]
fn test_parse_defaults() {
    let args = parse(&["--token", "abc"]).unwrap();

    assert_eq!(args.config, PathBuf::from(DEFAULT_SETTINGS_FILENAME));
    assert!(!args.dry_run);
    assert_eq!(args.format, OutputFormat::Pretty);
    assert!(args.api_url.is_none());
}

#[test]
fn test_parse_app_id_requires_key_and_installation() {
    let result = parse(&["--app-id", "12"]);

    assert!(result.is_err());
}

#[test]
fn test_credentials_from_token() {
    let args = parse(&["--token", "abc"]).unwrap();

    assert_eq!(
        Credentials::from_args(&args).unwrap(),
        Credentials::Token("abc".to_string())
    );
}

#[test]
fn test_credentials_prefer_github_app() {
    let args = parse(&[
        "--token",
        "abc",
        "--app-id",
        "12",
        "--private-key-file",
        "key.pem",
        "--installation-id",
        "34",
    ])
    .unwrap();

    assert_eq!(
        Credentials::from_args(&args).unwrap(),
        Credentials::App {
            app_id: 12,
            private_key_file: PathBuf::from("key.pem"),
            installation_id: 34,
        }
    );
}

#[test]
fn test_credentials_missing() {
    let mut args = parse(&[]).unwrap();
    args.token = None;

    let result = Credentials::from_args(&args);

    assert!(matches!(result, Err(Error::Auth(_))));
}

#[test]
fn test_credentials_empty_token_is_rejected() {
    let mut args = parse(&[]).unwrap();
    args.token = Some(String::new());

    assert!(Credentials::from_args(&args).is_err());
}

#[test]
fn test_render_planned_pretty() {
    let repo = repo();
    let commands = vec![
        Mutation::DeleteEnvironment {
            environment: "legacy".to_string(),
        }
        .to_nop_command("Environments", &repo),
        NopCommand::error("Environments", &repo, "Error rate limited"),
    ];

    let output =
        render_outcome(&SyncOutcome::Planned(commands), &repo, OutputFormat::Pretty).unwrap();

    assert!(output.contains("my-org/my-repo"));
    assert!(output.contains("Delete environment 'legacy'"));
    assert!(output.contains("DELETE /repos/my-org/my-repo/environments/legacy"));
    assert!(output.contains("Error rate limited"));
}

#[test]
fn test_render_planned_json() {
    let repo = repo();
    let commands = vec![NopCommand::error("Environments", &repo, "boom")];

    let output =
        render_outcome(&SyncOutcome::Planned(commands), &repo, OutputFormat::Json).unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed[0]["type"], "ERROR");
    assert_eq!(parsed[0]["plugin"], "Environments");
    assert_eq!(parsed[0]["repo"]["owner"], "my-org");
}

#[test]
fn test_render_applied_pretty() {
    let repo = repo();
    let mutations = vec![Mutation::CreateVariable {
        environment: "qa".to_string(),
        name: "region".to_string(),
        value: "eu".to_string(),
    }];

    let output = render_outcome(&SyncOutcome::Applied(mutations), &repo, OutputFormat::Pretty).unwrap();

    assert!(output.contains("Applied 1 changes to"));
    assert!(output.contains("Add variable 'region' to environment 'qa'"));
}

#[test]
fn test_render_empty_outcome() {
    let repo = repo();

    let planned = render_outcome(&SyncOutcome::Planned(Vec::new()), &repo, OutputFormat::Pretty).unwrap();
    let applied = render_outcome(&SyncOutcome::Applied(Vec::new()), &repo, OutputFormat::Pretty).unwrap();

    assert!(planned.contains("No changes planned for"));
    assert!(applied.contains("Environments up to date for"));
}

#[test]
fn test_parse_format() {
    let args = parse(&["--token", "abc", "--format", "json"]).unwrap();

    assert_eq!(args.format, OutputFormat::Json);
}

#[test]
fn test_parse_rejects_unknown_format() {
    let result = parse(&["--token", "abc", "--format", "yaml"]);

    assert!(result.is_err());
}

#[test]
fn test_render_fetch_failure() {
    let repo = repo();
    let outcome = SyncOutcome::FetchFailed("rate limit exceeded".to_string());

    let pretty = render_outcome(&outcome, &repo, OutputFormat::Pretty).unwrap();
    let json = render_outcome(&outcome, &repo, OutputFormat::Json).unwrap();

    assert!(pretty.contains("Failed to fetch environments for"));
    assert!(pretty.contains("rate limit exceeded"));
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["error"], "rate limit exceeded");
}

#[tokio::test]
async fn test_execute_fails_on_missing_settings_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut args = parse(&["--token", "abc"]).unwrap();
    args.config = temp_dir.path().join("missing.toml");

    let result = execute(&args).await;

    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_execute_fails_on_unreadable_private_key() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config = temp_dir.path().join(DEFAULT_SETTINGS_FILENAME);
    fs::write(&config, "").expect("Failed to write settings");
    let mut args = parse(&[
        "--app-id",
        "12",
        "--private-key-file",
        "does-not-exist.pem",
        "--installation-id",
        "34",
    ])
    .unwrap();
    args.config = config;

    let result = execute(&args).await;

    assert!(matches!(result, Err(Error::Auth(msg)) if msg.contains("Failed to read private key")));
}

#[test]
fn test_nop_kind_serializes_uppercase() {
    assert_eq!(serde_json::to_string(&NopKind::Info).unwrap(), "\"INFO\"");
}

#[tokio::test]
async fn test_execute_fails_when_environments_cannot_be_fetched() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/my-org/my-repo/environments"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "message": "Bad credentials",
            "documentation_url": "https://docs.github.com/rest"
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config = temp_dir.path().join(DEFAULT_SETTINGS_FILENAME);
    fs::write(&config, "[[environments]]\nname = \"qa\"\n").expect("Failed to write settings");
    let uri = mock_server.uri();
    let mut args = parse(&["--token", "abc", "--api-url", uri.as_str()]).unwrap();
    args.config = config;

    let result = execute(&args).await;

    assert!(matches!(result, Err(Error::Fetch(msg)) if msg.contains("in Environments for repo:")));
}
