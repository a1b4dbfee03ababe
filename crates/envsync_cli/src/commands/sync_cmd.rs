//! The `sync` command: one reconciliation pass for one repository.
//!
//! # Examples
//!
//! ```bash
//! # Show what would change
//! envsync sync --config envsync.toml --owner my-org --repo my-repo --dry-run
//!
//! # Apply, authenticating as a GitHub App installation
//! envsync sync --config envsync.toml --owner my-org --repo my-repo \
//!     --app-id 1234 --private-key-file app.pem --installation-id 5678
//! ```

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use colored::Colorize;
use envsync_core::{sync, Environments, Mutation, NopCommand, RepoRef, SyncContext, SyncOutcome};
use github_client::GitHubClient;
use tracing::{debug, info, instrument};

use crate::config::{SettingsFile, DEFAULT_SETTINGS_FILENAME};
use crate::errors::Error;

#[cfg(test)]
#[path = "sync_cmd_tests.rs"]
mod tests;

/// Arguments for the `sync` command.
#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Settings file declaring the desired environments.
    #[arg(long, default_value = DEFAULT_SETTINGS_FILENAME)]
    pub config: PathBuf,

    /// Owner (user or organization) of the repository.
    #[arg(long)]
    pub owner: String,

    /// Name of the repository.
    #[arg(long)]
    pub repo: String,

    /// Report the planned changes without making them.
    #[arg(long)]
    pub dry_run: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// API root, for GitHub Enterprise Server.
    #[arg(long)]
    pub api_url: Option<String>,

    /// Personal access token.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub App ID, used together with a private key and an installation ID.
    #[arg(long, requires_all = ["private_key_file", "installation_id"])]
    pub app_id: Option<u64>,

    /// PEM file holding the GitHub App private key.
    #[arg(long)]
    pub private_key_file: Option<PathBuf>,

    /// Installation of the GitHub App on the repository owner.
    #[arg(long)]
    pub installation_id: Option<u64>,
}

/// How the outcome is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    Pretty,
}

/// How the CLI authenticates with GitHub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Token(String),
    App {
        app_id: u64,
        private_key_file: PathBuf,
        installation_id: u64,
    },
}

impl Credentials {
    /// Picks the credentials from the arguments. GitHub App credentials win over a token.
    pub fn from_args(args: &SyncArgs) -> Result<Self, Error> {
        match (
            args.app_id,
            &args.private_key_file,
            args.installation_id,
            &args.token,
        ) {
            (Some(app_id), Some(private_key_file), Some(installation_id), _) => {
                Ok(Credentials::App {
                    app_id,
                    private_key_file: private_key_file.clone(),
                    installation_id,
                })
            }
            (None, _, _, Some(token)) if !token.is_empty() => Ok(Credentials::Token(token.clone())),
            _ => Err(Error::Auth(
                "No credentials given. Pass --token (or set GITHUB_TOKEN), or --app-id with --private-key-file and --installation-id.".to_string(),
            )),
        }
    }
}

/// What the process should report after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub output: String,
    pub exit_code: i32,
}

/// Runs one reconciliation pass and renders its outcome.
///
/// A dry run that produced error entries exits with 1. A failed fetch in normal mode is
/// returned as [`Error::Fetch`].
#[instrument(skip(args), fields(owner = %args.owner, repo = %args.repo, dry_run = args.dry_run))]
pub async fn execute(args: &SyncArgs) -> Result<CommandResult, Error> {
    let settings = SettingsFile::load(&args.config)?;
    let credentials = Credentials::from_args(args)?;
    let client = create_client(&credentials, args).await?;

    let repo = RepoRef::new(args.owner.as_str(), args.repo.as_str());
    let ctx = SyncContext::new(&repo, &client, args.dry_run);
    let plugin = Environments::new(settings.environments);

    let outcome = sync(&plugin, &ctx).await?;
    if let SyncOutcome::FetchFailed(message) = &outcome {
        return Err(Error::Fetch(message.clone()));
    }
    info!(changes = outcome.len(), "Sync finished");

    let output = render_outcome(&outcome, &repo, args.format)?;
    let exit_code = if outcome.has_errors() { 1 } else { 0 };
    Ok(CommandResult { output, exit_code })
}

async fn create_client(credentials: &Credentials, args: &SyncArgs) -> Result<GitHubClient, Error> {
    let api_url = args.api_url.as_deref();
    let octocrab = match credentials {
        Credentials::Token(token) => {
            debug!("Authenticating with a personal access token");
            github_client::create_token_client(token, api_url)
                .map_err(|e| Error::Auth(format!("Failed to create token client: {}", e)))?
        }
        Credentials::App {
            app_id,
            private_key_file,
            installation_id,
        } => {
            let private_key = std::fs::read_to_string(private_key_file).map_err(|e| {
                Error::Auth(format!(
                    "Failed to read private key from {:?}: {}",
                    private_key_file, e
                ))
            })?;
            let app_client = github_client::create_app_client(*app_id, &private_key, api_url)
                .await
                .map_err(|e| Error::Auth(format!("Failed to create GitHub App client: {}", e)))?;
            github_client::authenticate_with_access_token(
                &app_client,
                *installation_id,
                &args.owner,
                &args.repo,
            )
            .await
            .map_err(|e| {
                Error::Auth(format!(
                    "Failed to get an installation token for installation {}: {}",
                    installation_id, e
                ))
            })?
        }
    };

    Ok(GitHubClient::new(octocrab))
}

/// Renders an outcome in the requested format.
pub fn render_outcome(
    outcome: &SyncOutcome<Mutation>,
    repo: &RepoRef,
    format: OutputFormat,
) -> Result<String, Error> {
    let to_json = |json: serde_json::Result<String>| {
        json.map_err(|e| Error::Output(format!("Failed to serialize to JSON: {}", e)))
    };

    match (format, outcome) {
        (OutputFormat::Json, SyncOutcome::Planned(commands)) => {
            to_json(serde_json::to_string_pretty(commands))
        }
        (OutputFormat::Json, SyncOutcome::Applied(mutations)) => {
            to_json(serde_json::to_string_pretty(mutations))
        }
        (OutputFormat::Json, SyncOutcome::FetchFailed(message)) => to_json(
            serde_json::to_string_pretty(&serde_json::json!({ "error": message })),
        ),
        (OutputFormat::Pretty, SyncOutcome::Planned(commands)) => {
            Ok(format_planned_pretty(commands, repo))
        }
        (OutputFormat::Pretty, SyncOutcome::Applied(mutations)) => {
            Ok(format_applied_pretty(mutations, repo))
        }
        (OutputFormat::Pretty, SyncOutcome::FetchFailed(message)) => Ok(format!(
            "{} {}: {}\n",
            "Failed to fetch environments for".red(),
            repo,
            message
        )),
    }
}

fn format_planned_pretty(commands: &[NopCommand], repo: &RepoRef) -> String {
    if commands.is_empty() {
        return format!("{} {}\n", "No changes planned for".green(), repo);
    }

    let mut output = format!("{} {}:\n", "Planned changes for".bold(), repo);
    for command in commands {
        if command.is_error() {
            output.push_str(&format!("  {} {}\n", "✗".red(), command.action.red()));
            continue;
        }

        output.push_str(&format!("  {} {}\n", "•".cyan(), command.action));
        if let Some(endpoint) = &command.endpoint {
            output.push_str(&format!("      {}\n", endpoint.dimmed()));
        }
        if let Some(body) = &command.body {
            output.push_str(&format!("      {}\n", body.to_string().dimmed()));
        }
    }
    output
}

fn format_applied_pretty(mutations: &[Mutation], repo: &RepoRef) -> String {
    if mutations.is_empty() {
        return format!("{} {}\n", "Environments up to date for".green(), repo);
    }

    let header = format!("Applied {} changes to", mutations.len());
    let mut output = format!("{} {}:\n", header.bold(), repo);
    for mutation in mutations {
        output.push_str(&format!("  {} {}\n", "✓".green(), mutation.describe()));
    }
    output
}
