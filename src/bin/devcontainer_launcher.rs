/// Command-line front end for the devcontainer launcher.
/// Runs the same status checks and workspace actions the browser button
/// uses, printing JSON so results can be scripted or inspected.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use devcontainer_launcher_lib::{
    check_workspace, derive_button_state, derive_workspace_name, launch_target, launch_url_for,
    wait_for_state, RepositoryContext, Settings, WaitPolicy, WorkspaceApiClient, WorkspaceState,
};

#[derive(Parser)]
#[command(name = "devcontainer-launcher", version, about)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, env = "DEVCONTAINER_LAUNCHER_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the workspace API credential
    Verify,
    /// Show workspace status and the resulting button for a repository branch
    Status {
        owner: String,
        repo: String,
        #[arg(long)]
        branch: Option<String>,
    },
    /// Request a start transition
    Start { workspace_id: String },
    /// Request a stop transition
    Stop { workspace_id: String },
    /// List workspace templates
    Templates,
    /// Print the canonical workspace name
    Name { repo: String, branch: String },
    /// Print the launcher URL for a repository branch
    LaunchUrl {
        owner: String,
        repo: String,
        #[arg(long)]
        branch: Option<String>,
    },
    /// Poll until a workspace reaches a state
    Wait {
        name: String,
        #[arg(long, default_value = "running")]
        state: WorkspaceState,
        #[arg(long, default_value_t = 20)]
        attempts: u32,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn api_client(settings: &Settings) -> Result<WorkspaceApiClient> {
    let api = settings
        .api_config()
        .context("workspace API is not configured (set workspaceApiBaseUrl and workspaceApiCredential)")?;
    Ok(WorkspaceApiClient::new(&api, settings.request_timeout())?)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusOutput<'a> {
    workspace_name: String,
    result: &'a devcontainer_launcher_lib::WorkspaceStatusResult,
    button: devcontainer_launcher_lib::ButtonState,
    open_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };

    match cli.command {
        Command::Verify => {
            let user = api_client(&settings)?.verify_connection().await?;
            print_json(&user)?;
        }
        Command::Status { owner, repo, branch } => {
            let ctx = RepositoryContext::new(&owner, &repo, branch.as_deref(), &settings.default_branch);
            let result = check_workspace(&settings, &ctx.repository, &ctx.branch).await;
            let launch_url = launch_url_for(&settings, &ctx);
            let output = StatusOutput {
                workspace_name: derive_workspace_name(&ctx.repository, &ctx.branch),
                result: &result,
                button: derive_button_state(&result, launch_url.as_deref()),
                open_url: launch_target(&result, launch_url.as_deref()),
            };
            print_json(&output)?;
        }
        Command::Start { workspace_id } => {
            api_client(&settings)?.start_workspace(&workspace_id).await?;
            eprintln!("Start requested for {workspace_id}");
        }
        Command::Stop { workspace_id } => {
            api_client(&settings)?.stop_workspace(&workspace_id).await?;
            eprintln!("Stop requested for {workspace_id}");
        }
        Command::Templates => {
            let templates = api_client(&settings)?.list_templates().await?;
            print_json(&templates)?;
        }
        Command::Name { repo, branch } => {
            println!("{}", derive_workspace_name(&repo, &branch));
        }
        Command::LaunchUrl { owner, repo, branch } => {
            let ctx = RepositoryContext::new(&owner, &repo, branch.as_deref(), &settings.default_branch);
            let url = launch_url_for(&settings, &ctx)
                .context("no launcher template configured and no workspace API to fall back to")?;
            println!("{url}");
        }
        Command::Wait { name, state, attempts } => {
            let policy = WaitPolicy {
                max_attempts: attempts,
                ..WaitPolicy::default()
            };
            let workspace = wait_for_state(&api_client(&settings)?, &name, state, &policy).await?;
            print_json(&workspace)?;
        }
    }

    Ok(())
}
