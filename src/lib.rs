//! Workspace integration for the "Launch Devcontainer" button.
//!
//! Given a repository and branch scraped from a Git hosting page, this crate
//! derives the canonical workspace name, asks the workspace API whether that
//! workspace exists, maps the answer to a button state, and builds the
//! launcher URL used when it does not.

pub mod backoff;
pub mod button;
pub mod config;
pub mod launch_url;
pub mod lifecycle;
pub mod naming;
pub mod repo_context;
pub mod status;
pub mod workspace_api;

#[cfg(test)]
mod test_support;

pub use button::{derive_button_state, launch_target, ButtonAction, ButtonState};
pub use config::{ApiConfig, Settings};
pub use launch_url::{build_launch_url, ssh_clone_url, LaunchParams};
pub use lifecycle::{start_and_wait, stop_and_wait, wait_for_state, WaitError, WaitPolicy};
pub use naming::{derive_workspace_name, MAX_WORKSPACE_NAME_LEN};
pub use repo_context::RepositoryContext;
pub use status::{check_workspace, FoundWorkspace, WorkspaceState, WorkspaceStatusResult};
pub use workspace_api::{
    CurrentUser, Template, Transition, Workspace, WorkspaceApiClient, WorkspaceApiError,
};

/// Launcher URL for `ctx`, or `None` when no template can be resolved.
pub fn launch_url_for(settings: &Settings, ctx: &RepositoryContext) -> Option<String> {
    let template = settings.effective_launcher_template()?;
    let params = LaunchParams::for_context(ctx, &settings.base_url);
    Some(build_launch_url(&template, &params))
}

/// Status check plus button derivation for one render cycle.
pub async fn resolve_button(settings: &Settings, ctx: &RepositoryContext) -> (WorkspaceStatusResult, ButtonState) {
    let result = check_workspace(settings, &ctx.repository, &ctx.branch).await;
    let launch_url = launch_url_for(settings, ctx);
    let button = derive_button_state(&result, launch_url.as_deref());
    (result, button)
}
