//! Workspace status resolution.
//!
//! One call to [`check_workspace`] per rendered button: derive the workspace
//! name, look it up, and fold the outcome into a [`WorkspaceStatusResult`].
//! Read-only against the remote service, so callers may repeat it freely.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::naming::derive_workspace_name;
use crate::workspace_api::{Workspace, WorkspaceApiClient, WorkspaceApiError};

/// Shown instead of the raw 401 text so the UI can prompt for a new token.
pub const AUTH_EXPIRED_MESSAGE: &str =
    "Workspace API token expired or invalid. Update it in the extension settings.";

/// Returned when repository and branch sanitize down to nothing.
pub const NO_WORKSPACE_NAME_MESSAGE: &str = "No usable workspace name for this repository and branch";

/// UI-facing workspace state, derived from the latest build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceState {
    Running,
    Stopped,
    Starting,
    Stopping,
    Failed,
    Canceled,
    Deleted,
    Unknown,
}

impl WorkspaceState {
    pub const ALL: [WorkspaceState; 8] = [
        Self::Running,
        Self::Stopped,
        Self::Starting,
        Self::Stopping,
        Self::Failed,
        Self::Canceled,
        Self::Deleted,
        Self::Unknown,
    ];

    /// Map a remote build `(status, transition)` pair.
    ///
    /// A recognized status always wins. The transition is only consulted
    /// when the build carries no status at all; an unrecognized status is
    /// `Unknown`.
    pub fn from_build(status: Option<&str>, transition: Option<&str>) -> Self {
        let status = status.map(|s| s.trim().to_ascii_lowercase());
        match status.as_deref() {
            Some("running") => Self::Running,
            Some("stopped") => Self::Stopped,
            Some("starting" | "pending") => Self::Starting,
            Some("stopping") => Self::Stopping,
            Some("failed") => Self::Failed,
            Some("canceling" | "canceled") => Self::Canceled,
            Some("deleting" | "deleted") => Self::Deleted,
            Some(_) => Self::Unknown,
            None => match transition.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
                Some("start") => Self::Starting,
                Some("stop") => Self::Stopping,
                Some("delete") => Self::Deleted,
                _ => Self::Unknown,
            },
        }
    }

    pub fn of(workspace: &Workspace) -> Self {
        match &workspace.latest_build {
            Some(build) => Self::from_build(build.status.as_deref(), build.transition.as_deref()),
            None => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Stopping => "stopping",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Deleted => "deleted",
            Self::Unknown => "unknown",
        }
    }

    /// Starting or stopping: a transition is in flight.
    pub fn is_transitioning(self) -> bool {
        matches!(self, Self::Starting | Self::Stopping)
    }

    /// States a build does not leave on its own.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Canceled | Self::Deleted)
    }
}

impl fmt::Display for WorkspaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkspaceState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown workspace state: {s}"))
    }
}

/// A workspace that exists under the derived name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundWorkspace {
    pub workspace_name: String,
    pub workspace_id: String,
    /// `{api_base}/@{owner}/{name}`
    pub workspace_url: String,
    pub owner_name: String,
    pub template_name: String,
    pub workspace_state: WorkspaceState,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Outcome of one status check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkspaceStatusResult {
    Found(FoundWorkspace),
    Missing {
        #[serde(rename = "workspaceName")]
        workspace_name: String,
    },
    /// Workspace API URL or credential not set; only the launcher link is available.
    Unconfigured,
    Error {
        message: String,
        /// Set when the credential was rejected and should be re-entered.
        reauthenticate: bool,
    },
}

impl WorkspaceStatusResult {
    fn from_error(e: &WorkspaceApiError) -> Self {
        if e.is_auth() {
            Self::Error {
                message: AUTH_EXPIRED_MESSAGE.to_string(),
                reauthenticate: true,
            }
        } else {
            Self::Error {
                message: e.to_string(),
                reauthenticate: false,
            }
        }
    }
}

/// Browser URL of a workspace.
pub fn workspace_url(api_base_url: &str, owner: &str, name: &str) -> String {
    format!("{}/@{owner}/{name}", api_base_url.trim_end_matches('/'))
}

/// Resolve the workspace for `(repository, branch)`.
///
/// Returns `Unconfigured` without touching the network when the workspace
/// API is not set up.
pub async fn check_workspace(settings: &Settings, repository: &str, branch: &str) -> WorkspaceStatusResult {
    let Some(api) = settings.api_config() else {
        debug!("workspace API not configured, skipping status check");
        return WorkspaceStatusResult::Unconfigured;
    };
    match WorkspaceApiClient::new(&api, settings.request_timeout()) {
        Ok(client) => check_workspace_with(&client, repository, branch).await,
        Err(e) => {
            warn!("failed to build workspace API client: {e}");
            WorkspaceStatusResult::from_error(&e)
        }
    }
}

/// [`check_workspace`] against an existing client.
pub async fn check_workspace_with(
    client: &WorkspaceApiClient,
    repository: &str,
    branch: &str,
) -> WorkspaceStatusResult {
    let name = derive_workspace_name(repository, branch);
    if name.is_empty() {
        // An empty name filter would match every workspace on the server
        warn!(repository, branch, "no usable workspace name, skipping lookup");
        return WorkspaceStatusResult::Error {
            message: NO_WORKSPACE_NAME_MESSAGE.to_string(),
            reauthenticate: false,
        };
    }

    let workspace = match client.find_workspace(&name).await {
        Ok(Some(ws)) => ws,
        Ok(None) => {
            return WorkspaceStatusResult::Missing {
                workspace_name: name,
            };
        }
        Err(e) => {
            warn!(workspace = %name, "workspace status check failed: {e}");
            return WorkspaceStatusResult::from_error(&e);
        }
    };

    let state = WorkspaceState::of(&workspace);
    debug!(workspace = %name, %state, "workspace found");
    WorkspaceStatusResult::Found(FoundWorkspace {
        workspace_url: workspace_url(client.base_url(), &workspace.owner_name, &name),
        workspace_name: name,
        workspace_id: workspace.id,
        owner_name: workspace.owner_name,
        template_name: workspace.template_name,
        workspace_state: state,
        last_used_at: workspace.last_used_at,
    })
}
