//! Waiting for a workspace transition to land.
//!
//! Start/stop requests return as soon as the server accepts them. Callers
//! that need the result poll here with a bounded attempt count.

use thiserror::Error;
use tracing::debug;

use crate::backoff::Backoff;
use crate::status::WorkspaceState;
use crate::workspace_api::{Workspace, WorkspaceApiClient, WorkspaceApiError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            backoff: Backoff::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    #[error("workspace {name} still {last} after {attempts} checks")]
    Exhausted {
        name: String,
        last: WorkspaceState,
        attempts: u32,
    },
    #[error("workspace {0} no longer exists")]
    Vanished(String),
    #[error("workspace {name} ended in state {state}")]
    Ended { name: String, state: WorkspaceState },
    #[error(transparent)]
    Api(#[from] WorkspaceApiError),
}

/// Poll `name` until it reaches `target`.
///
/// Stops early when the workspace disappears, lands in a failure state
/// other than `target`, or the API errors.
pub async fn wait_for_state(
    client: &WorkspaceApiClient,
    name: &str,
    target: WorkspaceState,
    policy: &WaitPolicy,
) -> Result<Workspace, WaitError> {
    let attempts = policy.max_attempts.max(1);
    let mut last = WorkspaceState::Unknown;

    for attempt in 0..attempts {
        let Some(workspace) = client.find_workspace(name).await? else {
            return Err(WaitError::Vanished(name.to_string()));
        };

        last = WorkspaceState::of(&workspace);
        debug!(workspace = name, attempt, state = %last, %target, "polled workspace");
        if last == target {
            return Ok(workspace);
        }
        if last.is_failure() {
            return Err(WaitError::Ended {
                name: name.to_string(),
                state: last,
            });
        }

        if attempt + 1 < attempts {
            tokio::time::sleep(policy.backoff.delay(attempt)).await;
        }
    }

    Err(WaitError::Exhausted {
        name: name.to_string(),
        last,
        attempts,
    })
}

/// Request a start and wait until the workspace is running.
pub async fn start_and_wait(
    client: &WorkspaceApiClient,
    workspace: &Workspace,
    policy: &WaitPolicy,
) -> Result<Workspace, WaitError> {
    client.start_workspace(&workspace.id).await?;
    wait_for_state(client, &workspace.name, WorkspaceState::Running, policy).await
}

/// Request a stop and wait until the workspace is stopped.
pub async fn stop_and_wait(
    client: &WorkspaceApiClient,
    workspace: &Workspace,
    policy: &WaitPolicy,
) -> Result<Workspace, WaitError> {
    client.stop_workspace(&workspace.id).await?;
    wait_for_state(client, &workspace.name, WorkspaceState::Stopped, policy).await
}
