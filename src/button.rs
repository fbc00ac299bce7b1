use serde::Serialize;

use crate::status::{WorkspaceState, WorkspaceStatusResult};

/// What a click on the button should do.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum ButtonAction {
    /// Open an existing workspace in the browser.
    Open(String),
    /// Request a start transition for this workspace id.
    Start(String),
    /// Open the launcher URL to create a workspace.
    Launch(String),
    /// Nothing to do (transition in flight, or no launcher configured).
    None,
}

/// Pre-computed button label, style and click action for the UI
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonState {
    pub label: String,
    pub css_class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    pub action: ButtonAction,
}

impl ButtonState {
    fn new(label: &str, css_class: &str, action: ButtonAction) -> Self {
        Self {
            label: label.to_string(),
            css_class: css_class.to_string(),
            tooltip: None,
            action,
        }
    }

    fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

fn launch_button(label: &str, css_class: &str, launch_url: Option<&str>) -> ButtonState {
    match launch_url {
        Some(url) if !url.is_empty() => {
            ButtonState::new(label, css_class, ButtonAction::Launch(url.to_string()))
        }
        _ => ButtonState::new(label, css_class, ButtonAction::None)
            .with_tooltip("No launcher URL configured"),
    }
}

/// Derive the button for a status result.
///
/// The button is never hidden: failures degrade to a "launch anyway"
/// affordance pointing at `launch_url`.
pub fn derive_button_state(result: &WorkspaceStatusResult, launch_url: Option<&str>) -> ButtonState {
    match result {
        WorkspaceStatusResult::Found(found) => match found.workspace_state {
            WorkspaceState::Running => ButtonState::new(
                "Open Workspace",
                "running",
                ButtonAction::Open(found.workspace_url.clone()),
            ),
            WorkspaceState::Stopped => ButtonState::new(
                "Start Workspace",
                "stopped",
                ButtonAction::Start(found.workspace_id.clone()),
            ),
            WorkspaceState::Failed | WorkspaceState::Canceled => ButtonState::new(
                "Start Workspace",
                found.workspace_state.as_str(),
                ButtonAction::Start(found.workspace_id.clone()),
            )
            .with_tooltip(format!("Last build {}", found.workspace_state)),
            WorkspaceState::Starting => {
                ButtonState::new("Starting…", "starting", ButtonAction::None)
            }
            WorkspaceState::Stopping => {
                ButtonState::new("Stopping…", "stopping", ButtonAction::None)
            }
            // Gone or unreadable: treat like a missing workspace
            WorkspaceState::Deleted | WorkspaceState::Unknown => {
                launch_button("Create Workspace", "missing", launch_url)
            }
        },
        WorkspaceStatusResult::Missing { workspace_name } => {
            launch_button("Create Workspace", "missing", launch_url)
                .with_tooltip(format!("No workspace named {workspace_name} yet"))
        }
        WorkspaceStatusResult::Unconfigured => {
            launch_button("Launch Devcontainer", "default", launch_url)
        }
        WorkspaceStatusResult::Error { message, reauthenticate } => {
            let css = if *reauthenticate { "auth-error" } else { "error" };
            launch_button("Launch anyway", css, launch_url)
                .with_tooltip(message.clone())
        }
    }
}

/// URL to open on click: the running workspace itself, otherwise the launcher.
pub fn launch_target(result: &WorkspaceStatusResult, launch_url: Option<&str>) -> Option<String> {
    match result {
        WorkspaceStatusResult::Found(found) if found.workspace_state == WorkspaceState::Running => {
            Some(found.workspace_url.clone())
        }
        _ => launch_url.filter(|u| !u.is_empty()).map(str::to_string),
    }
}
