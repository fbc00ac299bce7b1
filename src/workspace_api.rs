//! Client for the remote workspace-orchestration API.
//!
//! Wraps four endpoints:
//! - `GET  /api/v2/users/me`: credential check
//! - `GET  /api/v2/workspaces?q=name:<name>`: workspace search
//! - `POST /api/v2/workspaces/{id}/builds`: start/stop transitions
//! - `GET  /api/v2/templates`: template listing
//!
//! Every operation returns a structured `Result`; transport failures, non-2xx
//! statuses and undecodable bodies all become a [`WorkspaceApiError`]. The
//! client never retries.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ApiConfig;

/// Header carrying the session credential.
pub const AUTH_HEADER: &str = "Coder-Session-Token";

/// Error bodies end up in UI tooltips; longer bodies are cut to this many chars.
pub const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceApiError {
    /// 401: the credential is wrong or has expired; the caller should ask for a new one.
    #[error("API token is invalid or expired")]
    Unauthorized,
    /// 404 from the credential check: the base URL most likely does not point at the API.
    #[error("Workspace API not found at this URL")]
    NotFound,
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Transport(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl WorkspaceApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentUser {
    pub username: String,
    pub email: String,
}

/// Most recent build of a workspace. `status` is the outcome, `transition`
/// the change that was requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceBuild {
    pub status: Option<String>,
    pub transition: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub owner_name: String,
    pub template_name: String,
    pub template_display_name: String,
    pub latest_build: Option<WorkspaceBuild>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// The server sends `"workspaces": null` when nothing matches.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WorkspacesResponse {
    workspaces: Option<Vec<Workspace>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub icon: String,
}

/// Template listing arrives either as a bare array or wrapped in an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum TemplatesResponse {
    List(Vec<Template>),
    Wrapped { templates: Vec<Template> },
}

/// A requested state change for a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Start,
    Stop,
}

#[derive(Serialize)]
struct BuildRequest {
    transition: Transition,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

fn truncate_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}

/// Authenticated client bound to one API base URL and credential.
#[derive(Clone)]
pub struct WorkspaceApiClient {
    base_url: String,
    credential: String,
    http: Client,
}

impl std::fmt::Debug for WorkspaceApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceApiClient")
            .field("base_url", &self.base_url)
            .field("credential", &"<redacted>")
            .finish()
    }
}

impl WorkspaceApiClient {
    pub fn new(api: &ApiConfig, timeout: Duration) -> Result<Self, WorkspaceApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("devcontainer-launcher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WorkspaceApiError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: api.base_url.trim_end_matches('/').to_string(),
            credential: api.credential.clone(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(AUTH_HEADER, &self.credential)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Send a request and turn 401 and other non-2xx statuses into errors.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, WorkspaceApiError> {
        let response = self
            .authed(builder)
            .send()
            .await
            .map_err(WorkspaceApiError::from_reqwest)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("workspace API rejected the credential");
            return Err(WorkspaceApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkspaceApiError::Http {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, WorkspaceApiError> {
        let response = self.send(self.http.get(url)).await?;
        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                WorkspaceApiError::Timeout
            } else {
                WorkspaceApiError::Decode(e.to_string())
            }
        })
    }

    /// Check the credential against the current-user endpoint.
    pub async fn verify_connection(&self) -> Result<CurrentUser, WorkspaceApiError> {
        debug!(base_url = %self.base_url, "verifying workspace API connection");
        self.get_json(&self.url("/api/v2/users/me"))
            .await
            .map_err(|e| match e {
                WorkspaceApiError::Http { status: 404, .. } => WorkspaceApiError::NotFound,
                other => other,
            })
    }

    /// Find the workspace named exactly `name`.
    ///
    /// The server-side name filter is not guaranteed to be exact, so the
    /// candidates are filtered again here.
    pub async fn find_workspace(&self, name: &str) -> Result<Option<Workspace>, WorkspaceApiError> {
        let mut url = url::Url::parse(&self.url("/api/v2/workspaces"))
            .map_err(|e| WorkspaceApiError::Transport(format!("invalid API URL: {e}")))?;
        url.query_pairs_mut().append_pair("q", &format!("name:{name}"));

        debug!(name, "searching workspaces");
        let response: WorkspacesResponse = self.get_json(url.as_str()).await?;
        let found = response
            .workspaces
            .unwrap_or_default()
            .into_iter()
            .find(|w| w.name == name);
        debug!(name, found = found.is_some(), "workspace search finished");
        Ok(found)
    }

    /// Request a build transition. Succeeds once the server accepts the
    /// request; does not wait for the transition to finish.
    pub async fn transition_workspace(
        &self,
        workspace_id: &str,
        transition: Transition,
    ) -> Result<(), WorkspaceApiError> {
        let url = self.url(&format!(
            "/api/v2/workspaces/{}/builds",
            urlencoding::encode(workspace_id)
        ));
        debug!(workspace_id, ?transition, "requesting workspace transition");
        self.send(self.http.post(url).json(&BuildRequest { transition }))
            .await?;
        Ok(())
    }

    pub async fn start_workspace(&self, workspace_id: &str) -> Result<(), WorkspaceApiError> {
        self.transition_workspace(workspace_id, Transition::Start).await
    }

    pub async fn stop_workspace(&self, workspace_id: &str) -> Result<(), WorkspaceApiError> {
        self.transition_workspace(workspace_id, Transition::Stop).await
    }

    pub async fn list_templates(&self) -> Result<Vec<Template>, WorkspaceApiError> {
        let response: TemplatesResponse = self.get_json(&self.url("/api/v2/templates")).await?;
        Ok(match response {
            TemplatesResponse::List(templates) => templates,
            TemplatesResponse::Wrapped { templates } => templates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> WorkspaceApiClient {
        let api = ApiConfig {
            base_url: format!("{}/", server.url()),
            credential: "tok".to_string(),
        };
        WorkspaceApiClient::new(&api, Duration::from_secs(5)).unwrap()
    }

    fn workspace_json(name: &str) -> serde_json::Value {
        serde_json::json!({
            "id": format!("id-{name}"),
            "name": name,
            "owner_name": "alice",
            "template_name": "devcontainer",
            "latest_build": { "status": "running", "transition": "start" },
            "last_used_at": "2026-10-01T12:00:00Z"
        })
    }

    #[test]
    fn unauthorized_message_is_distinguishable() {
        let msg = WorkspaceApiError::Unauthorized.to_string();
        assert!(msg.contains("invalid or expired"));
        assert!(WorkspaceApiError::Unauthorized.is_auth());
        assert!(!WorkspaceApiError::Timeout.is_auth());
    }

    #[test]
    fn debug_output_hides_credential() {
        let api = ApiConfig {
            base_url: "https://coder.example.com".to_string(),
            credential: "super-secret".to_string(),
        };
        let client = WorkspaceApiClient::new(&api, Duration::from_secs(1)).unwrap();
        assert!(!format!("{client:?}").contains("super-secret"));
    }

    #[test]
    fn transition_serializes_lowercase() {
        let body = serde_json::to_string(&BuildRequest { transition: Transition::Stop }).unwrap();
        assert_eq!(body, r#"{"transition":"stop"}"#);
    }

    #[tokio::test]
    async fn verify_connection_returns_user() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/users/me")
            .match_header(AUTH_HEADER, "tok")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"u1","username":"alice","email":"alice@example.com"}"#)
            .create_async()
            .await;

        let user = client_for(&server).verify_connection().await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn verify_connection_maps_401() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/users/me")
            .with_status(401)
            .create_async()
            .await;

        let err = client_for(&server).verify_connection().await.unwrap_err();
        assert_eq!(err, WorkspaceApiError::Unauthorized);
    }

    #[tokio::test]
    async fn verify_connection_maps_404() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/users/me")
            .with_status(404)
            .create_async()
            .await;

        let err = client_for(&server).verify_connection().await.unwrap_err();
        assert_eq!(err, WorkspaceApiError::NotFound);
    }

    #[tokio::test]
    async fn verify_connection_passes_through_other_failures() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/users/me")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let err = client_for(&server).verify_connection().await.unwrap_err();
        assert_eq!(
            err,
            WorkspaceApiError::Http {
                status: 502,
                body: "bad gateway".to_string()
            }
        );
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        // Bind then drop so the port is known to refuse connections
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let api = ApiConfig {
            base_url: format!("http://127.0.0.1:{port}"),
            credential: "tok".to_string(),
        };
        let client = WorkspaceApiClient::new(&api, Duration::from_secs(5)).unwrap();
        let err = client.verify_connection().await.unwrap_err();
        assert!(matches!(err, WorkspaceApiError::Transport(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let addr = crate::test_support::silent_server().await;
        let api = ApiConfig {
            base_url: format!("http://{addr}"),
            credential: "tok".to_string(),
        };
        let client = WorkspaceApiClient::new(&api, Duration::from_secs(1)).unwrap();

        let started = std::time::Instant::now();
        let err = client.find_workspace("api-main").await.unwrap_err();
        assert_eq!(err, WorkspaceApiError::Timeout);
        assert!(started.elapsed() < Duration::from_secs(5), "took {:?}", started.elapsed());
    }

    #[tokio::test]
    async fn long_error_bodies_are_truncated() {
        let mut server = mockito::Server::new_async().await;
        let page = format!("<html>{}</html>", "x".repeat(5_000));
        let _mock = server
            .mock("GET", "/api/v2/users/me")
            .with_status(500)
            .with_body(page)
            .create_async()
            .await;

        let err = client_for(&server).verify_connection().await.unwrap_err();
        let WorkspaceApiError::Http { status, body } = err else {
            panic!("expected http error, got {err:?}");
        };
        assert_eq!(status, 500);
        assert_eq!(body.chars().count(), MAX_ERROR_BODY_CHARS + 1);
        assert!(body.starts_with("<html>xxx") && body.ends_with('…'));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let body = "é".repeat(MAX_ERROR_BODY_CHARS + 10);
        let cut = truncate_body(&body);
        assert_eq!(cut.chars().filter(|c| *c == 'é').count(), MAX_ERROR_BODY_CHARS);
        assert_eq!(truncate_body("  short  "), "short");
    }

    #[tokio::test]
    async fn find_workspace_requires_exact_name() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "workspaces": [workspace_json("foo-bar-2"), workspace_json("foo-bar")],
            "count": 2
        });
        let mock = server
            .mock("GET", "/api/v2/workspaces")
            .match_query(Matcher::UrlEncoded("q".into(), "name:foo-bar".into()))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let ws = client_for(&server).find_workspace("foo-bar").await.unwrap().unwrap();
        assert_eq!(ws.name, "foo-bar");
        assert_eq!(ws.id, "id-foo-bar");
        assert_eq!(ws.owner_name, "alice");
        assert_eq!(
            ws.latest_build.and_then(|b| b.status).as_deref(),
            Some("running")
        );
        assert!(ws.last_used_at.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn find_workspace_ignores_prefix_matches() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({ "workspaces": [workspace_json("foo-bar-2")] });
        let _mock = server
            .mock("GET", "/api/v2/workspaces")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let ws = client_for(&server).find_workspace("foo-bar").await.unwrap();
        assert!(ws.is_none());
    }

    #[tokio::test]
    async fn find_workspace_tolerates_null_list() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/workspaces")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"workspaces":null,"count":0}"#)
            .create_async()
            .await;

        assert!(client_for(&server).find_workspace("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_workspace_reports_undecodable_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/workspaces")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>login</html>")
            .create_async()
            .await;

        let err = client_for(&server).find_workspace("x").await.unwrap_err();
        assert!(matches!(err, WorkspaceApiError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn start_workspace_posts_transition() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/workspaces/ws-1/builds")
            .match_header(AUTH_HEADER, "tok")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({ "transition": "start" })))
            .with_status(201)
            .with_body(r#"{"id":"build-1"}"#)
            .expect(1)
            .create_async()
            .await;

        client_for(&server).start_workspace("ws-1").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn stop_workspace_posts_transition() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/workspaces/ws-1/builds")
            .match_body(Matcher::Json(serde_json::json!({ "transition": "stop" })))
            .with_status(201)
            .create_async()
            .await;

        client_for(&server).stop_workspace("ws-1").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn start_workspace_failure_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/workspaces/ws-1/builds")
            .with_status(500)
            .with_body("boom")
            .expect(1)
            .create_async()
            .await;

        let err = client_for(&server).start_workspace("ws-1").await.unwrap_err();
        assert!(matches!(err, WorkspaceApiError::Http { status: 500, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn stop_workspace_maps_401() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/workspaces/ws-1/builds")
            .with_status(401)
            .create_async()
            .await;

        let err = client_for(&server).stop_workspace("ws-1").await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn list_templates_accepts_bare_array() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/templates")
            .with_status(200)
            .with_body(
                r#"[{"id":"t1","name":"devcontainer","display_name":"Dev Container",
                    "description":"Docker devcontainer","icon":"/icon/docker.svg","active_version_id":"v1"}]"#,
            )
            .create_async()
            .await;

        let templates = client_for(&server).list_templates().await.unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].display_name, "Dev Container");
        assert_eq!(templates[0].icon, "/icon/docker.svg");
    }

    #[tokio::test]
    async fn list_templates_accepts_wrapped_list() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/templates")
            .with_status(200)
            .with_body(r#"{"templates":[{"id":"t1","name":"base"}]}"#)
            .create_async()
            .await;

        let templates = client_for(&server).list_templates().await.unwrap();
        assert_eq!(templates[0].name, "base");
        assert_eq!(templates[0].description, "");
    }
}
