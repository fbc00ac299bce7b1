use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the settings store inside [`config_dir`].
pub const SETTINGS_FILE: &str = "settings.json";

/// Environment variable that overrides the stored workspace-API base URL.
pub const API_URL_ENV: &str = "DEVCONTAINER_LAUNCHER_API_URL";
/// Environment variable that overrides the stored workspace-API credential.
pub const API_TOKEN_ENV: &str = "DEVCONTAINER_LAUNCHER_API_TOKEN";

const DEFAULT_BRANCH: &str = "main";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Get the config directory using platform-appropriate location.
///
/// - macOS: `~/Library/Application Support/devcontainer-launcher/`
/// - Linux: `~/.config/devcontainer-launcher/` (or `$XDG_CONFIG_HOME`)
/// - Windows: `%APPDATA%/devcontainer-launcher/`
///
/// Falls back to `~/.devcontainer-launcher/` if platform dir is unavailable.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("devcontainer-launcher"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".devcontainer-launcher")
        })
}

/// Read a JSON settings file, falling back to `T::default()`.
///
/// A missing file is the normal first-run case and stays quiet. An
/// unreadable or corrupt file is logged, then replaced by defaults.
pub fn load_json_from<T: DeserializeOwned + Default>(path: &Path) -> T {
    let content = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), "could not read settings: {e}");
            return T::default();
        }
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::error!(path = %path.display(), "corrupt settings, using defaults: {e}");
        T::default()
    })
}

/// Write `config` as pretty JSON to `path`, replacing any previous file.
///
/// The file holds the workspace API credential, so on Unix the temp file
/// is created owner-only before any bytes land in it.
pub fn save_json_to<T: Serialize>(path: &Path, config: &T) -> Result<(), String> {
    use std::io::Write;

    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create settings directory: {e}"))?;

    let json = serde_json::to_vec_pretty(config)
        .map_err(|e| format!("Failed to serialize settings: {e}"))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| SETTINGS_FILE.to_string());
    let temp = dir.join(format!(".{file_name}.{}.tmp", std::process::id()));

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let written = options
        .open(&temp)
        .and_then(|mut file| {
            file.write_all(&json)?;
            file.sync_all()
        })
        .and_then(|()| std::fs::rename(&temp, path));

    if let Err(e) = written {
        // Never leave a half-written temp file next to the settings
        let _ = std::fs::remove_file(&temp);
        return Err(format!("Failed to write settings {}: {e}", path.display()));
    }
    tracing::debug!(path = %path.display(), "settings saved");
    Ok(())
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Everything the launcher reads at startup. Passed explicitly into every
/// operation; nothing in the crate reads settings from ambient state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Base URL of the Git hosting server (used for SSH clone URLs).
    pub base_url: String,
    /// Launcher URL with `{ssh_url}`, `{branch}`, `{repo}`, `{owner}`, `{name}` placeholders.
    pub launcher_url_template: String,
    pub workspace_api_base_url: Option<String>,
    pub workspace_api_credential: Option<String>,
    /// Branch assumed when the page does not expose one.
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            launcher_url_template: String::new(),
            workspace_api_base_url: None,
            workspace_api_credential: None,
            default_branch: default_branch(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Connection parameters for the workspace API, present only when configured.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL without a trailing `/`.
    pub base_url: String,
    pub credential: String,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("credential", &"<redacted>")
            .finish()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl Settings {
    /// Load settings from the default store and apply environment overrides.
    pub fn load() -> Self {
        Self::load_from(&config_dir().join(SETTINGS_FILE))
    }

    /// Load settings from `path` and apply environment overrides.
    pub fn load_from(path: &Path) -> Self {
        let mut settings: Settings = load_json_from(path);
        settings.apply_env_overrides();
        settings
    }

    /// Persist settings into the default store.
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&config_dir().join(SETTINGS_FILE))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        save_json_to(path, self)
    }

    /// Replace API URL/credential with non-empty environment values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV)
            && !url.trim().is_empty()
        {
            self.workspace_api_base_url = Some(url);
        }
        if let Ok(token) = std::env::var(API_TOKEN_ENV)
            && !token.trim().is_empty()
        {
            self.workspace_api_credential = Some(token);
        }
    }

    /// True only when both the API base URL and the credential are present.
    pub fn is_configured(&self) -> bool {
        self.api_config().is_some()
    }

    pub fn api_config(&self) -> Option<ApiConfig> {
        let base_url = non_blank(self.workspace_api_base_url.as_deref())?;
        let credential = non_blank(self.workspace_api_credential.as_deref())?;
        Some(ApiConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: credential.to_string(),
        })
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// The launcher template to use, falling back to the workspace API's
    /// devcontainer template page when none is configured.
    pub fn effective_launcher_template(&self) -> Option<String> {
        if let Some(template) = non_blank(Some(self.launcher_url_template.as_str())) {
            return Some(template.to_string());
        }
        let api = non_blank(self.workspace_api_base_url.as_deref())?;
        Some(format!(
            "{}/templates/devcontainer/workspace?mode=manual&name={{name}}&param.repo={{ssh_url}}&param.branch={{branch}}",
            api.trim_end_matches('/')
        ))
    }
}
