use serde::{Deserialize, Serialize};

/// Repository identity captured from the current page.
///
/// Captured fresh for each render; may be re-resolved at click time since
/// the displayed branch can change without a page reload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryContext {
    pub owner: String,
    pub repository: String,
    pub branch: String,
}

impl RepositoryContext {
    /// Build a context, substituting `default_branch` when `branch` is blank.
    pub fn new(owner: &str, repository: &str, branch: Option<&str>, default_branch: &str) -> Self {
        let branch = branch
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(default_branch);
        Self {
            owner: owner.trim().to_string(),
            repository: repository.trim().to_string(),
            branch: branch.to_string(),
        }
    }

    /// Parse `(owner, repository)` out of a git remote URL for any host.
    ///
    /// Supports SSH (`git@host:owner/repo.git`, `ssh://git@host:22/owner/repo.git`)
    /// and HTTP(S) (`https://host/owner/repo.git`). Extra path segments after
    /// the repository (e.g. `/src/branch/main`) are ignored.
    pub fn from_remote_url(url: &str, branch: Option<&str>, default_branch: &str) -> Option<Self> {
        let (owner, repo) = parse_remote_url(url)?;
        Some(Self::new(&owner, &repo, branch, default_branch))
    }
}

fn split_owner_repo(path: &str) -> Option<(String, String)> {
    let path = path.trim_matches('/');
    let mut parts = path.splitn(3, '/');
    let owner = parts.next()?;
    let repo = parts.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

pub(crate) fn parse_remote_url(url: &str) -> Option<(String, String)> {
    let url = url.trim();

    // scp-like SSH: git@host:owner/repo.git
    if !url.contains("://")
        && let Some((_, path)) = url.split_once(':')
    {
        return split_owner_repo(path);
    }

    let parsed = url::Url::parse(url).ok()?;
    match parsed.scheme() {
        "http" | "https" | "ssh" | "git" => split_owner_repo(parsed.path()),
        _ => None,
    }
}
