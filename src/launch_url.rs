//! Launcher URL construction.
//!
//! Templates carry `{ssh_url}`, `{branch}`, `{repo}`, `{owner}` and `{name}`
//! placeholders. Each value is percent-encoded on its own before insertion;
//! anything else in braces is left as written.

use serde::{Deserialize, Serialize};

use crate::naming::derive_workspace_name;
use crate::repo_context::RepositoryContext;

/// Values substituted into a launcher template.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchParams {
    pub ssh_url: String,
    pub branch: String,
    pub owner: String,
    pub repository: String,
    pub workspace_name: String,
}

impl LaunchParams {
    /// Derive params for `ctx`, using the hosting server's base URL for the clone URL.
    pub fn for_context(ctx: &RepositoryContext, hosting_base_url: &str) -> Self {
        Self {
            ssh_url: ssh_clone_url(hosting_base_url, &ctx.owner, &ctx.repository)
                .unwrap_or_default(),
            branch: ctx.branch.clone(),
            owner: ctx.owner.clone(),
            repository: ctx.repository.clone(),
            workspace_name: derive_workspace_name(&ctx.repository, &ctx.branch),
        }
    }
}

/// Substitute recognized placeholders in `template`.
///
/// Single pass over the template: substituted values are never rescanned,
/// so a branch containing `{owner}` stays literal.
pub fn build_launch_url(template: &str, params: &LaunchParams) -> String {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        let Some(end) = after.find('}') else {
            rest = after;
            break;
        };
        let token = &after[1..end];
        let value = match token {
            "ssh_url" => Some(params.ssh_url.as_str()),
            "branch" => Some(params.branch.as_str()),
            "repo" => Some(params.repository.as_str()),
            "owner" => Some(params.owner.as_str()),
            "name" => Some(params.workspace_name.as_str()),
            _ => None,
        };
        match value {
            Some(v) => {
                out.push_str(&urlencoding::encode(v));
                rest = &after[end + 1..];
            }
            None => {
                // Unknown token: emit the brace and keep scanning after it
                out.push('{');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// SSH clone URL (`git@host:owner/repo.git`) for a repository on the hosting server.
/// Returns `None` when the base URL has no host.
pub fn ssh_clone_url(hosting_base_url: &str, owner: &str, repository: &str) -> Option<String> {
    let parsed = url::Url::parse(hosting_base_url.trim()).ok()?;
    let host = parsed.host_str()?;
    Some(format!("git@{host}:{owner}/{repository}.git"))
}
