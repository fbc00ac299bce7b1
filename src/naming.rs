//! Canonical workspace names.
//!
//! A workspace is looked up and created under the same name, so every caller
//! goes through [`derive_workspace_name`].

/// Name-length limit enforced by the workspace service.
pub const MAX_WORKSPACE_NAME_LEN: usize = 32;

/// Map `(repository, branch)` to a workspace name.
///
/// Lowercases `"{repository}-{branch}"`, replaces everything outside
/// `[a-z0-9-]` with `-`, collapses runs of `-`, trims leading/trailing `-`
/// and truncates to [`MAX_WORKSPACE_NAME_LEN`]. Returns an empty string when
/// nothing usable remains.
pub fn derive_workspace_name(repository: &str, branch: &str) -> String {
    let raw = format!("{repository}-{branch}").to_lowercase();

    let mut name = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' };
        if c == '-' && (name.is_empty() || name.ends_with('-')) {
            continue;
        }
        name.push(c);
    }

    // ASCII only from here on, so byte truncation is safe
    name.truncate(MAX_WORKSPACE_NAME_LEN);
    name.trim_end_matches('-').to_string()
}
