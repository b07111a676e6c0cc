//! Executable discovery on an explicit search path.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Find an executable, honoring an override environment variable.
///
/// The search order is: the value of `env_var` (if set and non-empty,
/// resolved against `search_paths` exactly like a candidate name), then
/// each name in `candidates` in priority order. The first name that
/// resolves wins; there is no attempt to pick a "best" match.
///
/// Fails with [`Error::ToolNotFound`] naming the override variable and
/// every candidate when nothing resolves.
pub fn find_program(
    env_var: &str,
    candidates: &[&str],
    search_paths: &[PathBuf],
) -> Result<PathBuf> {
    let override_name = std::env::var(env_var).ok().filter(|v| !v.is_empty());

    let names = override_name
        .iter()
        .map(String::as_str)
        .chain(candidates.iter().copied());

    for name in names {
        if let Some(path) = resolve(name, search_paths) {
            tracing::debug!(name, path = %path.display(), "resolved executable");
            return Ok(path);
        }
    }

    Err(Error::ToolNotFound {
        env_var: env_var.to_string(),
        candidates: candidates.iter().map(|c| c.to_string()).collect(),
    })
}

fn resolve(name: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
    let joined = std::env::join_paths(search_paths).ok()?;
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    which::which_in(name, Some(joined), cwd).ok()
}

/// Split a `PATH`-style value into its component directories.
pub fn split_search_path(value: &std::ffi::OsStr) -> Vec<PathBuf> {
    std::env::split_paths(value).collect()
}

/// The process's current search path, or empty if `PATH` is unset.
pub fn process_search_paths() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|p| split_search_path(&p))
        .unwrap_or_default()
}
