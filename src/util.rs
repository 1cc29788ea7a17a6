//! Shared utility functions used across the codebase.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Return the value of `$HOME`, falling back to `/root`.
pub fn home_dir() -> String {
    std::env::var("HOME").unwrap_or_else(|_| "/root".to_string())
}

/// Expand a leading `~` or `~/` to the home directory. Other paths are
/// returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => PathBuf::from(home_dir()).join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Check if a command can be executed.
///
/// Commands given as a path (containing a separator) are checked directly;
/// bare names are searched for on `PATH`, then looked up with `which`.
/// Touches the filesystem and may spawn a process, so async callers should
/// run it on the blocking pool.
pub fn which_exists(cmd: &str) -> bool {
    if cmd.trim().is_empty() {
        return false;
    }
    if cmd.contains(std::path::MAIN_SEPARATOR) || cmd.contains('/') {
        return is_executable(Path::new(cmd));
    }
    if let Some(path_var) = std::env::var_os("PATH") {
        if find_in_path(cmd, &path_var).is_some() {
            return true;
        }
    }
    std::process::Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Find the first executable named `cmd` in the directories of `path_var`.
pub fn find_in_path(cmd: &str, path_var: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(cmd))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Truncate a log line to at most `max_chars` characters.
pub fn truncate_for_log(line: &str, max_chars: usize) -> String {
    if line.chars().count() > max_chars {
        format!("{}...", line.chars().take(max_chars).collect::<String>())
    } else {
        line.to_string()
    }
}
