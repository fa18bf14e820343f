//! Platform-specific utilities for cross-platform support

use std::path::{Path, PathBuf};

/// Get the platform-specific config directory
///
/// Returns:
/// - Windows: %APPDATA%\vaultmover
/// - macOS: ~/Library/Application Support/vaultmover
/// - Linux/Other: ~/.config/vaultmover
pub fn get_config_dir() -> PathBuf {
    let base = dirs::config_dir()
        .or_else(dirs::data_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join("vaultmover")
}

/// Get the per-user configuration file, used when no `.import` is found
pub fn get_default_config_path() -> PathBuf {
    get_config_dir().join("import.yml")
}

/// Get the binary name for the current platform
///
/// Returns the name with .exe extension on Windows, without on Unix
pub fn get_binary_name(base: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{}.exe", base)
    } else {
        base.to_string()
    }
}

/// Find an executable named `base` in the directories of `PATH`
pub fn find_in_path(base: &str) -> Option<PathBuf> {
    let name = get_binary_name(base);
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(&name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
