//! Configuration and scenario file paths

use std::io;
use std::path::{Path, PathBuf};

/// Name used for the platform project directories
const APP_NAME: &str = "todo-e2e";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/todo-e2e/`
/// - macOS: `~/Library/Application Support/todo-e2e/`
/// - Windows: `%APPDATA%\todo-e2e\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Whether a path looks like a YAML scenario file
pub fn is_scenario_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yml") | Some("yaml")
    )
}

/// Expand files and directories into a sorted list of scenario files
///
/// Directories are searched one level deep; explicit files are kept even
/// without a YAML extension.
pub fn collect_scenario_files(inputs: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_scenario_file(p))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}
