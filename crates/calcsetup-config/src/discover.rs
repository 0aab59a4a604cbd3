//! Discovery of `calcsetup.yaml`.
//!
//! The file is searched for by walking up the directory tree from the
//! working directory, the way version control tools find their root.

use std::path::{Path, PathBuf};

/// The configuration file name.
pub const CONFIG_FILE_NAME: &str = "calcsetup.yaml";

/// The environment variable that overrides discovery.
const CONFIG_ENV: &str = "CALCSETUP_CONFIG";

/// Walk up the directory tree from `start` looking for `calcsetup.yaml`.
///
/// `CALCSETUP_CONFIG` is checked first and wins if it names an existing
/// file. Returns `None` if the filesystem root is reached without a match.
///
/// # Examples
///
/// ```no_run
/// use calcsetup_config::discover::find_config_file;
/// use std::path::Path;
///
/// if let Some(path) = find_config_file(Path::new(".")) {
///     println!("Using {}", path.display());
/// }
/// ```
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        let env_path = PathBuf::from(env_path);
        if env_path.is_file() {
            return Some(env_path);
        }
    }
    find_config_file_from(start)
}

/// Like [`find_config_file`] but ignores the environment.
pub fn find_config_file_from(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().ok()?;

    let mut current = start.as_path();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) if parent != current => current = parent,
            _ => break,
        }
    }

    None
}
