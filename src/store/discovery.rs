//! Config path resolution.
//!
//! Resolution: explicit `--config` → `--global` → project-local file in the
//! working directory → `~/.oci-context/config.yml`.

use std::path::{Path, PathBuf};

use super::error::{StoreError, StoreResult};
use super::home_dir;

/// Project-local candidates, checked in order.
const PROJECT_CANDIDATES: &[&str] = &[
    ".oci-context.yml",
    ".oci-context.json",
    ".oci-context/config.yml",
    ".oci-context/config.json",
    "oci-context.yml",
    "oci-context.json",
    "oci-context/config.yml",
    "oci-context/config.json",
];

/// `~/.oci-context/config.yml`.
pub fn global_config_path() -> StoreResult<PathBuf> {
    home_dir()
        .map(|h| h.join(".oci-context").join("config.yml"))
        .ok_or_else(|| {
            StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "HOME is not set",
            ))
        })
}

/// Resolve the config path from flags and the current directory.
pub fn resolve_config_path(explicit: Option<&Path>, global: bool) -> StoreResult<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    if global {
        return global_config_path();
    }
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(found) = find_project_config(&cwd) {
            return Ok(found);
        }
    }
    global_config_path()
}

/// First project-local config file under `dir`, if any.
pub fn find_project_config(dir: &Path) -> Option<PathBuf> {
    PROJECT_CANDIDATES
        .iter()
        .map(|rel| dir.join(rel))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_wins() {
        let p = resolve_config_path(Some(Path::new("/etc/x.yml")), true).unwrap();
        assert_eq!(p, PathBuf::from("/etc/x.yml"));
    }

    #[test]
    fn project_candidates_in_order() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".oci-context")).unwrap();
        std::fs::write(dir.path().join(".oci-context/config.yml"), "").unwrap();
        std::fs::write(dir.path().join("oci-context.yml"), "").unwrap();
        assert_eq!(
            find_project_config(dir.path()).unwrap(),
            dir.path().join(".oci-context/config.yml")
        );
    }

    #[test]
    fn directories_are_not_candidates() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".oci-context.yml")).unwrap();
        assert!(find_project_config(dir.path()).is_none());
    }
}
