//! OCI CLI profile file (`~/.oci/config`).
//!
//! INI-like: `[NAME]` sections with `key=value` lines; `#` and `;` start
//! comments. Only `user`, `tenancy` and `region` are kept.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

/// Minimal profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    /// Falls back to the tenancy id for session-token profiles.
    pub user: String,
    pub tenancy: String,
    pub region: String,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("read profiles: {0}")]
    Io(#[from] std::io::Error),

    #[error("profile {0} missing tenancy")]
    MissingTenancy(String),

    #[error("profile {0} missing region")]
    MissingRegion(String),
}

/// Profiles keyed by name, in name order.
pub type Profiles = BTreeMap<String, Profile>;

/// Read and parse a profile file.
pub fn load_profiles(path: &Path) -> Result<Profiles, ProfileError> {
    let text = std::fs::read_to_string(path)?;
    parse_profiles(&text)
}

/// Parse profile file contents.
pub fn parse_profiles(text: &str) -> Result<Profiles, ProfileError> {
    let mut profiles = Profiles::new();
    let mut current: Option<String> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = section.trim().to_string();
            profiles.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        let (Some(name), Some((key, value))) = (current.as_ref(), line.split_once('=')) else {
            continue;
        };
        let Some(profile) = profiles.get_mut(name) else { continue };
        let value = value.trim().to_string();
        match key.trim() {
            "user" => profile.user = value,
            "tenancy" => profile.tenancy = value,
            "region" => profile.region = value,
            _ => {}
        }
    }

    for (name, p) in profiles.iter_mut() {
        if p.tenancy.is_empty() {
            return Err(ProfileError::MissingTenancy(name.clone()));
        }
        if p.region.is_empty() {
            return Err(ProfileError::MissingRegion(name.clone()));
        }
        if p.user.is_empty() {
            p.user = p.tenancy.clone();
        }
    }
    Ok(profiles)
}
