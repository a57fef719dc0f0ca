//! Context store: the persisted document of named contexts.
//!
//! One YAML file holds global options, the context list and the name of the
//! current context. `load` and `save` hold the sibling advisory lock for
//! their whole duration; in-memory mutation is invisible to other processes
//! until `save` returns.

pub mod discovery;
pub mod error;
pub mod lock;

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use error::{StoreError, StoreResult};
use lock::PathLock;

/// Global settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// OCI CLI config file holding the profiles.
    #[serde(rename = "oci_config_path")]
    pub auth_config_path: String,
    pub socket_path: String,
    pub default_profile: String,
}

/// A named bundle of profile/tenancy/compartment/region/user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    pub name: String,
    pub profile: String,
    #[serde(rename = "tenancy_ocid")]
    pub tenancy_id: String,
    #[serde(rename = "compartment_ocid")]
    pub compartment_id: String,
    pub region: String,
    pub user: String,
    pub notes: String,
}

impl Context {
    /// Check the fields required before a context may be persisted.
    pub fn validate(&self) -> StoreResult<()> {
        let required = [
            (&self.name, "context name is required"),
            (&self.profile, "context profile is required"),
            (&self.tenancy_id, "context tenancy_ocid is required"),
            (&self.compartment_id, "context compartment_ocid is required"),
        ];
        for (value, msg) in required {
            if value.is_empty() {
                return Err(StoreError::Validation(msg.into()));
            }
        }
        Ok(())
    }

    /// Where compartment navigation starts: the stored compartment, else the tenancy root.
    pub fn start_compartment(&self) -> &str {
        if self.compartment_id.is_empty() {
            &self.tenancy_id
        } else {
            &self.compartment_id
        }
    }

    /// `KEY=value` lines for shell export. The region line is omitted when unset.
    pub fn env_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("OCI_CLI_PROFILE={}", self.profile),
            format!("OCI_TENANCY_OCID={}", self.tenancy_id),
            format!("OCI_COMPARTMENT_OCID={}", self.compartment_id),
        ];
        if !self.region.is_empty() {
            lines.push(format!("OCI_REGION={}", self.region));
        }
        lines
    }
}

/// The whole persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub options: Options,
    pub contexts: Vec<Context>,
    pub current_context: String,
}

impl Document {
    /// Defaults rooted at the given home directory.
    pub fn with_home(home: &Path) -> Self {
        Self {
            options: Options {
                auth_config_path: home.join(".oci").join("config").display().to_string(),
                socket_path: home
                    .join(".oci-context")
                    .join("daemon.sock")
                    .display()
                    .to_string(),
                default_profile: String::new(),
            },
            contexts: Vec::new(),
            current_context: String::new(),
        }
    }

    /// Find a context by name.
    pub fn get_by_name(&self, name: &str) -> StoreResult<&Context> {
        self.contexts
            .iter()
            .find(|c| c.name == name)
            .ok_or(StoreError::NotFound)
    }

    /// The current context, or `NoCurrent` when none is set.
    pub fn current(&self) -> StoreResult<&Context> {
        if self.current_context.is_empty() {
            return Err(StoreError::NoCurrent);
        }
        self.get_by_name(&self.current_context)
    }

    /// Replace the context with the same name, else append it.
    /// The first context inserted into a document without a current context becomes current.
    pub fn upsert(&mut self, ctx: Context) {
        if let Some(existing) = self.contexts.iter_mut().find(|c| c.name == ctx.name) {
            *existing = ctx;
            return;
        }
        if self.current_context.is_empty() {
            self.current_context = ctx.name.clone();
        }
        self.contexts.push(ctx);
    }

    /// Remove a context by name, clearing the current reference if it pointed there.
    pub fn delete_by_name(&mut self, name: &str) -> StoreResult<()> {
        let idx = self
            .contexts
            .iter()
            .position(|c| c.name == name)
            .ok_or(StoreError::NotFound)?;
        self.contexts.remove(idx);
        if self.current_context == name {
            self.current_context.clear();
        }
        Ok(())
    }

    /// Make an existing context current.
    pub fn use_context(&mut self, name: &str) -> StoreResult<()> {
        self.get_by_name(name)?;
        self.current_context = name.to_string();
        Ok(())
    }
}

/// Read the document under the path lock.
pub fn load(path: &Path) -> StoreResult<Document> {
    let _lock = PathLock::acquire(path)?;
    let data = std::fs::read_to_string(path)?;
    let doc: Document = serde_yaml::from_str(&data)?;
    tracing::debug!(path = %path.display(), contexts = doc.contexts.len(), "loaded document");
    Ok(doc)
}

/// Write the document under the path lock. Owner-only permissions, atomic rename.
pub fn save(path: &Path, doc: &Document) -> StoreResult<()> {
    let _lock = PathLock::acquire(path)?;
    let yaml = serde_yaml::to_string(doc)?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    tmp.write_all(yaml.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    tracing::debug!(path = %path.display(), "saved document");
    Ok(())
}

/// Create a default document at `path` if none exists yet.
pub fn ensure_default(path: &Path) -> StoreResult<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    if path.exists() {
        return Ok(());
    }
    let home = home_dir().ok_or_else(|| {
        StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "HOME is not set",
        ))
    })?;
    save(path, &Document::with_home(&home))
}

/// `$HOME` (or `%USERPROFILE%` on Windows).
pub fn home_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}
