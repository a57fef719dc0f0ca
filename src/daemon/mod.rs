//! Daemon dispatcher: the context store behind the socket protocol.
//!
//! All connections share one in-memory `Document`. Every method runs its
//! whole read-modify-save sequence under the service mutex, on the blocking
//! pool since `store::save` does file I/O. A mutation only replaces the
//! shared document once it has been saved.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::ipc::server::{self, Handler};
use crate::ipc::{Request, Response};
use crate::store::error::StoreError;
use crate::store::{self, Context, Document};

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid context payload: {0}")]
    InvalidPayload(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("method not implemented")]
    NotImplemented,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type DaemonResult<T> = Result<T, DaemonError>;

#[derive(Clone)]
pub struct Service {
    path: PathBuf,
    doc: Arc<Mutex<Document>>,
}

impl Service {
    /// Load the document at `path` and serve it.
    pub fn open(path: impl Into<PathBuf>) -> DaemonResult<Self> {
        let path = path.into();
        let doc = store::load(&path)?;
        Ok(Self::with_document(path, doc))
    }

    pub fn with_document(path: impl Into<PathBuf>, doc: Document) -> Self {
        Self {
            path: path.into(),
            doc: Arc::new(Mutex::new(doc)),
        }
    }

    pub fn socket_path(&self) -> PathBuf {
        PathBuf::from(&self.doc.lock().options.socket_path)
    }

    /// Bind the configured socket and serve until the listener fails.
    pub async fn serve(self) -> std::io::Result<()> {
        let socket = self.socket_path();
        server::serve(&socket, Arc::new(self)).await
    }

    /// Dispatch one request. Blocking: holds the mutex and may save.
    pub fn dispatch(&self, req: &Request) -> DaemonResult<Value> {
        let name = req.name.as_deref().unwrap_or_default();
        match req.method.as_str() {
            "get_current" => to_value(self.doc.lock().current()?),
            "list" => to_value(&self.doc.lock().contexts),
            "use_context" => {
                self.mutate(|doc| doc.use_context(name))?;
                Ok(json!({ "current_context": name }))
            }
            "add_context" => {
                let payload = req
                    .context
                    .clone()
                    .ok_or_else(|| DaemonError::InvalidPayload("missing context".into()))?;
                let ctx: Context = serde_json::from_value(payload)
                    .map_err(|e| DaemonError::InvalidPayload(e.to_string()))?;
                ctx.validate()?;
                let reply = to_value(&ctx)?;
                self.mutate(|doc| {
                    doc.upsert(ctx);
                    Ok(())
                })?;
                Ok(reply)
            }
            "delete_context" => {
                self.mutate(|doc| doc.delete_by_name(name))?;
                Ok(json!({ "deleted": name }))
            }
            "export" => export(
                self.doc.lock().current()?,
                req.format.as_deref().unwrap_or_default(),
            ),
            _ => Err(DaemonError::NotImplemented),
        }
    }

    /// Apply `f` to a copy, save it, then publish it.
    fn mutate<F>(&self, f: F) -> DaemonResult<()>
    where
        F: FnOnce(&mut Document) -> Result<(), StoreError>,
    {
        let mut guard = self.doc.lock();
        let mut next = guard.clone();
        f(&mut next)?;
        store::save(&self.path, &next)?;
        *guard = next;
        Ok(())
    }
}

/// Shell lines or the structured context.
pub fn export(ctx: &Context, format: &str) -> DaemonResult<Value> {
    match format {
        "env" => Ok(json!({ "env": ctx.env_lines() })),
        "json" | "" => to_value(ctx),
        other => Err(DaemonError::UnsupportedFormat(other.to_string())),
    }
}

fn to_value<T: serde::Serialize>(v: T) -> DaemonResult<Value> {
    serde_json::to_value(v).map_err(|e| DaemonError::Internal(e.to_string()))
}

#[async_trait]
impl Handler for Service {
    async fn handle(&self, req: Request) -> Response {
        let svc = self.clone();
        let method = req.method.clone();
        let result = tokio::task::spawn_blocking(move || svc.dispatch(&req))
            .await
            .unwrap_or_else(|e| Err(DaemonError::Internal(e.to_string())));
        match result {
            Ok(data) => Response::success(data),
            Err(e) => {
                tracing::warn!(%method, "request failed: {e}");
                Response::failure(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx(name: &str) -> Context {
        Context {
            name: name.into(),
            profile: "DEFAULT".into(),
            tenancy_id: "t1".into(),
            compartment_id: "c1".into(),
            region: "us-ashburn-1".into(),
            ..Default::default()
        }
    }

    fn service(dir: &TempDir) -> Service {
        let path = dir.path().join("config.yml");
        let mut doc = Document::default();
        doc.upsert(ctx("dev"));
        doc.upsert(ctx("prod"));
        store::save(&path, &doc).unwrap();
        Service::open(&path).unwrap()
    }

    #[test]
    fn get_current_and_list() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let cur = svc.dispatch(&Request::new("get_current")).unwrap();
        assert_eq!(cur["name"], "dev");
        assert_eq!(cur["tenancy_ocid"], "t1");
        let all = svc.dispatch(&Request::new("list")).unwrap();
        assert_eq!(all.as_array().unwrap().len(), 2);
    }

    #[test]
    fn use_context_persists() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let reply = svc.dispatch(&Request::new("use_context").with_name("prod")).unwrap();
        assert_eq!(reply, json!({ "current_context": "prod" }));
        let on_disk = store::load(&dir.path().join("config.yml")).unwrap();
        assert_eq!(on_disk.current_context, "prod");
    }

    #[test]
    fn use_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let err = svc.dispatch(&Request::new("use_context").with_name("nope")).unwrap_err();
        assert_eq!(err.to_string(), "context not found");
    }

    #[test]
    fn add_validates_before_mutating() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let bad = json!({ "name": "x", "profile": "P" });
        let err = svc
            .dispatch(&Request::new("add_context").with_context(bad))
            .unwrap_err();
        assert_eq!(err.to_string(), "context tenancy_ocid is required");
        assert_eq!(svc.doc.lock().contexts.len(), 2);

        let good = serde_json::to_value(ctx("stage")).unwrap();
        let reply = svc
            .dispatch(&Request::new("add_context").with_context(good))
            .unwrap();
        assert_eq!(reply["name"], "stage");
        assert_eq!(store::load(&dir.path().join("config.yml")).unwrap().contexts.len(), 3);
    }

    #[test]
    fn delete_current_clears_it() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let reply = svc.dispatch(&Request::new("delete_context").with_name("dev")).unwrap();
        assert_eq!(reply, json!({ "deleted": "dev" }));
        let err = svc.dispatch(&Request::new("get_current")).unwrap_err();
        assert_eq!(err.to_string(), "no current context set");
    }

    #[test]
    fn export_formats() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let env = svc.dispatch(&Request::new("export").with_format("env")).unwrap();
        assert_eq!(env["env"][0], "OCI_CLI_PROFILE=DEFAULT");
        assert_eq!(env["env"][3], "OCI_REGION=us-ashburn-1");
        let plain = svc.dispatch(&Request::new("export")).unwrap();
        assert_eq!(plain["compartment_ocid"], "c1");
        let err = svc.dispatch(&Request::new("export").with_format("xml")).unwrap_err();
        assert_eq!(err.to_string(), "unsupported format: xml");
    }

    #[test]
    fn unknown_method() {
        let dir = TempDir::new().unwrap();
        let err = service(&dir).dispatch(&Request::new("reboot")).unwrap_err();
        assert_eq!(err.to_string(), "method not implemented");
    }

    #[test]
    fn failed_save_leaves_memory_untouched() {
        let dir = TempDir::new().unwrap();
        let svc = Service::with_document(dir.path().join("missing/dir/config.yml"), {
            let mut doc = Document::default();
            doc.upsert(ctx("dev"));
            doc.upsert(ctx("prod"));
            doc
        });
        assert!(svc.dispatch(&Request::new("use_context").with_name("prod")).is_err());
        assert_eq!(svc.doc.lock().current_context, "dev");
    }

    #[tokio::test]
    async fn concurrent_switches_all_land() {
        let dir = TempDir::new().unwrap();
        let svc = Arc::new(service(&dir));
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let svc = svc.clone();
            let name = if i % 2 == 0 { "dev" } else { "prod" };
            tasks.spawn(async move { svc.handle(Request::new("use_context").with_name(name)).await });
        }
        while let Some(resp) = tasks.join_next().await {
            assert!(resp.unwrap().ok);
        }
        let on_disk = store::load(&dir.path().join("config.yml")).unwrap();
        assert_eq!(on_disk, svc.doc.lock().clone());
    }
}
