//! Cloud collaborator boundary.
//!
//! Everything that reaches the OCI identity service goes through `CloudApi`.
//! The engine, the status command and the prompt flow only ever call it
//! under `with_timeout`.

pub mod oci_cli;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Timeout for interactive fetches (compartments, regions, status).
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Overall timeout for tenancy-name priming.
pub const PRIME_TIMEOUT: Duration = Duration::from_secs(10);

/// A compartment as listed under its parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compartment {
    pub id: String,
    pub name: String,
    /// Lifecycle state, e.g. `ACTIVE`.
    pub status: String,
    pub parent_id: String,
}

impl Compartment {
    pub fn is_active(&self) -> bool {
        self.status == "ACTIVE"
    }
}

/// Ids to resolve into friendly names. Empty tenancy/user ids are taken from the profile.
#[derive(Debug, Clone, Default)]
pub struct IdentityLookup {
    pub profile: String,
    pub region: String,
    pub tenancy_id: String,
    pub compartment_id: String,
    pub user_id: String,
}

/// Friendly names for a context's ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentityDetails {
    pub tenancy_name: String,
    pub tenancy_id: String,
    pub compartment_name: String,
    pub compartment_id: String,
    pub user_name: String,
    pub user_id: String,
    pub region: String,
}

/// Errors from collaborator calls. Clone so they can ride in engine messages.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CloudError {
    #[error("{op} timed out after {}s", secs)]
    Timeout { op: &'static str, secs: u64 },

    #[error("failed to run oci: {0}")]
    Spawn(String),

    #[error("{op} failed: {message}")]
    Command { op: String, message: String },

    #[error("invalid response: {0}")]
    Parse(String),

    #[error("config: {0}")]
    Config(String),
}

pub type CloudResult<T> = Result<T, CloudError>;

/// Narrow interface onto the identity service.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Direct children of `parent_id`, all pages.
    async fn fetch_compartments(
        &self,
        auth_config_path: &str,
        profile: &str,
        region: &str,
        parent_id: &str,
    ) -> CloudResult<Vec<Compartment>>;

    async fn fetch_identity_details(
        &self,
        auth_config_path: &str,
        lookup: &IdentityLookup,
    ) -> CloudResult<IdentityDetails>;

    /// Region names the profile's tenancy is subscribed to.
    async fn list_region_subscriptions(
        &self,
        auth_config_path: &str,
        profile: &str,
    ) -> CloudResult<Vec<String>>;
}

/// Run a collaborator call under a deadline.
pub async fn with_timeout<T, F>(op: &'static str, limit: Duration, fut: F) -> CloudResult<T>
where
    F: Future<Output = CloudResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(CloudError::Timeout {
            op,
            secs: limit.as_secs(),
        }),
    }
}

/// Shorten an OCID for display: `ocid1.…abcdef`.
pub fn abbreviate_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 16 {
        return id.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{head}\u{2026}{tail}")
}

#[cfg(test)]
pub mod testing {
    //! In-memory `CloudApi` for engine and scheduler tests.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct FakeCloud {
        pub children: Mutex<HashMap<String, Vec<Compartment>>>,
        pub regions: Mutex<Option<Vec<String>>>,
        pub tenancy_names: Mutex<HashMap<String, String>>,
        pub fail_compartments: Mutex<bool>,
        pub identity_delay: Option<Duration>,
        pub compartment_calls: AtomicUsize,
        pub region_calls: AtomicUsize,
        pub identity_calls: AtomicUsize,
        pub in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl FakeCloud {
        pub fn with_children(self, parent: &str, kids: &[(&str, &str)]) -> Self {
            let nodes = kids
                .iter()
                .map(|(id, name)| Compartment {
                    id: id.to_string(),
                    name: name.to_string(),
                    status: "ACTIVE".into(),
                    parent_id: parent.to_string(),
                })
                .collect();
            self.children.lock().insert(parent.to_string(), nodes);
            self
        }

        pub fn compartment_calls(&self) -> usize {
            self.compartment_calls.load(Ordering::SeqCst)
        }

        pub fn region_calls(&self) -> usize {
            self.region_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CloudApi for FakeCloud {
        async fn fetch_compartments(
            &self,
            _auth_config_path: &str,
            _profile: &str,
            _region: &str,
            parent_id: &str,
        ) -> CloudResult<Vec<Compartment>> {
            self.compartment_calls.fetch_add(1, Ordering::SeqCst);
            if *self.fail_compartments.lock() {
                return Err(CloudError::Command {
                    op: "list compartments".into(),
                    message: "boom".into(),
                });
            }
            Ok(self
                .children
                .lock()
                .get(parent_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn fetch_identity_details(
            &self,
            _auth_config_path: &str,
            lookup: &IdentityLookup,
        ) -> CloudResult<IdentityDetails> {
            self.identity_calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.identity_delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let name = self.tenancy_names.lock().get(&lookup.tenancy_id).cloned();
            match name {
                Some(tenancy_name) => Ok(IdentityDetails {
                    tenancy_name,
                    tenancy_id: lookup.tenancy_id.clone(),
                    region: lookup.region.clone(),
                    ..Default::default()
                }),
                None => Err(CloudError::Command {
                    op: "get tenancy".into(),
                    message: "not authorized".into(),
                }),
            }
        }

        async fn list_region_subscriptions(
            &self,
            _auth_config_path: &str,
            _profile: &str,
        ) -> CloudResult<Vec<String>> {
            self.region_calls.fetch_add(1, Ordering::SeqCst);
            self.regions.lock().clone().ok_or_else(|| CloudError::Command {
                op: "list region subscriptions".into(),
                message: "unreachable".into(),
            })
        }
    }
}
