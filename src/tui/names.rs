//! Friendly tenancy names.
//!
//! `TenancyNames` is shared by `Arc` between the priming fan-out and row
//! construction. Reads take the shared lock; `record` takes it exclusively.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cloud::{CloudApi, IdentityLookup, PRIME_TIMEOUT};
use crate::profiles::Profiles;

/// Max identity lookups in flight while priming.
const PRIME_CONCURRENCY: usize = 4;

/// Tenancy id → display name.
#[derive(Debug, Default)]
pub struct TenancyNames {
    inner: RwLock<HashMap<String, String>>,
}

impl TenancyNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tenancy_id: &str) -> Option<String> {
        self.inner.read().get(tenancy_id).cloned()
    }

    /// Store a name. Empty ids or names are ignored.
    pub fn record(&self, tenancy_id: &str, name: &str) {
        if tenancy_id.is_empty() || name.is_empty() {
            return;
        }
        self.inner
            .write()
            .insert(tenancy_id.to_string(), name.to_string());
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve names for every distinct tenancy not yet cached.
///
/// One lookup per tenancy, using its lexicographically-first profile. At most
/// four run at once and all are joined before returning, bounded overall by
/// `PRIME_TIMEOUT`. Failures only leave the name unset.
pub async fn prime_tenancy_names(
    cloud: Arc<dyn CloudApi>,
    names: Arc<TenancyNames>,
    profiles: &Profiles,
    auth_config_path: &str,
) {
    if profiles.is_empty() || auth_config_path.is_empty() {
        return;
    }

    // Profiles iterate in name order, so the first insert per tenancy wins.
    let mut needed: BTreeMap<String, IdentityLookup> = BTreeMap::new();
    for (name, profile) in profiles {
        if names.get(&profile.tenancy).is_some() || needed.contains_key(&profile.tenancy) {
            continue;
        }
        needed.insert(
            profile.tenancy.clone(),
            IdentityLookup {
                profile: name.clone(),
                region: profile.region.clone(),
                tenancy_id: profile.tenancy.clone(),
                ..Default::default()
            },
        );
    }
    if needed.is_empty() {
        return;
    }

    let permits = Arc::new(Semaphore::new(PRIME_CONCURRENCY));
    let mut tasks = JoinSet::new();
    for (tenancy_id, lookup) in needed {
        let cloud = cloud.clone();
        let names = names.clone();
        let permits = permits.clone();
        let auth = auth_config_path.to_string();
        tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            match cloud.fetch_identity_details(&auth, &lookup).await {
                Ok(details) => names.record(&tenancy_id, &details.tenancy_name),
                Err(e) => tracing::debug!(tenancy = %tenancy_id, "tenancy name lookup failed: {e}"),
            }
        });
    }

    let joined = tokio::time::timeout(PRIME_TIMEOUT, async {
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                tracing::debug!("tenancy name task failed: {e}");
            }
        }
    })
    .await;
    if joined.is_err() {
        tracing::debug!("tenancy name priming timed out");
        tasks.abort_all();
    }
}
