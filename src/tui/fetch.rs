//! Out-of-band fetches for the navigation engine.
//!
//! Every request answers with exactly one `NavMessage` on the engine's
//! channel: immediately on a cache hit, otherwise from a spawned task once
//! the remote call finishes or times out. In-flight fetches are never
//! cancelled.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

use crate::cloud::{with_timeout, CloudApi, FETCH_TIMEOUT};
use crate::store::Context;

use super::cache::ResourceCache;
use super::event::NavMessage;
use super::rows::fallback_regions;

pub struct Scheduler {
    cloud: Arc<dyn CloudApi>,
    cache: Arc<Mutex<ResourceCache>>,
    auth_config_path: String,
    timeout: Duration,
    tx: UnboundedSender<NavMessage>,
}

impl Scheduler {
    pub fn new(
        cloud: Arc<dyn CloudApi>,
        auth_config_path: impl Into<String>,
        tx: UnboundedSender<NavMessage>,
    ) -> Self {
        Self {
            cloud,
            cache: Arc::new(Mutex::new(ResourceCache::new())),
            auth_config_path: auth_config_path.into(),
            timeout: FETCH_TIMEOUT,
            tx,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache(&self) -> Arc<Mutex<ResourceCache>> {
        self.cache.clone()
    }

    /// List the children of `parent_id` using the context's profile and region.
    pub fn fetch_children(&self, context: &Context, parent_id: &str) {
        let cached = self.cache.lock().children(parent_id).map(<[_]>::to_vec);
        if let Some(nodes) = cached {
            tracing::debug!(parent = parent_id, "children cache hit");
            self.send(NavMessage::ChildrenLoaded {
                parent_id: parent_id.to_string(),
                result: Ok(nodes),
            });
            return;
        }

        let cloud = self.cloud.clone();
        let cache = self.cache.clone();
        let tx = self.tx.clone();
        let auth = self.auth_config_path.clone();
        let timeout = self.timeout;
        let profile = context.profile.clone();
        let region = context.region.clone();
        let parent_id = parent_id.to_string();
        tracing::debug!(parent = %parent_id, %profile, "fetching children");

        tokio::spawn(async move {
            let result = with_timeout(
                "list compartments",
                timeout,
                cloud.fetch_compartments(&auth, &profile, &region, &parent_id),
            )
            .await;
            if let Ok(nodes) = &result {
                cache.lock().put_children(&parent_id, nodes.clone());
            }
            let _ = tx.send(NavMessage::ChildrenLoaded { parent_id, result });
        });
    }

    /// Region subscriptions for the context's profile. Failures cache and
    /// deliver the fallback list along with the error.
    pub fn fetch_regions(&self, context: &Context) {
        let cached = self.cache.lock().regions(&context.name).map(<[_]>::to_vec);
        if let Some(regions) = cached {
            tracing::debug!(context = %context.name, "regions cache hit");
            self.send(NavMessage::RegionsLoaded {
                context_name: context.name.clone(),
                regions,
                error: None,
            });
            return;
        }

        let cloud = self.cloud.clone();
        let cache = self.cache.clone();
        let tx = self.tx.clone();
        let auth = self.auth_config_path.clone();
        let timeout = self.timeout;
        let profile = context.profile.clone();
        let context_name = context.name.clone();
        tracing::debug!(context = %context_name, "fetching regions");

        tokio::spawn(async move {
            let result = with_timeout(
                "list region subscriptions",
                timeout,
                cloud.list_region_subscriptions(&auth, &profile),
            )
            .await;
            let (regions, error) = match result {
                Ok(regions) => (regions, None),
                Err(e) => {
                    tracing::warn!(context = %context_name, "region fetch failed, using defaults: {e}");
                    (fallback_regions(), Some(e))
                }
            };
            cache.lock().put_regions(&context_name, regions.clone());
            let _ = tx.send(NavMessage::RegionsLoaded {
                context_name,
                regions,
                error,
            });
        });
    }

    fn send(&self, msg: NavMessage) {
        if self.tx.send(msg).is_err() {
            tracing::debug!("navigation channel closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::testing::FakeCloud;
    use crate::cloud::CloudError;
    use tokio::sync::mpsc;

    fn ctx(name: &str) -> Context {
        Context {
            name: name.into(),
            profile: "DEFAULT".into(),
            tenancy_id: "t".into(),
            compartment_id: "t".into(),
            region: "r1".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn children_fetched_once_then_cached() {
        let cloud = Arc::new(FakeCloud::default().with_children("t", &[("c1", "Apps")]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sched = Scheduler::new(cloud.clone(), "/cfg", tx);

        sched.fetch_children(&ctx("dev"), "t");
        let NavMessage::ChildrenLoaded { parent_id, result } = rx.recv().await.unwrap() else {
            panic!("expected children");
        };
        assert_eq!(parent_id, "t");
        assert_eq!(result.unwrap().len(), 1);

        sched.fetch_children(&ctx("dev"), "t");
        assert!(matches!(
            rx.recv().await.unwrap(),
            NavMessage::ChildrenLoaded { result: Ok(_), .. }
        ));
        assert_eq!(cloud.compartment_calls(), 1);
    }

    #[tokio::test]
    async fn children_failure_carries_parent_and_is_not_cached() {
        let cloud = Arc::new(FakeCloud::default());
        *cloud.fail_compartments.lock() = true;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sched = Scheduler::new(cloud.clone(), "/cfg", tx);

        sched.fetch_children(&ctx("dev"), "c9");
        let NavMessage::ChildrenLoaded { parent_id, result } = rx.recv().await.unwrap() else {
            panic!("expected children");
        };
        assert_eq!(parent_id, "c9");
        assert!(result.is_err());
        assert!(sched.cache().lock().children("c9").is_none());
    }

    #[tokio::test]
    async fn region_failure_falls_back_and_caches() {
        let cloud = Arc::new(FakeCloud::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sched = Scheduler::new(cloud.clone(), "/cfg", tx);

        sched.fetch_regions(&ctx("dev"));
        let NavMessage::RegionsLoaded { regions, error, .. } = rx.recv().await.unwrap() else {
            panic!("expected regions");
        };
        assert_eq!(regions, fallback_regions());
        assert!(error.is_some());

        sched.fetch_regions(&ctx("dev"));
        let NavMessage::RegionsLoaded { regions, error, .. } = rx.recv().await.unwrap() else {
            panic!("expected regions");
        };
        assert_eq!(regions, fallback_regions());
        assert!(error.is_none());
        assert_eq!(cloud.region_calls(), 1);
    }

    #[tokio::test]
    async fn slow_fetch_times_out() {
        struct Stuck;
        #[async_trait::async_trait]
        impl CloudApi for Stuck {
            async fn fetch_compartments(
                &self,
                _: &str,
                _: &str,
                _: &str,
                _: &str,
            ) -> crate::cloud::CloudResult<Vec<crate::cloud::Compartment>> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Vec::new())
            }
            async fn fetch_identity_details(
                &self,
                _: &str,
                _: &crate::cloud::IdentityLookup,
            ) -> crate::cloud::CloudResult<crate::cloud::IdentityDetails> {
                Err(CloudError::Parse("unused".into()))
            }
            async fn list_region_subscriptions(
                &self,
                _: &str,
                _: &str,
            ) -> crate::cloud::CloudResult<Vec<String>> {
                Err(CloudError::Parse("unused".into()))
            }
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let sched =
            Scheduler::new(Arc::new(Stuck), "/cfg", tx).with_timeout(Duration::from_millis(10));
        sched.fetch_children(&ctx("dev"), "t");
        let NavMessage::ChildrenLoaded { result, .. } = rx.recv().await.unwrap() else {
            panic!("expected children");
        };
        assert!(matches!(result, Err(CloudError::Timeout { .. })));
    }
}
