//! Effect runtime around `NavState`.
//!
//! The session feeds messages into the engine, runs the effects it returns
//! (fetches through the scheduler, saves through `Persist`) and tracks how
//! many fetch completions are still owed.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::cloud::CloudApi;
use crate::store::error::StoreResult;
use crate::store::{self, Document};

use super::app::NavState;
use super::event::{Effect, NavMessage};
use super::fetch::Scheduler;

/// Where a committed document goes.
pub trait Persist {
    fn save(&mut self, doc: &Document) -> StoreResult<()>;
}

/// Saves to the resolved config path.
pub struct FilePersister {
    path: PathBuf,
}

impl FilePersister {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Persist for FilePersister {
    fn save(&mut self, doc: &Document) -> StoreResult<()> {
        store::save(&self.path, doc)
    }
}

pub struct Session<P: Persist> {
    pub state: NavState,
    scheduler: Scheduler,
    persist: P,
    rx: UnboundedReceiver<NavMessage>,
    pending: usize,
}

impl<P: Persist> Session<P> {
    pub fn new(state: NavState, cloud: Arc<dyn CloudApi>, persist: P) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let auth = state.document().options.auth_config_path.clone();
        Self {
            state,
            scheduler: Scheduler::new(cloud, auth, tx),
            persist,
            rx,
            pending: 0,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Run a start-mode effect, if any.
    pub fn begin(&mut self, effect: Option<Effect>) {
        if let Some(effect) = effect {
            self.run(effect);
        }
    }

    /// Fold one message and run the resulting effect.
    pub fn dispatch(&mut self, msg: impl Into<NavMessage>) {
        let msg = msg.into();
        if matches!(
            msg,
            NavMessage::ChildrenLoaded { .. } | NavMessage::RegionsLoaded { .. }
        ) {
            self.pending = self.pending.saturating_sub(1);
        }
        if let Some(effect) = self.state.update(msg) {
            self.run(effect);
        }
    }

    fn run(&mut self, effect: Effect) {
        match effect {
            Effect::FetchChildren { context, parent_id } => {
                self.pending += 1;
                self.scheduler.fetch_children(&context, &parent_id);
            }
            Effect::FetchRegions { context } => {
                self.pending += 1;
                self.scheduler.fetch_regions(&context);
            }
            Effect::Save => {
                let result = self.persist.save(self.state.document());
                if let Err(e) = &result {
                    tracing::warn!("saving selection failed: {e}");
                }
                self.state.apply_save_result(result);
            }
        }
    }

    /// Fetch completions still to arrive.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Wait for the next completion. Never resolves while nothing is pending.
    pub async fn recv(&mut self) -> Option<NavMessage> {
        if self.pending == 0 {
            return std::future::pending().await;
        }
        self.rx.recv().await
    }

    /// Apply completions until nothing is in flight.
    pub async fn settle(&mut self) {
        while self.pending > 0 {
            match self.rx.recv().await {
                Some(msg) => self.dispatch(msg),
                None => break,
            }
        }
    }
}
