//! Messages in and effects out of the navigation engine.
//!
//! Key presses become `Action`s, fetch completions arrive as
//! `ChildrenLoaded`/`RegionsLoaded`. Everything flows through one
//! unbounded channel and is folded by `NavState::update`, one at a time.

use crate::cloud::{CloudError, Compartment};
use crate::store::Context;

/// User intent, already resolved from raw keys by `input::action_for`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Confirm,
    Stage,
    Commit,
    Quit,
    Back,
    OpenRegions,
    OpenCompartments,
    OpenTenancies,
    OpenContexts,
    StartFilter,
    ToggleCompact,
    MoveUp,
    MoveDown,
    FilterChar(char),
    FilterBackspace,
    CancelFilter,
}

/// Messages that drive the engine.
#[derive(Debug, Clone)]
pub enum NavMessage {
    Action(Action),
    /// Children of `parent_id` (from cache or remote).
    ChildrenLoaded {
        parent_id: String,
        result: Result<Vec<Compartment>, CloudError>,
    },
    /// Regions for a context. `error` is set when the fallback list was used.
    RegionsLoaded {
        context_name: String,
        regions: Vec<String>,
        error: Option<CloudError>,
    },
}

impl From<Action> for NavMessage {
    fn from(action: Action) -> Self {
        NavMessage::Action(action)
    }
}

/// Follow-up work requested by `update`, executed by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchChildren { context: Context, parent_id: String },
    FetchRegions { context: Context },
    Save,
}
