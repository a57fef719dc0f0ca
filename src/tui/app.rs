//! Navigation engine state (TEA model).
//!
//! `NavState::update` folds one message into the state and may hand back a
//! single `Effect` for the session to run. Remote data only ever arrives
//! as messages, so the state has exactly one writer.
//!
//! Staging marks a row as the pending choice without persisting it. Commit
//! folds the choice for the current mode into the active context, makes it
//! current, and asks for one save.

use std::collections::HashMap;

use crate::cloud::{abbreviate_id, CloudError, Compartment};
use crate::profiles::Profiles;
use crate::store::error::{StoreError, StoreResult};
use crate::store::{Context, Document};

use super::event::{Action, Effect, NavMessage};
use super::list::RowList;
use super::names::TenancyNames;
use super::rows::{
    context_for_profile, contexts_from_profiles, fallback_regions, select_profile_for_tenancy,
    tenancies_from_profiles, Row, TenancyRow,
};

const LOADING_COMPARTMENTS: &str = "Loading compartments...";
const LEAF_HINT: &str =
    "Leaf compartment: press backspace/delete to go up, or Enter/Space/Ctrl+S to keep current.";
const REGION_HINT: &str = "Select region (Space to stage, Ctrl+S to save)";
const TENANCY_HINT: &str = "Select tenancy (Enter to use a profile and open root)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Contexts,
    Tenancies,
    Compartments,
    Regions,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Contexts => "contexts",
            Mode::Tenancies => "tenancies",
            Mode::Compartments => "compartments",
            Mode::Regions => "regions",
        }
    }

    /// Parse a start mode argument; singular and plural forms accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "context" | "contexts" => Some(Mode::Contexts),
            "tenancy" | "tenancies" => Some(Mode::Tenancies),
            "compartment" | "compartments" => Some(Mode::Compartments),
            "region" | "regions" => Some(Mode::Regions),
            _ => None,
        }
    }
}

/// The pending, not yet persisted choice. At most one at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Staged {
    #[default]
    None,
    Context(String),
    Tenancy(String),
    Compartment { id: String, name: String },
    Region(String),
}

impl Staged {
    /// Row key the marker applies to.
    pub fn key(&self) -> Option<&str> {
        match self {
            Staged::None => None,
            Staged::Context(k) | Staged::Tenancy(k) | Staged::Region(k) => Some(k),
            Staged::Compartment { id, .. } => Some(id),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Staged::None => "-".into(),
            Staged::Context(name) => format!("ctx:{name}"),
            Staged::Tenancy(id) => format!("tenancy:{}", abbreviate_id(id)),
            Staged::Compartment { id, .. } => format!("comp:{}", abbreviate_id(id)),
            Staged::Region(r) => format!("region:{r}"),
        }
    }
}

/// Why a session ended without committing.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error(transparent)]
    Remote(#[from] CloudError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct NavState {
    pub mode: Mode,
    doc: Document,
    profiles: Profiles,
    /// Context the session is editing.
    pub active: Context,
    /// Compartment whose children are (being) listed.
    pub parent_id: String,
    parent_chain: HashMap<String, String>,
    display_names: HashMap<String, String>,
    /// Parent of the listing currently in `compartments`.
    listing_parent: Option<String>,
    pub staged: Staged,
    pub committed: bool,
    pub finished: bool,
    pub error: Option<NavError>,
    pub contexts: RowList,
    pub tenancies: RowList,
    pub compartments: RowList,
    pub regions: RowList,
    pub status: String,
    pub crumb: String,
    pub compact: bool,
}

impl NavState {
    /// Context rows come from the profiles, or from the stored contexts when
    /// there are none.
    pub fn new(doc: Document, profiles: Profiles, names: &TenancyNames) -> Self {
        let mut context_rows = contexts_from_profiles(&profiles);
        if context_rows.is_empty() {
            context_rows = doc.contexts.iter().cloned().map(Row::Context).collect();
        }
        let mut contexts = RowList::new(context_rows);
        contexts.select_key(&doc.current_context);
        let tenancies = RowList::new(tenancies_from_profiles(&profiles, names));

        Self {
            mode: Mode::Contexts,
            doc,
            profiles,
            active: Context::default(),
            parent_id: String::new(),
            parent_chain: HashMap::new(),
            display_names: HashMap::new(),
            listing_parent: None,
            staged: Staged::None,
            committed: false,
            finished: false,
            error: None,
            contexts,
            tenancies,
            compartments: RowList::default(),
            regions: RowList::default(),
            status: String::new(),
            crumb: String::new(),
            compact: false,
        }
    }

    /// The working copy of the persisted document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Jump straight into a mode for the current (or first) context.
    pub fn start(&mut self, mode: Mode) -> Option<Effect> {
        match mode {
            Mode::Contexts => None,
            Mode::Tenancies => {
                if !self.tenancies.is_empty() {
                    self.mode = Mode::Tenancies;
                    self.status = TENANCY_HINT.into();
                }
                None
            }
            Mode::Compartments => {
                let ctx = self.initial_context()?;
                self.set_active(ctx);
                let root = self.active.start_compartment().to_string();
                self.enter_compartments(root)
            }
            Mode::Regions => {
                let ctx = self.initial_context()?;
                self.set_active(ctx);
                self.show_regions()
            }
        }
    }

    /// Fold one message into the state.
    pub fn update(&mut self, msg: NavMessage) -> Option<Effect> {
        if self.finished {
            return None;
        }
        match msg {
            NavMessage::Action(action) => self.on_action(action),
            NavMessage::ChildrenLoaded { parent_id, result } => {
                self.on_children(parent_id, result);
                None
            }
            NavMessage::RegionsLoaded {
                context_name,
                regions,
                error,
            } => {
                self.on_regions(&context_name, regions, error);
                None
            }
        }
    }

    /// Outcome of the save requested by `Effect::Save`.
    pub fn apply_save_result(&mut self, result: StoreResult<()>) {
        match result {
            Ok(()) => self.committed = true,
            Err(e) => self.error = Some(NavError::Store(e)),
        }
        self.finished = true;
    }

    /// Whether `row` is the staged choice. The staging kind must match the row kind.
    pub fn is_staged(&self, row: &Row) -> bool {
        match (&self.staged, row) {
            (Staged::Context(name), Row::Context(c)) => *name == c.name,
            (Staged::Tenancy(id), Row::Tenancy(t)) => *id == t.tenancy_id,
            (Staged::Compartment { id, .. }, Row::Compartment(c)) => *id == c.id,
            (Staged::Region(name), Row::Region(r)) => name == r,
            _ => false,
        }
    }

    pub fn list(&self) -> &RowList {
        match self.mode {
            Mode::Contexts => &self.contexts,
            Mode::Tenancies => &self.tenancies,
            Mode::Compartments => &self.compartments,
            Mode::Regions => &self.regions,
        }
    }

    fn list_mut(&mut self) -> &mut RowList {
        match self.mode {
            Mode::Contexts => &mut self.contexts,
            Mode::Tenancies => &mut self.tenancies,
            Mode::Compartments => &mut self.compartments,
            Mode::Regions => &mut self.regions,
        }
    }

    /// `mode:.. | current:.. | staged:.. | filter:..`
    pub fn meta(&self) -> String {
        let current = [&self.active.name, &self.doc.current_context]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("-");
        let filter = if self.list().is_filtering() { "on" } else { "off" };
        format!(
            "mode:{} | current:{} | staged:{} | filter:{}",
            self.mode.as_str(),
            current,
            self.staged.label(),
            filter
        )
    }

    pub fn instructions(&self) -> &'static str {
        match self.mode {
            Mode::Contexts => {
                "ctx | enter drill • space stage • r regions • c compartments • t tenancies • / filter • u ultra • q save • esc quit"
            }
            Mode::Tenancies => {
                "tenancy | enter use • space stage • backspace/P back • / filter • u ultra • q save • esc quit"
            }
            Mode::Compartments => {
                "comp | enter drill • space stage • backspace up • / filter • u ultra • q save • esc quit"
            }
            Mode::Regions => {
                "region | space stage • enter apply+back • backspace/P back • / filter • u ultra • q save • esc quit"
            }
        }
    }

    pub fn title(&self) -> String {
        match self.mode {
            Mode::Contexts => "Select OCI context".into(),
            Mode::Tenancies => "Select tenancy".into(),
            Mode::Compartments => {
                format!("Select compartment under {}", self.parent_label(&self.parent_id))
            }
            Mode::Regions => "Select region".into(),
        }
    }

    fn on_action(&mut self, action: Action) -> Option<Effect> {
        match action {
            Action::MoveUp => self.list_mut().move_up(),
            Action::MoveDown => self.list_mut().move_down(),
            Action::StartFilter => self.list_mut().start_filter(),
            Action::FilterChar(c) => self.list_mut().push_filter(c),
            Action::FilterBackspace => self.list_mut().pop_filter(),
            Action::CancelFilter => self.list_mut().cancel_filter(),
            Action::ToggleCompact => {
                self.compact = !self.compact;
                self.status = if self.compact {
                    "ULTRA mode: ON".into()
                } else {
                    "ULTRA mode: OFF".into()
                };
            }
            Action::Confirm if self.list().is_filtering() => self.list_mut().freeze_filter(),
            Action::Confirm => return self.confirm(),
            Action::Stage => self.stage(),
            Action::Commit => return self.commit(),
            Action::Quit => {
                self.staged = Staged::None;
                self.finished = true;
            }
            Action::Back => return self.back(),
            Action::OpenRegions => return self.open_regions(),
            Action::OpenCompartments => return self.open_compartments(),
            Action::OpenTenancies => self.open_tenancies(),
            Action::OpenContexts => {
                self.mode = Mode::Contexts;
                self.status.clear();
                self.crumb.clear();
            }
        }
        None
    }

    fn confirm(&mut self) -> Option<Effect> {
        match self.mode {
            Mode::Contexts => {
                let ctx = self.selected_context()?;
                self.set_active(ctx);
                self.clear_staged_descendants();
                let root = self.active.start_compartment().to_string();
                self.enter_compartments(root)
            }
            Mode::Tenancies => {
                let (row, ctx) = self.selected_tenancy_context()?;
                self.set_active(ctx);
                self.clear_staged_descendants();
                self.contexts.select_key(&self.active.name);
                self.enter_compartments(row.tenancy_id)
            }
            Mode::Compartments => {
                if self.listing_parent.as_deref() != Some(self.parent_id.as_str()) {
                    self.status = LOADING_COMPARTMENTS.into();
                    return None;
                }
                if self.compartments.is_empty() {
                    let leaf = self.parent_id.clone();
                    return self.finalize(leaf);
                }
                let Some(Row::Compartment(c)) = self.compartments.selected().cloned() else {
                    return None;
                };
                self.descend(c)
            }
            Mode::Regions => {
                let Some(Row::Region(region)) = self.regions.selected().cloned() else {
                    return None;
                };
                self.active.region = region.clone();
                self.mode = Mode::Contexts;
                self.status = format!("Region set to {region} (not saved until finalize)");
                None
            }
        }
    }

    fn stage(&mut self) {
        match self.mode {
            Mode::Contexts => {
                let Some(ctx) = self.selected_context() else { return };
                self.set_active(ctx);
                self.staged = Staged::Context(self.active.name.clone());
                self.status = format!(
                    "Context {} selected (pending save; Ctrl+S to save)",
                    self.active.name
                );
            }
            Mode::Tenancies => {
                let Some((row, ctx)) = self.selected_tenancy_context() else { return };
                self.set_active(ctx);
                self.parent_id = row.tenancy_id.clone();
                self.status = format!(
                    "Tenancy {} selected (pending save; Ctrl+S to save)",
                    abbreviate_id(&row.tenancy_id)
                );
                self.staged = Staged::Tenancy(row.tenancy_id);
            }
            Mode::Compartments => {
                let Some(Row::Compartment(c)) = self.compartments.selected().cloned() else {
                    return;
                };
                self.remember(&c);
                self.status = format!(
                    "Selected {} (pending save; Enter/right to drill, Ctrl+S/q to save)",
                    c.name
                );
                self.staged = Staged::Compartment {
                    id: c.id,
                    name: c.name,
                };
            }
            Mode::Regions => {
                let Some(Row::Region(region)) = self.regions.selected().cloned() else {
                    return;
                };
                self.active.region = region.clone();
                self.status = format!("Region set to {region} (pending save; Ctrl+S/q to save)");
                self.staged = Staged::Region(region);
            }
        }
    }

    fn commit(&mut self) -> Option<Effect> {
        let compartment = match self.mode {
            Mode::Contexts => {
                let ctx = self.selected_context()?;
                if ctx.name != self.active.name {
                    self.set_active(ctx);
                }
                self.staged_compartment()
                    .unwrap_or_else(|| self.active.start_compartment().to_string())
            }
            Mode::Tenancies => {
                let (row, ctx) = self.selected_tenancy_context()?;
                self.set_active(ctx);
                row.tenancy_id
            }
            Mode::Compartments => self
                .staged_compartment()
                .unwrap_or_else(|| self.parent_id.clone()),
            Mode::Regions => {
                let Some(Row::Region(region)) = self.regions.selected().cloned() else {
                    return None;
                };
                self.active.region = region;
                self.staged_compartment().unwrap_or_else(|| {
                    if self.parent_id.is_empty() {
                        self.active.start_compartment().to_string()
                    } else {
                        self.parent_id.clone()
                    }
                })
            }
        };
        self.finalize(compartment)
    }

    /// Persist `compartment` on the active context and make it current.
    fn finalize(&mut self, compartment: String) -> Option<Effect> {
        self.active.compartment_id = compartment;
        if let Err(e) = self.active.validate() {
            self.error = Some(NavError::Store(e));
            self.finished = true;
            return None;
        }
        self.doc.current_context = self.active.name.clone();
        self.doc.upsert(self.active.clone());
        self.parent_id = self.active.compartment_id.clone();
        self.staged = Staged::None;
        Some(Effect::Save)
    }

    fn back(&mut self) -> Option<Effect> {
        match self.mode {
            Mode::Contexts => None,
            Mode::Compartments => self.ascend(),
            Mode::Tenancies => {
                self.mode = Mode::Contexts;
                if matches!(self.staged, Staged::Compartment { .. }) {
                    self.staged = Staged::None;
                }
                self.status.clear();
                None
            }
            Mode::Regions => {
                self.mode = Mode::Contexts;
                self.status.clear();
                None
            }
        }
    }

    /// One level up; leaving the tenancy root returns to contexts.
    fn ascend(&mut self) -> Option<Effect> {
        let tenancy = self.active.tenancy_id.clone();
        if self.parent_id == tenancy {
            self.mode = Mode::Contexts;
            self.status.clear();
            self.crumb.clear();
            return None;
        }
        let parent = self
            .parent_chain
            .get(&self.parent_id)
            .filter(|p| !p.is_empty())
            .cloned()
            .unwrap_or(tenancy);
        self.parent_id = parent;
        self.load_children()
    }

    fn descend(&mut self, c: Compartment) -> Option<Effect> {
        self.remember(&c);
        self.parent_id = c.id;
        if matches!(self.staged, Staged::Compartment { .. }) {
            self.staged = Staged::None;
        }
        self.load_children()
    }

    fn open_regions(&mut self) -> Option<Effect> {
        if self.mode == Mode::Contexts {
            let ctx = self.selected_context()?;
            self.set_active(ctx);
        }
        if self.active.name.is_empty() {
            self.status = "No context selected".into();
            return None;
        }
        self.show_regions()
    }

    fn show_regions(&mut self) -> Option<Effect> {
        self.mode = Mode::Regions;
        self.regions.set_items(Vec::new());
        self.status = "Loading regions...".into();
        Some(Effect::FetchRegions {
            context: self.active.clone(),
        })
    }

    fn open_compartments(&mut self) -> Option<Effect> {
        if self.mode == Mode::Contexts {
            let ctx = self.selected_context()?;
            self.set_active(ctx);
        } else if self.active.name.is_empty() {
            let ctx = self.initial_context()?;
            self.set_active(ctx);
        }
        let root = self.active.start_compartment().to_string();
        self.enter_compartments(root)
    }

    fn open_tenancies(&mut self) {
        if self.tenancies.is_empty() {
            self.status = "No tenancies available".into();
            return;
        }
        self.mode = Mode::Tenancies;
        self.status = TENANCY_HINT.into();
    }

    /// Fresh compartment walk rooted at `root` for the active context.
    fn enter_compartments(&mut self, root: String) -> Option<Effect> {
        let tenancy = self.active.tenancy_id.clone();
        self.parent_chain.clear();
        self.display_names.clear();
        self.parent_chain.insert(root.clone(), tenancy.clone());
        self.display_names.insert(tenancy, "root".into());
        self.parent_id = root;
        self.mode = Mode::Compartments;
        self.load_children()
    }

    fn load_children(&mut self) -> Option<Effect> {
        self.listing_parent = None;
        self.compartments.set_items(Vec::new());
        self.status = LOADING_COMPARTMENTS.into();
        self.crumb = format!(
            "Current: {} ({})",
            self.parent_label(&self.parent_id),
            self.parent_id
        );
        Some(Effect::FetchChildren {
            context: self.active.clone(),
            parent_id: self.parent_id.clone(),
        })
    }

    fn on_children(&mut self, parent_id: String, result: Result<Vec<Compartment>, CloudError>) {
        let nodes = match result {
            Ok(nodes) => nodes,
            Err(e) => {
                self.error = Some(NavError::Remote(e));
                self.finished = true;
                return;
            }
        };
        for node in &nodes {
            self.remember(node);
        }
        if parent_id != self.parent_id {
            tracing::debug!(parent = %parent_id, "stale children listing");
            return;
        }
        self.status = if nodes.is_empty() {
            LEAF_HINT.into()
        } else {
            String::new()
        };
        self.compartments
            .set_items(nodes.into_iter().map(Row::Compartment).collect());
        self.listing_parent = Some(parent_id);
    }

    fn on_regions(&mut self, context_name: &str, regions: Vec<String>, error: Option<CloudError>) {
        if context_name != self.active.name {
            return;
        }
        let shown = if regions.is_empty() {
            fallback_regions()
        } else {
            regions
        };
        self.regions
            .set_items(shown.into_iter().map(Row::Region).collect());
        self.regions.select_key(&self.active.region);
        self.status = match error {
            Some(e) => format!("Region fetch failed: {e} (showing defaults)"),
            None => REGION_HINT.into(),
        };
    }

    fn remember(&mut self, c: &Compartment) {
        self.parent_chain.insert(c.id.clone(), c.parent_id.clone());
        self.display_names.insert(c.id.clone(), c.name.clone());
    }

    fn parent_label(&self, id: &str) -> String {
        if id == self.active.tenancy_id {
            return "root".into();
        }
        self.display_names
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Switch the context being edited. Compartment and region choices made
    /// for a different context are dropped.
    fn set_active(&mut self, ctx: Context) {
        if ctx.name != self.active.name {
            self.clear_staged_descendants();
        }
        self.parent_id = ctx.start_compartment().to_string();
        self.active = ctx;
    }

    fn clear_staged_descendants(&mut self) {
        if matches!(
            self.staged,
            Staged::Compartment { .. } | Staged::Region(_)
        ) {
            self.staged = Staged::None;
        }
    }

    fn staged_compartment(&self) -> Option<String> {
        match &self.staged {
            Staged::Compartment { id, .. } => Some(id.clone()),
            _ => None,
        }
    }

    fn selected_context(&self) -> Option<Context> {
        match self.contexts.selected() {
            Some(Row::Context(c)) => Some(c.clone()),
            _ => None,
        }
    }

    fn selected_tenancy_context(&mut self) -> Option<(TenancyRow, Context)> {
        let Some(Row::Tenancy(row)) = self.tenancies.selected().cloned() else {
            self.status = "No tenancies available".into();
            return None;
        };
        let name = select_profile_for_tenancy(&row, &self.profiles, &self.doc.options.default_profile);
        let Some((name, profile)) = name.and_then(|n| self.profiles.get(&n).map(|p| (n, p))) else {
            self.status = format!("no profile found for tenancy {}", abbreviate_id(&row.tenancy_id));
            return None;
        };
        let ctx = context_for_profile(&name, profile);
        Some((row, ctx))
    }

    /// Current context row if listed, else the first row.
    fn initial_context(&self) -> Option<Context> {
        let rows = self.contexts.items();
        rows.iter()
            .find(|r| r.key() == self.doc.current_context && !self.doc.current_context.is_empty())
            .or_else(|| rows.first())
            .and_then(|r| match r {
                Row::Context(c) => Some(c.clone()),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::Profile;

    fn profile(tenancy: &str, region: &str) -> Profile {
        Profile {
            user: "ocid1.user".into(),
            tenancy: tenancy.into(),
            region: region.into(),
        }
    }

    fn state() -> NavState {
        let mut profiles = Profiles::new();
        profiles.insert("A".into(), profile("t1", "r1"));
        profiles.insert("B".into(), profile("t1", "r2"));
        profiles.insert("C".into(), profile("t2", "r1"));
        NavState::new(Document::default(), profiles, &TenancyNames::new())
    }

    fn act(s: &mut NavState, a: Action) -> Option<Effect> {
        s.update(NavMessage::Action(a))
    }

    fn node(id: &str, parent: &str) -> Compartment {
        Compartment {
            id: id.into(),
            name: format!("name-{id}"),
            status: "ACTIVE".into(),
            parent_id: parent.into(),
        }
    }

    fn children(s: &mut NavState, parent: &str, ids: &[&str]) {
        let nodes = ids.iter().map(|id| node(id, parent)).collect();
        s.update(NavMessage::ChildrenLoaded {
            parent_id: parent.into(),
            result: Ok(nodes),
        });
    }

    fn fetch_parent(effect: Option<Effect>) -> String {
        match effect {
            Some(Effect::FetchChildren { parent_id, .. }) => parent_id,
            other => panic!("expected fetch, got {other:?}"),
        }
    }

    #[test]
    fn staged_marker_respects_row_kind() {
        let mut s = state();
        s.staged = Staged::Context("A".into());
        let ctx = s.selected_context().unwrap();
        assert!(s.is_staged(&Row::Context(ctx)));
        assert!(!s.is_staged(&Row::Region("A".into())));
        assert!(!s.is_staged(&Row::Compartment(node("A", "t1"))));

        s.staged = Staged::Compartment {
            id: "c1".into(),
            name: "apps".into(),
        };
        assert!(s.is_staged(&Row::Compartment(node("c1", "t1"))));
        assert!(!s.is_staged(&Row::Region("c1".into())));
    }

    #[test]
    fn confirm_context_starts_at_its_compartment() {
        let mut s = state();
        let parent = fetch_parent(act(&mut s, Action::Confirm));
        assert_eq!(parent, "t1");
        assert_eq!(s.mode, Mode::Compartments);
        assert_eq!(s.active.name, "A");
    }

    #[test]
    fn empty_listing_commits_current_parent() {
        let mut s = state();
        act(&mut s, Action::Confirm);
        children(&mut s, "t1", &["c1"]);
        assert_eq!(fetch_parent(act(&mut s, Action::Confirm)), "c1");
        children(&mut s, "c1", &[]);

        assert_eq!(act(&mut s, Action::Confirm), Some(Effect::Save));
        let doc = s.document();
        assert_eq!(doc.current_context, "A");
        assert_eq!(doc.get_by_name("A").unwrap().compartment_id, "c1");
    }

    #[test]
    fn confirm_before_listing_arrives_does_not_commit() {
        let mut s = state();
        act(&mut s, Action::Confirm);
        assert_eq!(act(&mut s, Action::Confirm), None);
        assert!(!s.finished);
    }

    #[test]
    fn staged_compartment_survives_tenancies_round_trip() {
        let mut s = state();
        act(&mut s, Action::Confirm);
        children(&mut s, "t1", &["c1", "c2"]);
        act(&mut s, Action::MoveDown);
        act(&mut s, Action::Stage);
        assert_eq!(s.staged.key(), Some("c2"));

        act(&mut s, Action::OpenTenancies);
        assert_eq!(s.mode, Mode::Tenancies);
        assert_eq!(fetch_parent(act(&mut s, Action::OpenCompartments)), "t1");
        assert_eq!(s.staged.key(), Some("c2"));

        children(&mut s, "t1", &["c1", "c2"]);
        assert_eq!(act(&mut s, Action::Commit), Some(Effect::Save));
        assert_eq!(s.document().get_by_name("A").unwrap().compartment_id, "c2");
    }

    #[test]
    fn quit_discards_staged_and_never_saves() {
        let mut s = state();
        act(&mut s, Action::Stage);
        assert_eq!(act(&mut s, Action::Quit), None);
        assert!(s.finished);
        assert!(!s.committed);
        assert_eq!(s.staged, Staged::None);
        assert!(s.document().contexts.is_empty());
        assert_eq!(act(&mut s, Action::Commit), None);
    }

    #[test]
    fn save_result_marks_committed_or_error() {
        let mut s = state();
        act(&mut s, Action::Commit);
        s.apply_save_result(Ok(()));
        assert!(s.committed && s.finished);

        let mut s = state();
        act(&mut s, Action::Commit);
        s.apply_save_result(Err(StoreError::NoCurrent));
        assert!(!s.committed);
        assert!(matches!(s.error, Some(NavError::Store(_))));
    }

    #[test]
    fn filter_confirm_freezes_then_acts() {
        let mut s = state();
        act(&mut s, Action::StartFilter);
        act(&mut s, Action::FilterChar('b'));
        assert_eq!(act(&mut s, Action::Confirm), None);
        assert!(!s.contexts.is_filtering());
        assert_eq!(s.contexts.items().len(), 1);

        act(&mut s, Action::Confirm);
        assert_eq!(s.active.name, "B");
    }

    #[test]
    fn stale_listing_updates_names_only() {
        let mut s = state();
        act(&mut s, Action::Confirm);
        children(&mut s, "t1", &["c1"]);
        act(&mut s, Action::Confirm);
        // Late delivery for the root while c1 is loading.
        children(&mut s, "t1", &["c1", "c3"]);
        assert!(s.compartments.is_empty());
        assert_eq!(s.parent_id, "c1");
        assert_eq!(s.parent_label("c3"), "name-c3");
    }

    #[test]
    fn ascend_walks_up_then_leaves_at_root() {
        let mut s = state();
        act(&mut s, Action::Confirm);
        children(&mut s, "t1", &["c1"]);
        act(&mut s, Action::Confirm);
        children(&mut s, "c1", &["c5"]);

        assert_eq!(fetch_parent(act(&mut s, Action::Back)), "t1");
        assert_eq!(act(&mut s, Action::Back), None);
        assert_eq!(s.mode, Mode::Contexts);
    }

    #[test]
    fn remote_failure_ends_session() {
        let mut s = state();
        act(&mut s, Action::Confirm);
        s.update(NavMessage::ChildrenLoaded {
            parent_id: "t1".into(),
            result: Err(CloudError::Spawn("no oci".into())),
        });
        assert!(s.finished);
        assert!(matches!(s.error, Some(NavError::Remote(_))));
    }

    #[test]
    fn region_confirm_applies_and_returns() {
        let mut s = state();
        let effect = act(&mut s, Action::OpenRegions);
        assert!(matches!(effect, Some(Effect::FetchRegions { .. })));
        s.update(NavMessage::RegionsLoaded {
            context_name: "A".into(),
            regions: vec!["r1".into(), "r9".into()],
            error: None,
        });
        act(&mut s, Action::MoveDown);
        assert_eq!(act(&mut s, Action::Confirm), None);
        assert_eq!(s.mode, Mode::Contexts);
        assert_eq!(s.active.region, "r9");

        assert_eq!(act(&mut s, Action::Commit), Some(Effect::Save));
        assert_eq!(s.document().get_by_name("A").unwrap().region, "r9");
    }

    #[test]
    fn empty_region_list_shows_fallback() {
        let mut s = state();
        act(&mut s, Action::OpenRegions);
        s.update(NavMessage::RegionsLoaded {
            context_name: "A".into(),
            regions: Vec::new(),
            error: None,
        });
        assert_eq!(s.regions.items().len(), fallback_regions().len());
    }

    #[test]
    fn tenancy_confirm_uses_first_profile() {
        let mut s = state();
        act(&mut s, Action::OpenTenancies);
        let parent = fetch_parent(act(&mut s, Action::Confirm));
        assert_eq!(parent, "t1");
        assert_eq!(s.active.profile, "A");
    }

    #[test]
    fn tenancy_commit_roots_at_tenancy() {
        let mut s = state();
        act(&mut s, Action::OpenTenancies);
        act(&mut s, Action::MoveDown);
        assert_eq!(act(&mut s, Action::Commit), Some(Effect::Save));
        let doc = s.document();
        assert_eq!(doc.current_context, "C");
        assert_eq!(doc.get_by_name("C").unwrap().compartment_id, "t2");
    }

    #[test]
    fn start_mode_uses_current_context() {
        let mut profiles = Profiles::new();
        profiles.insert("A".into(), profile("t1", "r1"));
        profiles.insert("B".into(), profile("t2", "r1"));
        let doc = Document {
            current_context: "B".into(),
            ..Default::default()
        };
        let mut s = NavState::new(doc, profiles, &TenancyNames::new());
        assert_eq!(fetch_parent(s.start(Mode::Compartments)), "t2");
        assert_eq!(s.active.name, "B");
    }

    #[test]
    fn stored_contexts_when_no_profiles() {
        let mut doc = Document::default();
        doc.upsert(Context {
            name: "saved".into(),
            profile: "P".into(),
            tenancy_id: "t".into(),
            compartment_id: "c".into(),
            ..Default::default()
        });
        let s = NavState::new(doc, Profiles::new(), &TenancyNames::new());
        assert_eq!(s.contexts.items().len(), 1);
        assert!(s.tenancies.is_empty());
    }

    #[test]
    fn meta_line_reports_staged_and_filter() {
        let mut s = state();
        act(&mut s, Action::Stage);
        assert_eq!(s.meta(), "mode:contexts | current:A | staged:ctx:A | filter:off");
        act(&mut s, Action::StartFilter);
        assert!(s.meta().ends_with("filter:on"));
    }
}
