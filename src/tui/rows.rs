//! List rows for the four navigation modes.

use std::collections::BTreeMap;

use crate::cloud::{abbreviate_id, Compartment};
use crate::profiles::{Profile, Profiles};
use crate::store::Context;

use super::names::TenancyNames;

/// Shown when region subscriptions cannot be listed.
pub const FALLBACK_REGIONS: &[&str] = &[
    "us-ashburn-1",
    "us-phoenix-1",
    "eu-frankfurt-1",
    "eu-zurich-1",
    "uk-london-1",
    "ap-tokyo-1",
    "ap-osaka-1",
    "ap-seoul-1",
    "ap-mumbai-1",
    "ap-sydney-1",
    "ap-melbourne-1",
    "sa-saopaulo-1",
    "ca-toronto-1",
    "af-johannesburg-1",
    "me-dubai-1",
    "me-jeddah-1",
    "il-jerusalem-1",
];

pub fn fallback_regions() -> Vec<String> {
    FALLBACK_REGIONS.iter().map(|r| r.to_string()).collect()
}

/// A tenancy grouped from the profiles that point at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenancyRow {
    pub tenancy_id: String,
    /// Sorted profile names.
    pub profiles: Vec<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Context(Context),
    Tenancy(TenancyRow),
    Compartment(Compartment),
    Region(String),
}

impl Row {
    pub fn title(&self) -> String {
        match self {
            Row::Context(c) => c.name.clone(),
            Row::Tenancy(t) => t
                .name
                .clone()
                .unwrap_or_else(|| abbreviate_id(&t.tenancy_id)),
            Row::Compartment(c) if c.is_active() => c.name.clone(),
            Row::Compartment(c) => format!("{} [{}]", c.name, c.status),
            Row::Region(r) => r.clone(),
        }
    }

    pub fn description(&self) -> String {
        match self {
            Row::Context(c) => format!("profile={} region={}", c.profile, c.region),
            Row::Tenancy(t) => t.tenancy_id.clone(),
            Row::Compartment(c) => c.id.clone(),
            Row::Region(r) => r.clone(),
        }
    }

    /// Text matched by the list filter.
    pub fn filter_value(&self) -> String {
        match self {
            Row::Context(c) => c.name.clone(),
            Row::Tenancy(t) => match &t.name {
                Some(name) => format!("{name} {}", t.tenancy_id),
                None => t.tenancy_id.clone(),
            },
            Row::Compartment(c) => c.name.clone(),
            Row::Region(r) => r.clone(),
        }
    }

    /// Identity used for staging: context name, tenancy id, compartment id or region name.
    pub fn key(&self) -> &str {
        match self {
            Row::Context(c) => &c.name,
            Row::Tenancy(t) => &t.tenancy_id,
            Row::Compartment(c) => &c.id,
            Row::Region(r) => r,
        }
    }
}

/// Synthetic context for a profile, rooted at its tenancy.
pub fn context_for_profile(name: &str, p: &Profile) -> Context {
    Context {
        name: name.to_string(),
        profile: name.to_string(),
        tenancy_id: p.tenancy.clone(),
        compartment_id: p.tenancy.clone(),
        region: p.region.clone(),
        user: p.user.clone(),
        notes: String::new(),
    }
}

/// One context row per profile, in name order.
pub fn contexts_from_profiles(profiles: &Profiles) -> Vec<Row> {
    profiles
        .iter()
        .map(|(name, p)| Row::Context(context_for_profile(name, p)))
        .collect()
}

/// One row per distinct tenancy, ordered by tenancy id.
pub fn tenancies_from_profiles(profiles: &Profiles, names: &TenancyNames) -> Vec<Row> {
    let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (name, p) in profiles {
        grouped.entry(&p.tenancy).or_default().push(name.clone());
    }
    grouped
        .into_iter()
        .map(|(tenancy_id, mut members)| {
            members.sort();
            Row::Tenancy(TenancyRow {
                tenancy_id: tenancy_id.to_string(),
                profiles: members,
                name: names.get(tenancy_id),
            })
        })
        .collect()
}

/// Representative profile: the default if it belongs to the tenancy, else the first.
pub fn select_profile_for_tenancy(
    row: &TenancyRow,
    profiles: &Profiles,
    default_profile: &str,
) -> Option<String> {
    if !default_profile.is_empty() {
        if let Some(p) = profiles.get(default_profile) {
            if p.tenancy == row.tenancy_id {
                return Some(default_profile.to_string());
            }
        }
    }
    row.profiles.first().cloned()
}
