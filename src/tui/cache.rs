//! Session-lifetime cache of remote listings.
//!
//! Filled at most once per key, never evicted or invalidated.

use std::collections::HashMap;

use crate::cloud::Compartment;

#[derive(Debug, Default)]
pub struct ResourceCache {
    children: HashMap<String, Vec<Compartment>>,
    regions: HashMap<String, Vec<String>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Children listed under `parent_id`, if fetched before.
    pub fn children(&self, parent_id: &str) -> Option<&[Compartment]> {
        self.children.get(parent_id).map(Vec::as_slice)
    }

    pub fn put_children(&mut self, parent_id: &str, nodes: Vec<Compartment>) {
        self.children.insert(parent_id.to_string(), nodes);
    }

    /// Regions cached under a context name.
    pub fn regions(&self, context_name: &str) -> Option<&[String]> {
        self.regions.get(context_name).map(Vec::as_slice)
    }

    pub fn put_regions(&mut self, context_name: &str, regions: Vec<String>) {
        self.regions.insert(context_name.to_string(), regions);
    }
}
