//! Filterable row list with a cursor.

use super::rows::Row;

#[derive(Debug, Clone, Default)]
pub struct RowList {
    items: Vec<Row>,
    filtering: bool,
    filter: String,
    selected: usize,
}

impl RowList {
    pub fn new(items: Vec<Row>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    /// Replace the rows, leaving filter mode and resetting the cursor.
    pub fn set_items(&mut self, items: Vec<Row>) {
        self.items = items;
        self.filtering = false;
        self.filter.clear();
        self.selected = 0;
    }

    pub fn items(&self) -> &[Row] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Rows currently shown: all of them, or the case-insensitive filter matches.
    pub fn visible(&self) -> Vec<&Row> {
        if !self.filtering || self.filter.is_empty() {
            return self.items.iter().collect();
        }
        let needle = self.filter.to_lowercase();
        self.items
            .iter()
            .filter(|r| r.filter_value().to_lowercase().contains(&needle))
            .collect()
    }

    pub fn selected(&self) -> Option<&Row> {
        self.visible().get(self.selected).copied()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Point the cursor at the first row with this key, if present.
    pub fn select_key(&mut self, key: &str) {
        if let Some(i) = self.visible().iter().position(|r| r.key() == key) {
            self.selected = i;
        }
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        let len = self.visible().len();
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    pub fn is_filtering(&self) -> bool {
        self.filtering
    }

    pub fn filter_text(&self) -> &str {
        &self.filter
    }

    pub fn start_filter(&mut self) {
        self.filtering = true;
        self.filter.clear();
        self.selected = 0;
    }

    pub fn push_filter(&mut self, c: char) {
        self.filter.push(c);
        self.selected = 0;
    }

    pub fn pop_filter(&mut self) {
        self.filter.pop();
        self.selected = 0;
    }

    pub fn cancel_filter(&mut self) {
        self.filtering = false;
        self.filter.clear();
        self.selected = 0;
    }

    /// Keep only the matching rows and leave filter mode.
    pub fn freeze_filter(&mut self) {
        let kept: Vec<Row> = self.visible().into_iter().cloned().collect();
        self.set_items(kept);
    }
}
