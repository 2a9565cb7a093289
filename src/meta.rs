//! Key/value metadata table of the post editor.
//!
//! The table always ends in one blank row the user can type into. Filling in
//! that row's key commits it and appends a fresh blank row, so there is no
//! explicit "add row" action.

use std::collections::BTreeMap;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    /// The trailing row; a non-empty key spawns the next row.
    Active,
    /// Any earlier row; edits never spawn rows.
    Committed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaRow {
    pub key: String,
    pub value: String,
    pub state: RowState,
}

impl MetaRow {
    pub fn is_active(&self) -> bool {
        self.state == RowState::Active
    }
}

/// Produce a new trailing row.
pub fn render_row(key: impl Into<String>, value: impl Into<String>) -> MetaRow {
    MetaRow {
        key: key.into(),
        value: value.into(),
        state: RowState::Active,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTable {
    rows: Vec<MetaRow>,
}

impl Default for MetaTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaTable {
    pub fn new() -> Self {
        Self {
            rows: vec![render_row("", "")],
        }
    }

    /// Existing entries as committed rows, followed by one blank row.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut rows: Vec<MetaRow> = pairs
            .into_iter()
            .map(|(key, value)| MetaRow {
                key: key.into(),
                value: value.into(),
                state: RowState::Committed,
            })
            .collect();
        rows.push(render_row("", ""));
        Self { rows }
    }

    pub fn rows(&self) -> &[MetaRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, index: usize) -> Option<&MetaRow> {
        self.rows.get(index)
    }

    /// Change handler for every key input. Returns true when a row was
    /// appended.
    pub fn on_key_change(&mut self, index: usize, value: impl Into<String>) -> bool {
        let Some(row) = self.rows.get_mut(index) else {
            return false;
        };
        row.key = value.into();
        if !row.is_active() || row.key.is_empty() {
            return false;
        }
        row.state = RowState::Committed;
        self.rows.push(render_row("", ""));
        debug!(row = index, rows = self.rows.len(), "metadata row committed");
        true
    }

    pub fn on_value_change(&mut self, index: usize, value: impl Into<String>) {
        if let Some(row) = self.rows.get_mut(index) {
            row.value = value.into();
        }
    }

    /// Submitted metadata. Rows without a key are skipped and later keys win.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.rows
            .iter()
            .filter(|row| !row.key.is_empty())
            .map(|row| (row.key.clone(), row.value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filling_trailing_key_appends_blank_row() {
        let mut table = MetaTable::new();
        assert!(table.on_key_change(0, "author"));

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].state, RowState::Committed);
        assert_eq!(table.rows()[0].key, "author");
        assert_eq!(table.rows()[1], render_row("", ""));
    }

    #[test]
    fn test_committed_row_stays_frozen() {
        let mut table = MetaTable::new();
        table.on_key_change(0, "author");

        // re-editing the first row never spawns another one
        assert!(!table.on_key_change(0, "editor"));
        assert!(!table.on_key_change(0, ""));
        assert!(!table.on_key_change(0, "author"));
        assert_eq!(table.len(), 2);

        // the new trailing row is still reactive
        assert!(table.on_key_change(1, "lang"));
        assert_eq!(table.len(), 3);
        assert!(table.rows()[2].is_active());
    }

    #[test]
    fn test_clearing_trailing_key_adds_nothing() {
        let mut table = MetaTable::new();
        assert!(!table.on_key_change(0, ""));
        assert_eq!(table.len(), 1);
        assert!(table.rows()[0].is_active());
    }

    #[test]
    fn test_value_edits_do_not_change_structure() {
        let mut table = MetaTable::new();
        table.on_value_change(0, "orphan value");
        assert_eq!(table.len(), 1);
        assert!(table.rows()[0].is_active());
        assert!(table.entries().is_empty());
    }

    #[test]
    fn test_from_pairs_and_entries() {
        let mut table = MetaTable::from_pairs([("a", "1"), ("b", "2")]);
        assert_eq!(table.len(), 3);
        assert!(!table.rows()[0].is_active());
        assert!(table.rows()[2].is_active());

        table.on_key_change(2, "a");
        table.on_value_change(2, "3");
        let entries = table.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["a"], "3");
        assert_eq!(entries["b"], "2");
    }

    #[test]
    fn test_out_of_range_row_is_ignored() {
        let mut table = MetaTable::new();
        assert!(!table.on_key_change(5, "x"));
        table.on_value_change(5, "y");
        assert_eq!(table, MetaTable::new());
    }
}
