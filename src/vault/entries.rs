//! In-memory collection of vault entries.
//!
//! Entries live in a plain `Vec`.  Removal is swap-with-last-and-truncate,
//! so entry order is NOT stable across removals.  Duplicate names are
//! allowed at this layer; `lookup` returns the first match.

use super::entry::VaultEntry;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryStore {
    entries: Vec<VaultEntry>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// First entry whose original name is `name`.
    pub fn lookup(&self, name: &str) -> Option<&VaultEntry> {
        self.entries.iter().find(|e| e.original_name == name)
    }

    /// Index of the first entry whose original name is `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.original_name == name)
    }

    pub fn add(&mut self, entry: VaultEntry) {
        self.entries.push(entry);
    }

    /// Remove the first entry named `name`.  The last entry takes its slot.
    pub fn remove(&mut self, name: &str) -> Option<VaultEntry> {
        let idx = self.position(name)?;
        Some(self.entries.swap_remove(idx))
    }

    /// Swap-remove the entry at `idx`.
    pub fn remove_at(&mut self, idx: usize) -> Option<VaultEntry> {
        if idx < self.entries.len() {
            Some(self.entries.swap_remove(idx))
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[VaultEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VaultEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<VaultEntry> {
        self.entries
    }
}

impl From<Vec<VaultEntry>> for EntryStore {
    fn from(entries: Vec<VaultEntry>) -> Self {
        Self { entries }
    }
}

impl<'a> IntoIterator for &'a EntryStore {
    type Item = &'a VaultEntry;
    type IntoIter = std::slice::Iter<'a, VaultEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, size: u64) -> VaultEntry {
        VaultEntry {
            original_name: name.into(),
            ciphertext_path: format!("ct-{name}"),
            iv: vec![0; 16],
            plaintext_size: size,
            padding_len: 0,
            auth_tag: vec![0; 32],
        }
    }

    #[test]
    fn lookup_returns_first_match() {
        let mut store = EntryStore::new();
        store.add(entry("dup", 1));
        store.add(entry("dup", 2));
        assert_eq!(store.lookup("dup").unwrap().plaintext_size, 1);
        assert!(store.lookup("missing").is_none());
    }

    #[test]
    fn remove_swaps_last_into_place() {
        let mut store = EntryStore::new();
        for name in ["a", "b", "c", "d"] {
            store.add(entry(name, 0));
        }

        let removed = store.remove("b").unwrap();
        assert_eq!(removed.original_name, "b");

        let names: Vec<&str> = store.iter().map(|e| e.original_name.as_str()).collect();
        assert_eq!(names, ["a", "d", "c"]);
    }

    #[test]
    fn remove_missing_is_none() {
        let mut store = EntryStore::new();
        store.add(entry("a", 0));
        assert!(store.remove("z").is_none());
        assert!(store.remove_at(5).is_none());
        assert_eq!(store.len(), 1);
    }
}
