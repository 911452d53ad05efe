//! Current slider and toggle values, keyed by (tab, function)

use std::collections::HashMap;

use super::types::{ParameterKey, ParameterValue};

/// Mapping from parameter key to its UI value.
///
/// Pure state: it never calls the effects engine. Slider values are clamped
/// to 0-100 on write, and a key holds at most one value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterStore {
    values: HashMap<ParameterKey, ParameterValue>,
}

impl ParameterStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value, if any
    pub fn get(&self, key: &ParameterKey) -> Option<ParameterValue> {
        self.values.get(key).copied()
    }

    /// Slider position for a key, 0 when unset
    pub fn slider_value(&self, key: &ParameterKey) -> u8 {
        self.get(key).map(|v| v.as_slider()).unwrap_or(0)
    }

    /// Toggle state for a key, false when unset
    pub fn toggle_value(&self, key: &ParameterKey) -> bool {
        self.get(key).map(|v| v.as_bool()).unwrap_or(false)
    }

    /// Replace the value for a key
    pub fn set(&mut self, key: ParameterKey, value: ParameterValue) {
        self.values.insert(key, value.clamped());
    }

    /// Remove every value in `tab`, returning the removed keys
    pub fn clear_by_tab(&mut self, tab: &str) -> Vec<ParameterKey> {
        let removed: Vec<ParameterKey> = self
            .values
            .keys()
            .filter(|k| k.tab == tab)
            .cloned()
            .collect();
        for key in &removed {
            self.values.remove(key);
        }
        removed
    }

    pub fn clear_all(&mut self) {
        self.values.clear();
    }

    /// Entries belonging to `tab`, in no particular order
    pub fn entries_in_tab<'a>(
        &'a self,
        tab: &'a str,
    ) -> impl Iterator<Item = (&'a ParameterKey, &'a ParameterValue)> + 'a {
        self.values.iter().filter(move |(k, _)| k.tab == tab)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParameterKey, &ParameterValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let store = ParameterStore::new();
        let key = ParameterKey::new("beauty", "smooth");
        assert_eq!(store.get(&key), None);
        assert_eq!(store.slider_value(&key), 0);
        assert!(!store.toggle_value(&key));
    }

    #[test]
    fn test_set_replaces_and_clamps() {
        let mut store = ParameterStore::new();
        let key = ParameterKey::new("beauty", "smooth");
        store.set(key.clone(), ParameterValue::Slider(40));
        store.set(key.clone(), ParameterValue::Slider(140));
        assert_eq!(store.len(), 1);
        assert_eq!(store.slider_value(&key), 100);
    }

    #[test]
    fn test_clear_by_tab() {
        let mut store = ParameterStore::new();
        store.set(ParameterKey::new("beauty", "white"), ParameterValue::Slider(10));
        store.set(ParameterKey::new("beauty", "smooth"), ParameterValue::Slider(20));
        store.set(ParameterKey::new("reshape", "thin_face"), ParameterValue::Slider(30));

        let mut removed = store.clear_by_tab("beauty");
        removed.sort();
        assert_eq!(
            removed,
            vec![
                ParameterKey::new("beauty", "smooth"),
                ParameterKey::new("beauty", "white"),
            ]
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.entries_in_tab("beauty").count(), 0);
        assert!(store.clear_by_tab("beauty").is_empty());
    }

    #[test]
    fn test_clear_all() {
        let mut store = ParameterStore::new();
        store.set(ParameterKey::new("virtual_bg", "blur"), ParameterValue::Toggle(true));
        store.clear_all();
        assert!(store.is_empty());
    }

    #[test]
    fn test_arbitrary_sequences_keep_invariants() {
        let mut store = ParameterStore::new();
        let tabs = ["beauty", "reshape", "makeup"];
        let functions = ["a", "b", "c", "d"];
        let mut seed: u32 = 7;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let tab = tabs[(seed >> 8) as usize % tabs.len()];
            let function = functions[(seed >> 16) as usize % functions.len()];
            let raw = (seed >> 4) as u8;
            store.set(ParameterKey::new(tab, function), ParameterValue::Slider(raw));
        }
        assert!(store.len() <= tabs.len() * functions.len());
        assert!(store.iter().all(|(_, v)| v.as_slider() <= 100));
        assert!(store
            .iter()
            .all(|(_, v)| matches!(v, ParameterValue::Slider(s) if *s <= 100)));
    }
}
