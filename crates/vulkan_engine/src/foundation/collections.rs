//! Specialized collection types

use std::collections::HashMap;
use std::hash::Hash;

pub use slotmap::{new_key_type, SlotMap};

/// Index-addressed store that deduplicates entries by key
///
/// The first registration of a key runs the loader and stores the result at
/// the next free index; later registrations only bump the reference count.
/// Indices are never reused, so an index stays valid for the registry's
/// lifetime.
#[derive(Debug)]
pub struct DedupRegistry<K, T> {
    items: Vec<T>,
    ref_counts: Vec<u32>,
    by_key: HashMap<K, usize>,
}

impl<K: Eq + Hash, T> Default for DedupRegistry<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, T> DedupRegistry<K, T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            ref_counts: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    /// Register `key`, loading the value only on first sight
    ///
    /// Returns the stable index of the entry. A failing loader leaves the
    /// registry unchanged.
    pub fn register_with<E>(
        &mut self,
        key: K,
        load: impl FnOnce() -> Result<T, E>,
    ) -> Result<usize, E> {
        if let Some(&index) = self.by_key.get(&key) {
            self.ref_counts[index] += 1;
            return Ok(index);
        }

        let item = load()?;
        let index = self.items.len();
        self.items.push(item);
        self.ref_counts.push(1);
        self.by_key.insert(key, index);
        Ok(index)
    }

    /// Insert a value that is not addressable by key
    pub fn insert_anonymous(&mut self, item: T) -> usize {
        let index = self.items.len();
        self.items.push(item);
        self.ref_counts.push(1);
        index
    }

    /// Look up the index registered for `key`
    pub fn index_of<Q>(&self, key: &Q) -> Option<usize>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.by_key.get(key).copied()
    }

    /// Number of registrations that resolved to `index`
    pub fn ref_count(&self, index: usize) -> u32 {
        self.ref_counts.get(index).copied().unwrap_or(0)
    }

    /// Get an entry by index
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// All entries in index order
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the registry holds no entries
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_registration_loads_once() {
        let mut registry: DedupRegistry<String, u32> = DedupRegistry::new();
        let mut loads = 0;

        for _ in 0..5 {
            let index = registry
                .register_with("stone.png".to_string(), || -> Result<u32, ()> {
                    loads += 1;
                    Ok(7)
                })
                .unwrap();
            assert_eq!(index, 0);
        }

        assert_eq!(loads, 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.ref_count(0), 5);
    }

    #[test]
    fn test_indices_are_stable_in_registration_order() {
        let mut registry: DedupRegistry<&str, &str> = DedupRegistry::new();
        let white = registry.insert_anonymous("white");
        let a = registry.register_with("a", || Ok::<_, ()>("A")).unwrap();
        let b = registry.register_with("b", || Ok::<_, ()>("B")).unwrap();
        let a_again = registry.register_with("a", || Ok::<_, ()>("A2")).unwrap();

        assert_eq!((white, a, b, a_again), (0, 1, 2, 1));
        assert_eq!(registry.get(1), Some(&"A"));
        assert_eq!(registry.index_of("b"), Some(2));
    }

    #[test]
    fn test_failed_load_leaves_registry_untouched() {
        let mut registry: DedupRegistry<&str, u8> = DedupRegistry::new();
        let result = registry.register_with("missing", || Err("not found"));

        assert_eq!(result, Err("not found"));
        assert!(registry.is_empty());
        assert_eq!(registry.index_of("missing"), None);
    }
}
