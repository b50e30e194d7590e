use std::hash::Hash;

#[cfg(not(shuttle))]
use scc::{hash_index::Entry, HashIndex};

#[cfg(shuttle)]
use std::collections::{hash_map::Entry, HashMap};

/// An append-only concurrent map.
///
/// An entry is inserted at most once and is never removed, so a value read
/// from the map stays valid forever.
pub struct Index<K, V>
where
    K: 'static + Copy + Eq + Hash,
    V: 'static + Copy,
{
    #[cfg(not(shuttle))]
    inner: HashIndex<K, V>,

    // shuttle-friendly version of HashIndex.
    #[cfg(shuttle)]
    inner: shuttle::sync::RwLock<HashMap<K, V>>,
}

impl<K, V> Default for Index<K, V>
where
    K: 'static + Copy + Eq + Hash,
    V: 'static + Copy,
{
    fn default() -> Self {
        Self {
            #[cfg(not(shuttle))]
            inner: HashIndex::default(),

            #[cfg(shuttle)]
            inner: shuttle::sync::RwLock::new(HashMap::new()),
        }
    }
}

#[cfg(not(shuttle))]
impl<K, V> Index<K, V>
where
    K: 'static + Copy + Eq + Hash,
    V: 'static + Copy,
{
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.peek_with(key, |_, value| *value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    /// Inserts `value` unless `key` is already present.
    ///
    /// Returns the present value if the insertion didn't happen.
    pub fn try_insert(&self, key: K, value: V) -> Result<(), V> {
        match self.inner.entry(key) {
            Entry::Occupied(entry) => Err(*entry.get()),
            Entry::Vacant(entry) => {
                entry.insert_entry(value);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(shuttle)]
impl<K, V> Index<K, V>
where
    K: 'static + Copy + Eq + Hash,
    V: 'static + Copy,
{
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.read().unwrap().get(key).copied()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.read().unwrap().contains_key(key)
    }

    pub fn try_insert(&self, key: K, value: V) -> Result<(), V> {
        match self.inner.write().unwrap().entry(key) {
            Entry::Occupied(entry) => Err(*entry.get()),
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }
}
