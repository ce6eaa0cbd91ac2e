//! Surrogate-id interning for lookup tables.
//!
//! Each attribute domain (categories, price types, content ratings,
//! genres) gets its own independent `Interner`. The domains never share
//! key space, so the normalization passes need no coordination between
//! them.

use rustc_hash::FxHashMap;

/// Maps a normalized string key to a dense integer id and keeps the
/// emitted entities in first-seen order.
pub struct Interner<T> {
    by_key: FxHashMap<String, i64>,
    entities: Vec<T>,
}

impl<T> Interner<T> {
    pub fn new() -> Self {
        Self {
            by_key: FxHashMap::default(),
            entities: Vec::new(),
        }
    }

    /// Intern a key, returning its stable id.
    ///
    /// A key seen before returns its existing id and leaves the entity
    /// collection untouched. A new key is assigned `id = len()`, stored
    /// under the key, and the entity built by `build(id)` is appended.
    pub fn intern(&mut self, key: &str, build: impl FnOnce(i64) -> T) -> i64 {
        if let Some(&id) = self.by_key.get(key) {
            return id;
        }
        let id = self.entities.len() as i64;
        self.by_key.insert(key.to_string(), id);
        self.entities.push(build(id));
        id
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Drain the interner into its ordered entity collection.
    pub fn into_entities(self) -> Vec<T> {
        self.entities
    }
}

impl<T> Default for Interner<T> {
    fn default() -> Self {
        Self::new()
    }
}
