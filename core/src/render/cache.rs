//! Keyed store for cached device resources.
//!
//! At most one resource lives per phrase id. Texture entries also remember
//! the height they were rasterized at; inserting for an existing phrase
//! supersedes (drops) the previous resource. Only the render thread mutates
//! a cache, so there is no locking here.

use crate::waveform::PhraseId;
use std::collections::HashMap;

/// Identifies one cached resource.
///
/// The serial changes on every rebuild, so a handle outliving its entry
/// resolves to nothing instead of to a newer resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    phrase: PhraseId,
    serial: u64,
}

impl ResourceHandle {
    pub fn phrase(&self) -> &PhraseId {
        &self.phrase
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }
}

#[derive(Debug)]
struct CacheEntry<R> {
    serial: u64,
    height: Option<u32>,
    bytes: usize,
    resource: R,
}

/// Phrase-keyed resource cache.
#[derive(Debug)]
pub struct ResourceCache<R> {
    label: &'static str,
    entries: HashMap<PhraseId, CacheEntry<R>>,
    next_serial: u64,
    builds: u64,
}

impl<R> ResourceCache<R> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: HashMap::new(),
            next_serial: 1,
            builds: 0,
        }
    }

    /// Handle for an entry matching the full key, if cached.
    pub fn lookup(&self, phrase: &PhraseId, height: Option<u32>) -> Option<ResourceHandle> {
        let entry = self.entries.get(phrase)?;
        (entry.height == height).then(|| ResourceHandle {
            phrase: phrase.clone(),
            serial: entry.serial,
        })
    }

    /// Store a freshly built resource, superseding any entry for the same phrase.
    pub fn insert(&mut self, phrase: PhraseId, height: Option<u32>, bytes: usize, resource: R) -> ResourceHandle {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.builds += 1;

        if let Some(old) = self.entries.insert(
            phrase.clone(),
            CacheEntry {
                serial,
                height,
                bytes,
                resource,
            },
        ) {
            log::debug!(
                "{} cache: superseded {} (height {:?} -> {:?})",
                self.label,
                phrase,
                old.height,
                height
            );
        }

        ResourceHandle { phrase, serial }
    }

    pub fn get(&self, handle: &ResourceHandle) -> Option<&R> {
        self.entries
            .get(&handle.phrase)
            .filter(|entry| entry.serial == handle.serial)
            .map(|entry| &entry.resource)
    }

    pub fn contains(&self, handle: &ResourceHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn evict(&mut self, phrase: &PhraseId) -> bool {
        self.entries.remove(phrase).is_some()
    }

    /// Drop every entry whose phrase `keep` rejects. Returns how many were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&PhraseId) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|phrase, _| keep(phrase));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resources built since construction.
    pub fn builds(&self) -> u64 {
        self.builds
    }

    pub fn total_bytes(&self) -> usize {
        self.entries.values().map(|e| e.bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_requires_matching_height() {
        let mut cache = ResourceCache::new("test");
        let id = PhraseId::new("a");
        let handle = cache.insert(id.clone(), Some(120), 10, "tex");

        assert_eq!(cache.lookup(&id, Some(120)), Some(handle));
        assert_eq!(cache.lookup(&id, Some(121)), None);
        assert_eq!(cache.lookup(&PhraseId::new("b"), Some(120)), None);
    }

    #[test]
    fn test_insert_supersedes_same_phrase() {
        let mut cache = ResourceCache::new("test");
        let id = PhraseId::new("a");
        let old = cache.insert(id.clone(), Some(100), 10, 1);
        let new = cache.insert(id.clone(), Some(200), 20, 2);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&old), None, "stale handle resolves to nothing");
        assert_eq!(cache.get(&new), Some(&2));
        assert_eq!(cache.builds(), 2);
        assert_eq!(cache.total_bytes(), 20);
    }

    #[test]
    fn test_evict_and_retain() {
        let mut cache = ResourceCache::new("test");
        for name in ["a", "b", "c"] {
            cache.insert(PhraseId::new(name), None, 1, ());
        }
        assert!(cache.evict(&PhraseId::new("a")));
        assert!(!cache.evict(&PhraseId::new("a")));

        let dropped = cache.retain(|id| id.as_str() == "c");
        assert_eq!(dropped, 1);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
