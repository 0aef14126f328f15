use std::collections::HashMap;

/// Name-keyed asset cache. Unbounded unless a limit is set, in which case the
/// least recently used entry is evicted on insert.
#[derive(Debug)]
pub struct AssetCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    limit: Option<usize>,
    tick: u64,
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    last_used: u64,
}

impl<V: Clone> AssetCache<V> {
    pub fn new(limit: Option<usize>) -> Self {
        Self { entries: HashMap::new(), limit: limit.map(|limit| limit.max(1)), tick: 0 }
    }

    pub fn get(&mut self, name: &str) -> Option<V> {
        self.tick += 1;
        let tick = self.tick;
        self.entries.get_mut(name).map(|entry| {
            entry.last_used = tick;
            entry.value.clone()
        })
    }

    /// Inserts `value`, returning the name of the entry evicted to make room.
    pub fn insert(&mut self, name: impl Into<String>, value: V) -> Option<String> {
        self.tick += 1;
        let name = name.into();
        let mut evicted = None;
        if let Some(limit) = self.limit {
            if !self.entries.contains_key(&name) && self.entries.len() >= limit {
                evicted = self.entries.iter().min_by_key(|(_, entry)| entry.last_used).map(|(key, _)| key.clone());
                if let Some(key) = &evicted {
                    self.entries.remove(key);
                }
            }
        }
        self.entries.insert(name, CacheEntry { value, last_used: self.tick });
        evicted
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_cache_keeps_everything() {
        let mut cache = AssetCache::new(None);
        for i in 0..32 {
            assert_eq!(cache.insert(format!("t{i}"), i), None);
        }
        assert_eq!(cache.len(), 32);
    }

    #[test]
    fn bounded_cache_evicts_least_recently_used() {
        let mut cache = AssetCache::new(Some(2));
        cache.insert("brick", 1);
        cache.insert("wood", 2);
        assert_eq!(cache.get("brick"), Some(1));
        assert_eq!(cache.insert("stone", 3).as_deref(), Some("wood"));
        assert!(cache.contains("brick"));
        assert!(!cache.contains("wood"));
    }

    #[test]
    fn replacing_an_entry_does_not_evict() {
        let mut cache = AssetCache::new(Some(1));
        cache.insert("brick", 1);
        assert_eq!(cache.insert("brick", 2), None);
        assert_eq!(cache.get("brick"), Some(2));
    }
}
