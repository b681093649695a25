//! Bounded FIFO set of recently handled packet hashes.
//!
//! Observers republish the same packet as it floods; remembering the last
//! few hundred hashes suppresses reprocessing. Eviction is strictly in
//! insertion order: seeing a hash again does not refresh its position.
use std::collections::{HashSet, VecDeque};

/// Number of hashes remembered by default.
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct SeenCache {
    capacity: usize,
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl Default for SeenCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SeenCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
        }
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.members.contains(hash)
    }

    /// Remember `hash`, evicting the oldest entry when full. Returns the
    /// evicted hash, if any. Already-present hashes are left where they are.
    pub fn remember(&mut self, hash: &str) -> Option<String> {
        if self.members.contains(hash) {
            return None;
        }
        let evicted = if self.order.len() >= self.capacity {
            self.order.pop_front().map(|old| {
                self.members.remove(&old);
                old
            })
        } else {
            None
        };
        self.order.push_back(hash.to_string());
        self.members.insert(hash.to_string());
        evicted
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_most_recent_hundred_of_101() {
        let mut cache = SeenCache::default();
        let mut evicted = Vec::new();
        for i in 0..101 {
            if let Some(old) = cache.remember(&format!("h{i}")) {
                evicted.push(old);
            }
        }
        assert_eq!(cache.len(), 100);
        assert_eq!(evicted, vec!["h0".to_string()]);
        assert!(!cache.contains("h0"));
        for i in 1..101 {
            assert!(cache.contains(&format!("h{i}")), "missing h{i}");
        }
    }

    #[test]
    fn re_remembering_does_not_refresh_position() {
        let mut cache = SeenCache::new(2);
        cache.remember("a");
        cache.remember("b");
        assert_eq!(cache.remember("a"), None);
        assert_eq!(cache.len(), 2);
        // "a" is still the oldest and goes first
        assert_eq!(cache.remember("c"), Some("a".to_string()));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut cache = SeenCache::new(0);
        assert_eq!(cache.capacity(), 1);
        assert!(cache.is_empty());
        cache.remember("x");
        assert_eq!(cache.remember("y"), Some("x".to_string()));
    }
}
