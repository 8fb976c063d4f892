//! Bounded memo of connection geometry.
//!
//! Keys combine both endpoint ids with both endpoint positions, so a node
//! that moves simply misses and the stale entry ages out. Eviction is by
//! insertion order, not recency.

use crate::config::LayoutConfig;
use crate::layout::{ConnectionPath, Point, compute_connection_path};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
pub struct PathCache {
    capacity: usize,
    entries: HashMap<String, ConnectionPath>,
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

impl PathCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn key(from_id: &str, to_id: &str, from: Point, to: Point) -> String {
        format!(
            "{from_id}|{to_id}|{}|{}|{}|{}",
            from.x, from.y, to.x, to.y
        )
    }

    /// Returns the cached path between two node centers, computing and
    /// inserting it on a miss.
    pub fn get_or_compute(
        &mut self,
        from_id: &str,
        to_id: &str,
        from: Point,
        to: Point,
        config: &LayoutConfig,
    ) -> ConnectionPath {
        let key = Self::key(from_id, to_id, from, to);
        if let Some(path) = self.entries.get(&key) {
            self.hits += 1;
            return path.clone();
        }
        self.misses += 1;
        let path = compute_connection_path(from, to, config);
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                log::trace!(evicted = oldest.as_str(); "path cache full");
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, path.clone());
        path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn hit_returns_same_geometry() {
        let config = LayoutConfig::default();
        let mut cache = PathCache::new(4);
        let first = cache.get_or_compute("a", "b", p(100.0, 120.0), p(500.0, 270.0), &config);
        let second = cache.get_or_compute("a", "b", p(100.0, 120.0), p(500.0, 270.0), &config);
        assert_eq!(first, second);
        assert_eq!(first, compute_connection_path(p(100.0, 120.0), p(500.0, 270.0), &config));
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn moved_endpoint_misses() {
        let config = LayoutConfig::default();
        let mut cache = PathCache::new(4);
        cache.get_or_compute("a", "b", p(100.0, 120.0), p(500.0, 120.0), &config);
        cache.get_or_compute("a", "b", p(110.0, 120.0), p(500.0, 120.0), &config);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn evicts_oldest_insert_first() {
        let config = LayoutConfig::default();
        let mut cache = PathCache::new(2);
        cache.get_or_compute("a", "b", p(0.0, 0.0), p(300.0, 0.0), &config);
        cache.get_or_compute("b", "c", p(0.0, 0.0), p(300.0, 0.0), &config);
        // A hit does not refresh position in the eviction order.
        cache.get_or_compute("a", "b", p(0.0, 0.0), p(300.0, 0.0), &config);
        cache.get_or_compute("c", "d", p(0.0, 0.0), p(300.0, 0.0), &config);
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&PathCache::key("a", "b", p(0.0, 0.0), p(300.0, 0.0))));
        assert!(cache.contains(&PathCache::key("b", "c", p(0.0, 0.0), p(300.0, 0.0))));
    }

    #[test]
    fn key_format() {
        assert_eq!(
            PathCache::key("n1", "n2", p(150.0, 120.0), p(52.5, 270.0)),
            "n1|n2|150|120|52.5|270"
        );
    }
}
