use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use foundation::{LatLng, MarkerId};

use crate::clusters::item::Cluster;

/// Bidirectional lookup between a rendered entity and its marker.
///
/// Holds no ownership of markers; the foreground registry does. Every `put`
/// evicts stale pairs on both sides, so a key and a marker are never listed
/// twice.
#[derive(Debug, Clone)]
pub struct MarkerCache<K> {
    by_key: HashMap<K, MarkerId>,
    by_marker: HashMap<MarkerId, K>,
}

impl<K> Default for MarkerCache<K> {
    fn default() -> Self {
        Self {
            by_key: HashMap::new(),
            by_marker: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> MarkerCache<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<MarkerId>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.by_key.get(key).copied()
    }

    pub fn key_for(&self, marker: MarkerId) -> Option<&K> {
        self.by_marker.get(&marker)
    }

    pub fn put(&mut self, key: K, marker: MarkerId) {
        if let Some(previous) = self.by_key.insert(key.clone(), marker)
            && previous != marker
        {
            self.by_marker.remove(&previous);
        }
        if let Some(previous_key) = self.by_marker.insert(marker, key)
            && self.by_key.get(&previous_key) == Some(&marker)
            && self.by_marker.get(&marker) != Some(&previous_key)
        {
            self.by_key.remove(&previous_key);
        }
    }

    /// Drops whatever `marker` is cached under.
    ///
    /// A key that has since been re-pointed at another marker is left alone.
    pub fn remove(&mut self, marker: MarkerId) -> Option<K> {
        let key = self.by_marker.remove(&marker)?;
        if self.by_key.get(&key) == Some(&marker) {
            self.by_key.remove(&key);
        }
        Some(key)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// The item and cluster caches of one renderer.
#[derive(Debug)]
pub struct MarkerCaches<T> {
    pub items: MarkerCache<T>,
    pub clusters: MarkerCache<Arc<Cluster<T>>>,
}

impl<T> Default for MarkerCaches<T> {
    fn default() -> Self {
        Self {
            items: MarkerCache::default(),
            clusters: MarkerCache::default(),
        }
    }
}

impl<T: Eq + Hash + Clone> MarkerCaches<T> {
    pub fn purge(&mut self, marker: MarkerId) {
        self.items.remove(marker);
        self.clusters.remove(marker);
    }
}

/// A displayed marker paired with the position a render pass placed it at.
///
/// Identity is the marker alone, so set operations across passes match
/// markers regardless of where they moved.
#[derive(Debug, Copy, Clone)]
pub struct MarkerWithPosition {
    pub marker: MarkerId,
    pub position: LatLng,
}

impl MarkerWithPosition {
    pub fn new(marker: MarkerId, position: LatLng) -> Self {
        Self { marker, position }
    }
}

impl PartialEq for MarkerWithPosition {
    fn eq(&self, other: &Self) -> bool {
        self.marker == other.marker
    }
}

impl Eq for MarkerWithPosition {}

impl Hash for MarkerWithPosition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.marker.hash(state);
    }
}
