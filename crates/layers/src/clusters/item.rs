use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use foundation::LatLng;

/// Screen distance (pixels) an algorithm clusters over unless it says otherwise.
pub const DEFAULT_MAX_DISTANCE_PX: u32 = 100;

/// A single point annotation.
///
/// `Eq` and `Hash` must express identity (a stable id, typically) rather than
/// position: an item that moved between two clusterings is still the same
/// item and keeps its marker.
pub trait ClusterItem: Clone + Eq + Hash + Send + Sync + 'static {
    fn position(&self) -> LatLng;

    fn title(&self) -> Option<&str> {
        None
    }

    fn snippet(&self) -> Option<&str> {
        None
    }
}

/// A group of items shown at one position.
///
/// Two clusters are equal when they sit at the same position and hold the
/// same items in the same order.
#[derive(Debug, Clone)]
pub struct Cluster<T> {
    position: LatLng,
    items: Vec<T>,
}

impl<T> Cluster<T> {
    pub fn new(position: LatLng, items: Vec<T>) -> Self {
        Self { position, items }
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }
}

impl<T: ClusterItem> Cluster<T> {
    /// Single-item cluster placed on the item itself.
    pub fn single(item: T) -> Self {
        Self::new(item.position(), vec![item])
    }
}

impl<T: PartialEq> PartialEq for Cluster<T> {
    fn eq(&self, other: &Self) -> bool {
        self.position.to_bits() == other.position.to_bits() && self.items == other.items
    }
}

impl<T: Eq> Eq for Cluster<T> {}

impl<T: Hash> Hash for Cluster<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.position.to_bits().hash(state);
        self.items.hash(state);
    }
}

/// The output of one clustering run.
///
/// Compared as an unordered set, so a re-run that yields the same clusters in
/// another order is recognised as unchanged. Duplicate clusters are dropped on
/// construction; iteration keeps first-seen order.
#[derive(Debug, Clone)]
pub struct ClusterSet<T> {
    clusters: Vec<Arc<Cluster<T>>>,
}

impl<T: Eq + Hash> ClusterSet<T> {
    pub fn new(clusters: Vec<Cluster<T>>) -> Self {
        clusters.into_iter().collect()
    }
}

impl<T> ClusterSet<T> {
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Cluster<T>>> {
        self.clusters.iter()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Total number of items over all clusters.
    pub fn item_count(&self) -> usize {
        self.clusters.iter().map(|c| c.size()).sum()
    }
}

impl<T> Default for ClusterSet<T> {
    fn default() -> Self {
        Self {
            clusters: Vec::new(),
        }
    }
}

impl<T: Eq + Hash> FromIterator<Cluster<T>> for ClusterSet<T> {
    fn from_iter<I: IntoIterator<Item = Cluster<T>>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        let clusters = iter
            .into_iter()
            .map(Arc::new)
            .filter(|cluster| seen.insert(Arc::clone(cluster)))
            .collect();
        Self { clusters }
    }
}

impl<T: Eq + Hash> PartialEq for ClusterSet<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.clusters.len() != other.clusters.len() {
            return false;
        }
        let theirs: HashSet<&Cluster<T>> = other.clusters.iter().map(|c| c.as_ref()).collect();
        self.clusters.iter().all(|c| theirs.contains(c.as_ref()))
    }
}

impl<T: Eq + Hash> Eq for ClusterSet<T> {}

/// Source of clustering results; the layer itself never clusters.
pub trait ClusterAlgorithm<T: ClusterItem> {
    fn clusters(&self, zoom: f64) -> ClusterSet<T>;

    /// Screen distance within which the algorithm merges items.
    fn max_distance_between_clustered_items(&self) -> u32 {
        DEFAULT_MAX_DISTANCE_PX
    }
}

#[cfg(test)]
mod tests {
    use super::{Cluster, ClusterSet};
    use crate::clusters::testing::Poi;
    use foundation::LatLng;

    #[test]
    fn cluster_equality_uses_position_and_items() {
        let a = Cluster::new(LatLng::new(1.0, 2.0), vec![Poi::new(1, 1.0, 2.0)]);
        let b = Cluster::new(LatLng::new(1.0, 2.0), vec![Poi::new(1, 1.0, 2.0)]);
        let moved = Cluster::new(LatLng::new(1.0, 2.5), vec![Poi::new(1, 1.0, 2.0)]);
        let other = Cluster::new(LatLng::new(1.0, 2.0), vec![Poi::new(2, 1.0, 2.0)]);
        assert_eq!(a, b);
        assert_ne!(a, moved);
        assert_ne!(a, other);
    }

    #[test]
    fn cluster_sets_compare_without_order() {
        let a = Cluster::single(Poi::new(1, 0.0, 0.0));
        let b = Cluster::single(Poi::new(2, 1.0, 1.0));
        let forward = ClusterSet::new(vec![a.clone(), b.clone()]);
        let backward = ClusterSet::new(vec![b.clone(), a.clone()]);
        let partial = ClusterSet::new(vec![a]);
        assert_eq!(forward, backward);
        assert_ne!(forward, partial);
        assert_eq!(forward.item_count(), 2);
    }

    #[test]
    fn duplicate_clusters_collapse() {
        let a = Cluster::single(Poi::new(1, 0.0, 0.0));
        let b = Cluster::single(Poi::new(2, 1.0, 1.0));
        let doubled = ClusterSet::new(vec![a.clone(), a.clone()]);
        let distinct = ClusterSet::new(vec![a.clone(), b]);
        assert_eq!(doubled.len(), 1);
        assert_ne!(doubled, distinct);
        assert_ne!(distinct, doubled);
        assert_eq!(doubled, ClusterSet::new(vec![a]));
    }
}
