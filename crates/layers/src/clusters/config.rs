use std::time::Duration;

use serde::Deserialize;

use crate::clusters::item::{Cluster, ClusterAlgorithm, ClusterItem, DEFAULT_MAX_DISTANCE_PX};

/// Tuning for a [`ClusterRenderer`](crate::clusters::ClusterRenderer).
///
/// Every field has a default so partial JSON documents deserialize.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Clusters with fewer items render every item as its own marker.
    pub min_cluster_size: usize,
    pub animate: bool,
    /// Screen radius (pixels) for matching markers across zoom levels.
    pub max_match_distance_px: f64,
    /// Marker operations applied per pump of the foreground queue.
    pub batch_size: u32,
    /// Zooming out by this many levels or more removes markers without animating.
    pub max_animated_zoom_out: f64,
    pub pump_fallback_ms: u64,
    pub animation_duration_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 4,
            animate: true,
            max_match_distance_px: f64::from(DEFAULT_MAX_DISTANCE_PX),
            batch_size: 10,
            max_animated_zoom_out: 3.0,
            pump_fallback_ms: 10,
            animation_duration_ms: 300,
        }
    }
}

impl RendererConfig {
    /// Defaults, with the match radius taken from the clustering algorithm.
    pub fn from_algorithm<T: ClusterItem, A: ClusterAlgorithm<T> + ?Sized>(algorithm: &A) -> Self {
        Self {
            max_match_distance_px: f64::from(algorithm.max_distance_between_clustered_items()),
            ..Self::default()
        }
    }

    pub fn pump_fallback(&self) -> Duration {
        Duration::from_millis(self.pump_fallback_ms)
    }

    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_duration_ms)
    }

    pub fn renders_as_cluster<T>(&self, cluster: &Cluster<T>) -> bool {
        cluster.size() >= self.min_cluster_size
    }
}

#[cfg(test)]
mod tests {
    use super::RendererConfig;
    use crate::clusters::item::{Cluster, ClusterAlgorithm, ClusterSet};
    use crate::clusters::testing::Poi;
    use foundation::LatLng;
    use pretty_assertions::assert_eq;

    struct Wide;

    impl ClusterAlgorithm<Poi> for Wide {
        fn clusters(&self, _zoom: f64) -> ClusterSet<Poi> {
            ClusterSet::default()
        }

        fn max_distance_between_clustered_items(&self) -> u32 {
            160
        }
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: RendererConfig =
            serde_json::from_str(r#"{ "min_cluster_size": 2, "animate": false }"#).unwrap();
        assert_eq!(
            config,
            RendererConfig {
                min_cluster_size: 2,
                animate: false,
                ..RendererConfig::default()
            }
        );
    }

    #[test]
    fn match_radius_follows_algorithm() {
        let config = RendererConfig::from_algorithm(&Wide);
        assert_eq!(config.max_match_distance_px, 160.0);
        assert_eq!(config.batch_size, 10);
    }

    #[test]
    fn cluster_threshold_is_inclusive() {
        let config = RendererConfig::default();
        let items = |n: u32| (0..n).map(|i| Poi::new(i, 0.0, 0.0)).collect::<Vec<_>>();
        assert!(!config.renders_as_cluster(&Cluster::new(LatLng::new(0.0, 0.0), items(3))));
        assert!(config.renders_as_cluster(&Cluster::new(LatLng::new(0.0, 0.0), items(4))));
    }
}
