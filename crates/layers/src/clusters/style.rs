//! Host hooks for how markers look and for observing what was rendered.

use foundation::MarkerId;

use crate::clusters::config::RendererConfig;
use crate::clusters::icons::{bucket, cluster_color, cluster_text};
use crate::clusters::item::{Cluster, ClusterItem};
use crate::clusters::map::MarkerOptions;

/// Styling and render callbacks for a [`ClusterRenderer`](crate::clusters::ClusterRenderer).
///
/// Every method has a default, so a host overrides only what it needs.
/// `render_as_cluster` is asked on the background looper; everything else
/// runs on the foreground looper.
pub trait ClusterStyle<T: ClusterItem>: Send + Sync + 'static {
    /// Display bucket a cluster of `size` items is drawn with.
    fn bucket(&self, size: usize) -> usize {
        bucket(size)
    }

    fn cluster_text(&self, bucket: usize) -> String {
        cluster_text(bucket)
    }

    fn cluster_color(&self, bucket: usize) -> [u8; 3] {
        cluster_color(bucket)
    }

    /// Whether `cluster` gets one cluster marker rather than one per item.
    fn render_as_cluster(&self, cluster: &Cluster<T>, config: &RendererConfig) -> bool {
        config.renders_as_cluster(cluster)
    }

    /// Last chance to adjust an item marker before it is added or updated.
    fn before_item_rendered(&self, _item: &T, _options: &mut MarkerOptions) {}

    /// Last chance to adjust a cluster marker before it is added.
    fn before_cluster_rendered(&self, _cluster: &Cluster<T>, _options: &mut MarkerOptions) {}

    /// Called each time a pass shows `item`, whether its marker is new or reused.
    fn item_rendered(&self, _item: &T, _marker: MarkerId) {}

    /// Called each time a pass shows `cluster`, whether its marker is new or reused.
    fn cluster_rendered(&self, _cluster: &Cluster<T>, _marker: MarkerId) {}
}

/// Stock buckets, text and colours with no callbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStyle;

impl<T: ClusterItem> ClusterStyle<T> for DefaultStyle {}

#[cfg(test)]
mod tests {
    use super::{ClusterStyle, DefaultStyle};
    use crate::clusters::config::RendererConfig;
    use crate::clusters::item::Cluster;
    use crate::clusters::testing::Poi;
    use foundation::LatLng;

    struct Pairs;

    impl ClusterStyle<Poi> for Pairs {
        fn render_as_cluster(&self, cluster: &Cluster<Poi>, _config: &RendererConfig) -> bool {
            cluster.size() >= 2
        }
    }

    fn cluster_of(n: u32) -> Cluster<Poi> {
        Cluster::new(
            LatLng::new(0.0, 0.0),
            (0..n).map(|i| Poi::new(i, 0.0, 0.0)).collect(),
        )
    }

    #[test]
    fn default_style_follows_the_config_threshold() {
        let config = RendererConfig::default();
        let style: &dyn ClusterStyle<Poi> = &DefaultStyle;
        assert!(!style.render_as_cluster(&cluster_of(3), &config));
        assert!(style.render_as_cluster(&cluster_of(4), &config));
        assert_eq!(style.bucket(57), 50);
        assert_eq!(style.cluster_text(50), "50+");
    }

    #[test]
    fn overrides_replace_single_decisions() {
        let config = RendererConfig::default();
        assert!(Pairs.render_as_cluster(&cluster_of(2), &config));
        assert_eq!(ClusterStyle::<Poi>::bucket(&Pairs, 57), 50);
    }
}
