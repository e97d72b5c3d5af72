//! Grid clustering: items falling into the same screen cell form one cluster.

use std::collections::BTreeMap;

use foundation::LatLng;
use foundation::math::{Projection, SphericalMercator};
use layers::clusters::{Cluster, ClusterAlgorithm, ClusterItem, ClusterSet};

pub struct GridAlgorithm<T> {
    items: Vec<T>,
    cell_px: u32,
}

impl<T: ClusterItem> GridAlgorithm<T> {
    pub fn new(items: Vec<T>, cell_px: u32) -> Self {
        Self {
            items,
            cell_px: cell_px.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T: ClusterItem> ClusterAlgorithm<T> for GridAlgorithm<T> {
    fn clusters(&self, zoom: f64) -> ClusterSet<T> {
        let projection = SphericalMercator::for_zoom(zoom.floor());
        let cell = f64::from(self.cell_px);
        let mut cells: BTreeMap<(i64, i64), Vec<T>> = BTreeMap::new();
        for item in &self.items {
            let p = projection.to_point(item.position());
            let key = ((p.x / cell).floor() as i64, (p.y / cell).floor() as i64);
            cells.entry(key).or_default().push(item.clone());
        }

        cells
            .into_values()
            .map(|items| {
                let n = items.len() as f64;
                let (lat, lng) = items.iter().fold((0.0, 0.0), |(lat, lng), item| {
                    (lat + item.position().lat, lng + item.position().lng)
                });
                Cluster::new(LatLng::new(lat / n, lng / n), items)
            })
            .collect()
    }

    fn max_distance_between_clustered_items(&self) -> u32 {
        self.cell_px
    }
}
