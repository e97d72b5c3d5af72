use std::collections::BTreeMap;
use std::sync::Arc;

use foundation::{LatLng, LatLngBounds, MarkerId};
use layers::clusters::{MapError, MapView, MarkerKind, MarkerOptions};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace};

/// Camera the demo moves between steps.
#[derive(Debug, Copy, Clone)]
pub struct Camera {
    pub zoom: f64,
    pub centre: LatLng,
    /// Viewport width in degrees of longitude at zoom 0.
    pub span_deg: f64,
}

impl Camera {
    pub fn bounds(&self) -> LatLngBounds {
        let half = self.span_deg / 2f64.powf(self.zoom) / 2.0;
        LatLngBounds::new(
            LatLng::new((self.centre.lat - half).max(-85.0), self.centre.lng - half),
            LatLng::new((self.centre.lat + half).min(85.0), self.centre.lng + half),
        )
    }
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct MapCalls {
    pub added: u64,
    pub removed: u64,
    pub moved: u64,
    pub retitled: u64,
    pub live_items: usize,
    pub live_clusters: usize,
}

#[derive(Debug, Default)]
struct Shown {
    next_id: u64,
    markers: BTreeMap<MarkerId, MarkerKind>,
    calls: MapCalls,
}

/// Map widget that only logs what it is asked to do.
///
/// Clones share the camera and the marker table, so the driver can move the
/// camera while the renderer owns the widget.
#[derive(Debug, Clone)]
pub struct LogMap {
    camera: Arc<Mutex<Camera>>,
    shown: Arc<Mutex<Shown>>,
}

impl LogMap {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera: Arc::new(Mutex::new(camera)),
            shown: Arc::new(Mutex::new(Shown::default())),
        }
    }

    pub fn move_camera(&self, camera: Camera) {
        *self.camera.lock() = camera;
    }

    pub fn calls(&self) -> MapCalls {
        let shown = self.shown.lock();
        let clusters = shown
            .markers
            .values()
            .filter(|kind| **kind == MarkerKind::Cluster)
            .count();
        MapCalls {
            live_items: shown.markers.len() - clusters,
            live_clusters: clusters,
            ..shown.calls
        }
    }
}

impl MapView for LogMap {
    fn zoom(&self) -> f64 {
        self.camera.lock().zoom
    }

    fn visible_bounds(&self) -> Result<LatLngBounds, MapError> {
        let camera = self.camera.lock();
        if camera.span_deg <= 0.0 {
            return Err(MapError::BoundsUnavailable(
                "viewport has no size".to_string(),
            ));
        }
        Ok(camera.bounds())
    }

    fn add_marker(&mut self, options: &MarkerOptions) -> MarkerId {
        let mut shown = self.shown.lock();
        shown.next_id += 1;
        let marker = MarkerId::new(shown.next_id);
        shown.markers.insert(marker, options.kind);
        shown.calls.added += 1;
        debug!(
            "add {marker} {:?} at {} {}",
            options.kind,
            options.position,
            options
                .icon
                .as_ref()
                .map(|icon| icon.text.as_str())
                .or(options.title.as_deref())
                .unwrap_or("")
        );
        marker
    }

    fn remove_marker(&mut self, marker: MarkerId) {
        let mut shown = self.shown.lock();
        shown.markers.remove(&marker);
        shown.calls.removed += 1;
        debug!("remove {marker}");
    }

    fn set_position(&mut self, marker: MarkerId, position: LatLng) {
        self.shown.lock().calls.moved += 1;
        trace!("move {marker} to {position}");
    }

    fn set_text(&mut self, marker: MarkerId, title: Option<&str>, snippet: Option<&str>) {
        self.shown.lock().calls.retitled += 1;
        debug!("retitle {marker}: {title:?} / {snippet:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::{Camera, LogMap};
    use foundation::LatLng;
    use layers::clusters::MapView;

    #[test]
    fn bounds_shrink_as_zoom_grows() {
        let mut camera = Camera {
            zoom: 0.0,
            centre: LatLng::new(0.0, 0.0),
            span_deg: 360.0,
        };
        let world = camera.bounds();
        assert_eq!(world.southwest.lng, -180.0);
        assert_eq!(world.northeast.lat, 85.0);
        camera.zoom = 2.0;
        let zoomed = camera.bounds();
        assert_eq!(zoomed.northeast.lng, 45.0);
    }

    #[test]
    fn empty_viewport_has_no_bounds() {
        let map = LogMap::new(Camera {
            zoom: 4.0,
            centre: LatLng::new(0.0, 0.0),
            span_deg: 0.0,
        });
        assert!(map.visible_bounds().is_err());
    }
}
