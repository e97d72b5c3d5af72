//! Test doubles shared by the cluster layer tests.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use foundation::{LatLng, LatLngBounds, MarkerId};
use parking_lot::Mutex;

use crate::clusters::item::ClusterItem;
use crate::clusters::map::{MapError, MapView, MarkerOptions};

/// Point of interest identified by `id` alone.
#[derive(Debug, Clone)]
pub struct Poi {
    pub id: u32,
    pub position: LatLng,
    pub title: Option<String>,
    pub snippet: Option<String>,
}

impl Poi {
    pub fn new(id: u32, lat: f64, lng: f64) -> Self {
        Self {
            id,
            position: LatLng::new(lat, lng),
            title: None,
            snippet: None,
        }
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }
}

impl PartialEq for Poi {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Poi {}

impl Hash for Poi {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl ClusterItem for Poi {
    fn position(&self) -> LatLng {
        self.position
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn snippet(&self) -> Option<&str> {
        self.snippet.as_deref()
    }
}

#[derive(Debug, Default)]
pub struct MapLog {
    pub zoom: f64,
    pub bounds: Option<LatLngBounds>,
    pub next_id: u64,
    pub live: BTreeMap<MarkerId, MarkerOptions>,
    pub added: Vec<MarkerId>,
    pub removed: Vec<MarkerId>,
    pub moves: Vec<(MarkerId, LatLng)>,
    pub text_updates: usize,
}

/// Map widget that records every call; clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingMap {
    pub log: Arc<Mutex<MapLog>>,
}

impl RecordingMap {
    pub fn with_camera(zoom: f64, bounds: LatLngBounds) -> Self {
        let map = Self::default();
        map.set_camera(zoom, Some(bounds));
        map
    }

    pub fn set_camera(&self, zoom: f64, bounds: Option<LatLngBounds>) {
        let mut log = self.log.lock();
        log.zoom = zoom;
        log.bounds = bounds;
    }

    pub fn live_count(&self) -> usize {
        self.log.lock().live.len()
    }
}

impl MapView for RecordingMap {
    fn zoom(&self) -> f64 {
        self.log.lock().zoom
    }

    fn visible_bounds(&self) -> Result<LatLngBounds, MapError> {
        self.log
            .lock()
            .bounds
            .ok_or_else(|| MapError::BoundsUnavailable("map not laid out".to_string()))
    }

    fn add_marker(&mut self, options: &MarkerOptions) -> MarkerId {
        let mut log = self.log.lock();
        log.next_id += 1;
        let id = MarkerId::new(log.next_id);
        log.live.insert(id, options.clone());
        log.added.push(id);
        id
    }

    fn remove_marker(&mut self, marker: MarkerId) {
        let mut log = self.log.lock();
        log.live.remove(&marker);
        log.removed.push(marker);
    }

    fn set_position(&mut self, marker: MarkerId, position: LatLng) {
        let mut log = self.log.lock();
        if let Some(options) = log.live.get_mut(&marker) {
            options.position = position;
        }
        log.moves.push((marker, position));
    }

    fn set_text(&mut self, marker: MarkerId, title: Option<&str>, snippet: Option<&str>) {
        let mut log = self.log.lock();
        if let Some(options) = log.live.get_mut(&marker) {
            options.title = title.map(str::to_string);
            options.snippet = snippet.map(str::to_string);
        }
        log.text_updates += 1;
    }
}

pub fn world_bounds() -> LatLngBounds {
    LatLngBounds::new(LatLng::new(-85.0, -180.0), LatLng::new(85.0, 180.0))
}

pub fn assert_close(a: f64, b: f64, eps: f64) {
    let diff = (a - b).abs();
    assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
}
