use crate::geo::LatLng;

/// Geographic bounding box, as reported by a map viewport.
///
/// When `southwest.lng > northeast.lng` the box crosses the antimeridian.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LatLngBounds {
    pub southwest: LatLng,
    pub northeast: LatLng,
}

impl LatLngBounds {
    pub fn new(southwest: LatLng, northeast: LatLng) -> Self {
        LatLngBounds {
            southwest,
            northeast,
        }
    }

    /// Zero-area bounds that contain exactly `point`.
    pub fn degenerate(point: LatLng) -> Self {
        Self::new(point, point)
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.southwest.lng > self.northeast.lng
    }

    pub fn contains(&self, point: LatLng) -> bool {
        self.southwest.lat <= point.lat
            && point.lat <= self.northeast.lat
            && self.contains_lng(point.lng)
    }

    fn contains_lng(&self, lng: f64) -> bool {
        if self.crosses_antimeridian() {
            lng >= self.southwest.lng || lng <= self.northeast.lng
        } else {
            self.southwest.lng <= lng && lng <= self.northeast.lng
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LatLngBounds;
    use crate::geo::LatLng;

    #[test]
    fn contains_inclusive_edges() {
        let b = LatLngBounds::new(LatLng::new(-10.0, -20.0), LatLng::new(10.0, 20.0));
        assert!(b.contains(LatLng::new(0.0, 0.0)));
        assert!(b.contains(LatLng::new(10.0, 20.0)));
        assert!(!b.contains(LatLng::new(10.5, 0.0)));
        assert!(!b.contains(LatLng::new(0.0, -21.0)));
    }

    #[test]
    fn contains_across_antimeridian() {
        let b = LatLngBounds::new(LatLng::new(-5.0, 170.0), LatLng::new(5.0, -170.0));
        assert!(b.crosses_antimeridian());
        assert!(b.contains(LatLng::new(0.0, 179.0)));
        assert!(b.contains(LatLng::new(0.0, -175.0)));
        assert!(!b.contains(LatLng::new(0.0, 0.0)));
    }

    #[test]
    fn degenerate_contains_only_its_point() {
        let b = LatLngBounds::degenerate(LatLng::new(0.0, 0.0));
        assert!(b.contains(LatLng::new(0.0, 0.0)));
        assert!(!b.contains(LatLng::new(0.0, 0.001)));
    }
}
