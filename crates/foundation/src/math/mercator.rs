use std::f64::consts::PI;

use super::Vec2;
use crate::geo::LatLng;

/// Edge length of one map tile in pixels at zoom 0.
pub const TILE_SIZE: f64 = 256.0;

/// Converts between geographic positions and flat screen-space points.
pub trait Projection {
    fn to_point(&self, position: LatLng) -> Vec2;
    fn to_lat_lng(&self, point: Vec2) -> LatLng;
}

/// Spherical (web) Mercator over a square world of `world_width` pixels.
///
/// `y` grows southwards; `(0, 0)` maps to the centre of the world.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SphericalMercator {
    world_width: f64,
}

impl SphericalMercator {
    pub fn new(world_width: f64) -> Self {
        Self { world_width }
    }

    /// World of `256 * 2^zoom` pixels.
    pub fn for_zoom(zoom: f64) -> Self {
        Self::new(TILE_SIZE * 2f64.powf(zoom))
    }

    pub fn world_width(&self) -> f64 {
        self.world_width
    }
}

impl Projection for SphericalMercator {
    fn to_point(&self, position: LatLng) -> Vec2 {
        let x = position.lng / 360.0 + 0.5;
        let sin_lat = position.lat.to_radians().sin();
        let y = 0.5 * ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / -(2.0 * PI) + 0.5;
        Vec2::new(x * self.world_width, y * self.world_width)
    }

    fn to_lat_lng(&self, point: Vec2) -> LatLng {
        let x = point.x / self.world_width - 0.5;
        let lng = x * 360.0;
        let y = 0.5 - point.y / self.world_width;
        let lat = 90.0 - ((-y * 2.0 * PI).exp().atan() * 2.0).to_degrees();
        LatLng::new(lat, lng)
    }
}
