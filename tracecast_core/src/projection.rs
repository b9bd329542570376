//! Geographic to local-space projection.
//!
//! The renderer owns the real projection (it knows where its camera and map
//! tiles are). The engine only needs "give me a 3-vector for this lat/lng/alt",
//! with `z` carrying altitude.

use nalgebra::Vector3;

use crate::keyframe::GeoPosition;

/// Equatorial earth radius (WGS84), meters
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Maps geographic positions into the renderer's local frame.
pub trait GeoProjection {
    fn project(&self, position: &GeoPosition) -> Vector3<f64>;
}

impl<F> GeoProjection for F
where
    F: Fn(&GeoPosition) -> Vector3<f64>,
{
    fn project(&self, position: &GeoPosition) -> Vector3<f64> {
        self(position)
    }
}

/// A projection that can be re-anchored for each dataset.
pub trait AnchoredProjection: GeoProjection {
    fn anchored_at(origin: GeoPosition) -> Self;
}

/// Equirectangular approximation around an origin.
///
/// Frame: x east, y north, z up (altitude passes through). Accurate enough for
/// the few kilometers a recorded trace usually spans.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquirectangularProjection {
    origin: GeoPosition,
    cos_origin_lat: f64,
}

impl EquirectangularProjection {
    pub fn new(origin: GeoPosition) -> Self {
        Self {
            origin,
            cos_origin_lat: origin.lat.to_radians().cos(),
        }
    }

    pub fn origin(&self) -> GeoPosition {
        self.origin
    }
}

impl GeoProjection for EquirectangularProjection {
    fn project(&self, position: &GeoPosition) -> Vector3<f64> {
        let lat_diff = (position.lat - self.origin.lat).to_radians();
        let lng_diff = (position.lng - self.origin.lng).to_radians();

        Vector3::new(
            lng_diff * EARTH_RADIUS * self.cos_origin_lat,
            lat_diff * EARTH_RADIUS,
            position.alt,
        )
    }
}

impl AnchoredProjection for EquirectangularProjection {
    fn anchored_at(origin: GeoPosition) -> Self {
        Self::new(origin)
    }
}
