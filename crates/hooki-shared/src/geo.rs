//! Great-circle distance and radius filtering for located posts and users.
//!
//! Filtering is a linear scan over an item list. Callers only see
//! item-list-in / item-list-out, so a spatial index can replace the scan
//! without touching them.

use serde::{Deserialize, Serialize};

use crate::error::HookiError;

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Build a point, rejecting non-finite or out-of-range coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, HookiError> {
        GeoPoint {
            latitude,
            longitude,
        }
        .validated()
    }

    /// Check a point received from a client.
    pub fn validated(self) -> Result<Self, HookiError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(HookiError::validation(format!(
                "latitude out of range: {}",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(HookiError::validation(format!(
                "longitude out of range: {}",
                self.longitude
            )));
        }
        Ok(self)
    }
}

/// Anything that may carry a location.
pub trait Located {
    fn location(&self) -> Option<GeoPoint>;
}

impl<T: Located + ?Sized> Located for &T {
    fn location(&self) -> Option<GeoPoint> {
        (**self).location()
    }
}

impl Located for GeoPoint {
    fn location(&self) -> Option<GeoPoint> {
        Some(*self)
    }
}

/// Great-circle distance in meters between two coordinates (spherical law
/// of haversines, R = 6 371 000 m).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin() * (delta_phi / 2.0).sin()
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin() * (delta_lambda / 2.0).sin();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Keep the items whose location lies within `radius_m` meters (inclusive)
/// of the origin. Items without a location are dropped, as are items whose
/// distance cannot be computed (NaN coordinates).
pub fn filter_within_radius<T, I>(items: I, origin_lat: f64, origin_lon: f64, radius_m: f64) -> Vec<T>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    items
        .into_iter()
        .filter(|item| match item.location() {
            Some(point) => {
                haversine_distance(origin_lat, origin_lon, point.latitude, point.longitude)
                    <= radius_m
            }
            None => false,
        })
        .collect()
}
