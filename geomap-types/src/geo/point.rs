use approx::{AbsDiffEq, RelativeEq};
use num_traits::{Float, NumCast, One, Zero};
use serde::{Deserialize, Serialize};

use crate::geo::Datum;

/// Point on the surface of the earth.
pub trait GeoPoint {
    /// Numeric type used to represent coordinates.
    type Num: Float;

    /// Latitude in degrees.
    fn lat(&self) -> Self::Num;
    /// Longitude in degrees.
    fn lon(&self) -> Self::Num;

    /// Latitude in radians.
    fn lat_rad(&self) -> Self::Num {
        self.lat().to_radians()
    }

    /// Longitude in radians.
    fn lon_rad(&self) -> Self::Num {
        self.lon().to_radians()
    }

    /// Great circle (haversine) distance to `other` in meters, using the mean radius of `datum`.
    fn distance(&self, other: &impl GeoPoint<Num = Self::Num>, datum: &Datum) -> Self::Num {
        let one = <Self::Num as One>::one();
        let two = one + one;
        let d_lat = other.lat_rad() - self.lat_rad();
        let d_lon = other.lon_rad() - self.lon_rad();

        let a = (d_lat / two).sin().powi(2)
            + self.lat_rad().cos() * other.lat_rad().cos() * (d_lon / two).sin().powi(2);
        let c = two * a.sqrt().atan2((one - a).max(<Self::Num as Zero>::zero()).sqrt());

        let radius = <Self::Num as NumCast>::from(datum.mean_radius()).unwrap_or_else(Self::Num::nan);
        radius * c
    }
}

/// Constructor for geo points.
pub trait NewGeoPoint<N = f64>: GeoPoint<Num = N> + Sized {
    /// Creates a point from latitude and longitude.
    fn latlon(lat: N, lon: N) -> Self;

    /// Creates a point from longitude and latitude (GeoJSON order).
    fn lonlat(lon: N, lat: N) -> Self {
        Self::latlon(lat, lon)
    }
}

/// Position in WGS84 degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct LatLng {
    lat: f64,
    lng: f64,
}

impl GeoPoint for LatLng {
    type Num = f64;

    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lng
    }
}

impl NewGeoPoint<f64> for LatLng {
    fn latlon(lat: f64, lon: f64) -> Self {
        Self { lat, lng: lon }
    }
}

impl LatLng {
    /// Creates a new point.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Copies coordinates of any other geo point.
    pub fn from_point(other: &impl GeoPoint<Num = f64>) -> Self {
        Self::new(other.lat(), other.lon())
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Distance to the other point in meters on the WGS84 sphere.
    pub fn distance_to(&self, other: &LatLng) -> f64 {
        GeoPoint::distance(self, other, &Datum::WGS84)
    }

    /// Point shifted by the given number of degrees.
    pub fn offset(&self, d_lat: f64, d_lng: f64) -> Self {
        Self::new(self.lat + d_lat, self.lng + d_lng)
    }

    /// Difference `self - other` in degrees as `(d_lat, d_lng)`.
    pub fn delta_from(&self, other: &LatLng) -> (f64, f64) {
        (self.lat - other.lat, self.lng - other.lng)
    }

    /// Midpoint of the great circle arc between the two points.
    pub fn midpoint(&self, other: &LatLng) -> Self {
        let lat1 = self.lat_rad();
        let lat2 = other.lat_rad();
        let lon1 = self.lon_rad();
        let d_lon = other.lon_rad() - lon1;

        let bx = lat2.cos() * d_lon.cos();
        let by = lat2.cos() * d_lon.sin();
        let lat = (lat1.sin() + lat2.sin()).atan2(((lat1.cos() + bx).powi(2) + by * by).sqrt());
        let lon = lon1 + by.atan2(lat1.cos() + bx);

        Self::new(lat.to_degrees(), lon.to_degrees())
    }

    /// Returns true if both coordinates are finite and inside the valid WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl AbsDiffEq for LatLng {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.lat.abs_diff_eq(&other.lat, epsilon) && self.lng.abs_diff_eq(&other.lng, epsilon)
    }
}

impl RelativeEq for LatLng {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        self.lat.relative_eq(&other.lat, epsilon, max_relative)
            && self.lng.relative_eq(&other.lng, epsilon, max_relative)
    }
}

/// Creates a new [`LatLng`] from latitude and longitude values (in degrees).
///
/// ```
/// use geomap_types::latlng;
///
/// let point = latlng!(37.5, 127.0);
/// assert_eq!(point.lat(), 37.5);
/// ```
#[macro_export]
macro_rules! latlng {
    ($lat:expr, $lng:expr) => {
        $crate::geo::LatLng::new($lat, $lng)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn distance_along_meridian() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(1.0, 0.0);
        // one degree of arc on the mean sphere
        assert_abs_diff_eq!(a.distance_to(&b), 111_195.08, epsilon = 0.1);
        assert_abs_diff_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = LatLng::new(37.0, 127.0);
        let b = LatLng::new(37.001, 127.001);
        assert_abs_diff_eq!(a.distance_to(&b), b.distance_to(&a), epsilon = 1e-9);
        assert!(a.distance_to(&b) > 100.0);
        assert!(a.distance_to(&b) < 200.0);
    }

    #[test]
    fn midpoint_on_equator() {
        let a = LatLng::new(0.0, 10.0);
        let b = LatLng::new(0.0, 20.0);
        assert_abs_diff_eq!(a.midpoint(&b), LatLng::new(0.0, 15.0), epsilon = 1e-9);
    }

    #[test]
    fn lonlat_order() {
        let p = LatLng::lonlat(127.0, 37.0);
        assert_eq!(p.lat(), 37.0);
        assert_eq!(p.lng(), 127.0);
    }

    #[test]
    fn validity() {
        assert!(latlng_valid(10.0, 20.0));
        assert!(!latlng_valid(91.0, 20.0));
        assert!(!latlng_valid(f64::NAN, 20.0));
    }

    fn latlng_valid(lat: f64, lng: f64) -> bool {
        LatLng::new(lat, lng).is_valid()
    }
}
