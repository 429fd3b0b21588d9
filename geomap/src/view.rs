//! Viewport of the map widget and conversions between screen pixels and geographic coordinates.

use geomap_types::cartesian::Point2d;
use geomap_types::geo::{Projection, WebMercator};
use geomap_types::{LatLng, LatLngBounds};
use serde::{Deserialize, Serialize};

/// Ground resolution of zoom level 0 at the equator, meters per pixel of a 256px tile pyramid.
const EQUATOR_RESOLUTION: f64 = 156543.03392800014;

/// Base map displayed under the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapType {
    /// Road map.
    #[default]
    Road,
    /// Satellite imagery.
    Satellite,
}

/// Size of the map widget in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenSize {
    width: f64,
    height: f64,
}

impl ScreenSize {
    /// Creates a new size. Negative values are clamped to zero.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Half of the width.
    pub fn half_width(&self) -> f64 {
        self.width / 2.0
    }

    /// Half of the height.
    pub fn half_height(&self) -> f64 {
        self.height / 2.0
    }

    /// Returns true if either dimension is zero.
    pub fn is_zero(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

/// What the map widget currently shows: visible bounds, zoom level, base map type and widget size.
///
/// The host reports a new view every time the user pans or zooms the map. The view is also the
/// projection between screen pixels and geographic coordinates, which the editor needs to convert hit
/// radii given in pixels into meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    bounds: LatLngBounds,
    zoom: f64,
    map_type: MapType,
    size: ScreenSize,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            bounds: LatLngBounds::new(
                LatLng::new(-WebMercator::MAX_LAT, -180.0),
                LatLng::new(WebMercator::MAX_LAT, 180.0),
            ),
            zoom: 0.0,
            map_type: MapType::Road,
            size: ScreenSize::new(256.0, 256.0),
        }
    }
}

impl MapView {
    /// View centered at the point with the given zoom and widget size. Bounds are derived from the
    /// web-mercator projection.
    pub fn new(center: LatLng, zoom: f64, size: ScreenSize) -> Self {
        let projection = WebMercator::default();
        let resolution = EQUATOR_RESOLUTION / 2f64.powf(zoom);
        let bounds = projection
            .project(&center)
            .and_then(|c| {
                let sw = Point2d::new(
                    c.x - size.half_width() * resolution,
                    c.y - size.half_height() * resolution,
                );
                let ne = Point2d::new(
                    c.x + size.half_width() * resolution,
                    c.y + size.half_height() * resolution,
                );
                Some(LatLngBounds::new(
                    projection.unproject(&sw)?,
                    projection.unproject(&ne)?,
                ))
            })
            .unwrap_or_else(|| LatLngBounds::from_point(&center));

        Self {
            bounds,
            zoom,
            map_type: MapType::Road,
            size,
        }
    }

    /// View with explicitly reported bounds, as given by the map widget.
    pub fn from_bounds(bounds: LatLngBounds, zoom: f64, size: ScreenSize) -> Self {
        Self {
            bounds,
            zoom,
            map_type: MapType::Road,
            size,
        }
    }

    /// Visible area.
    pub fn bounds(&self) -> LatLngBounds {
        self.bounds
    }

    /// Zoom level.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Base map type.
    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    /// Size of the widget.
    pub fn size(&self) -> ScreenSize {
        self.size
    }

    /// Copy of the view with a different base map.
    pub fn with_map_type(&self, map_type: MapType) -> Self {
        Self { map_type, ..*self }
    }

    /// Copy of the view with different bounds.
    pub fn with_bounds(&self, bounds: LatLngBounds) -> Self {
        Self { bounds, ..*self }
    }

    /// Copy of the view with a different zoom level. Bounds are kept as is.
    pub fn with_zoom(&self, zoom: f64) -> Self {
        Self { zoom, ..*self }
    }

    /// Center of the visible area.
    pub fn center(&self) -> LatLng {
        self.bounds.center()
    }

    /// Meters per pixel at the given latitude.
    pub fn resolution(&self, lat: f64) -> f64 {
        EQUATOR_RESOLUTION * lat.to_radians().cos() / 2f64.powf(self.zoom)
    }

    /// Converts a distance on the screen into meters on the ground near `at`.
    pub fn px_to_meters(&self, px: f64, at: &LatLng) -> f64 {
        px * self.resolution(at.lat())
    }

    /// Position of the geographic point on the screen.
    pub fn latlng_to_px(&self, point: &LatLng) -> Option<Point2d> {
        let projection = WebMercator::default();
        let origin = projection.project(&LatLng::new(self.bounds.north(), self.bounds.west()))?;
        let projected = projection.project(point)?;
        let resolution = EQUATOR_RESOLUTION / 2f64.powf(self.zoom);

        Some(Point2d::new(
            (projected.x - origin.x) / resolution,
            (origin.y - projected.y) / resolution,
        ))
    }

    /// Geographic point under the given screen position.
    pub fn px_to_latlng(&self, px: Point2d) -> Option<LatLng> {
        let projection = WebMercator::default();
        let origin = projection.project(&LatLng::new(self.bounds.north(), self.bounds.west()))?;
        let resolution = EQUATOR_RESOLUTION / 2f64.powf(self.zoom);

        projection.unproject(&Point2d::new(
            origin.x + px.x * resolution,
            origin.y - px.y * resolution,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn resolution_halves_with_each_zoom_level() {
        let view = MapView::default().with_zoom(10.0);
        let zoomed = view.with_zoom(11.0);
        assert_abs_diff_eq!(view.resolution(0.0), zoomed.resolution(0.0) * 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(view.resolution(60.0), view.resolution(0.0) / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn bounds_are_centered() {
        let center = LatLng::new(37.5, 127.0);
        let view = MapView::new(center, 15.0, ScreenSize::new(800.0, 600.0));
        assert_abs_diff_eq!(view.center().lng(), 127.0, epsilon = 1e-9);
        assert_abs_diff_eq!(view.center().lat(), 37.5, epsilon = 1e-3);
        assert!(view.bounds().contains(&center));
    }

    #[test]
    fn screen_round_trip() {
        let view = MapView::new(LatLng::new(37.5, 127.0), 15.0, ScreenSize::new(800.0, 600.0));

        let top_left = view.latlng_to_px(&LatLng::new(view.bounds().north(), view.bounds().west()));
        let top_left = top_left.expect("projectable");
        assert_abs_diff_eq!(top_left.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(top_left.y, 0.0, epsilon = 1e-6);

        let px = Point2d::new(400.0, 300.0);
        let point = view.px_to_latlng(px).expect("unprojectable");
        let back = view.latlng_to_px(&point).expect("projectable");
        assert_abs_diff_eq!(back.x, 400.0, epsilon = 1e-6);
        assert_abs_diff_eq!(back.y, 300.0, epsilon = 1e-6);

        let bottom_right = view.px_to_latlng(Point2d::new(800.0, 600.0)).expect("unprojectable");
        assert_abs_diff_eq!(bottom_right.lat(), view.bounds().south(), epsilon = 1e-9);
        assert_abs_diff_eq!(bottom_right.lng(), view.bounds().east(), epsilon = 1e-9);
    }
}
