use geomap_types::cartesian::Vector2d;
use geomap_types::LatLng;

/// Result of a pointer move during a pressed gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragStep {
    /// The pointer did not leave the click area yet. Only a preview offset is shown.
    Preview,
    /// The pointer left the click area with this move. The gesture is a drag from now on.
    Started,
    /// The gesture was already a drag.
    Dragging,
}

/// Distinguishes clicks from drags.
///
/// A gesture becomes a drag once the pointer moves farther than the threshold from the point where
/// it was pressed. After that it stays a drag until the pointer is released, even if the pointer
/// returns close to the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragTracker {
    origin: LatLng,
    last: LatLng,
    threshold_m: f64,
    dragging: bool,
}

impl DragTracker {
    /// Starts tracking a gesture pressed at `origin`.
    pub fn new(origin: LatLng, threshold_m: f64) -> Self {
        Self {
            origin,
            last: origin,
            threshold_m,
            dragging: false,
        }
    }

    /// Registers a new pointer position.
    pub fn update(&mut self, position: LatLng) -> DragStep {
        self.last = position;
        if self.dragging {
            return DragStep::Dragging;
        }

        if self.origin.distance_to(&position) > self.threshold_m {
            log::trace!("Drag threshold of {:.2}m crossed", self.threshold_m);
            self.dragging = true;
            DragStep::Started
        } else {
            DragStep::Preview
        }
    }

    /// Whether the gesture became a drag.
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Position where the gesture started.
    pub fn origin(&self) -> LatLng {
        self.origin
    }

    /// Last registered position.
    pub fn last(&self) -> LatLng {
        self.last
    }

    /// Offset from the origin to the last position in degrees, `x` being longitude.
    pub fn delta(&self) -> Vector2d {
        let (d_lat, d_lng) = self.last.delta_from(&self.origin);
        Vector2d::new(d_lng, d_lat)
    }

    /// Applies the current offset to a point.
    pub fn shift(&self, point: &LatLng) -> LatLng {
        let delta = self.delta();
        point.offset(delta.y, delta.x)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn small_moves_are_previews() {
        let mut tracker = DragTracker::new(LatLng::new(10.0, 20.0), 5.0);
        assert_eq!(tracker.update(LatLng::new(10.00001, 20.0)), DragStep::Preview);
        assert!(!tracker.is_dragging());
    }

    #[test]
    fn crossing_threshold_starts_drag_once() {
        let mut tracker = DragTracker::new(LatLng::new(10.0, 20.0), 5.0);
        assert_eq!(tracker.update(LatLng::new(10.001, 20.0)), DragStep::Started);
        assert_eq!(tracker.update(LatLng::new(10.0, 20.0)), DragStep::Dragging);
        assert!(tracker.is_dragging());
    }

    #[test]
    fn shift_applies_delta() {
        let mut tracker = DragTracker::new(LatLng::new(10.0, 20.0), 5.0);
        tracker.update(LatLng::new(10.5, 20.5));
        let shifted = tracker.shift(&LatLng::new(1.0, 2.0));
        assert_abs_diff_eq!(shifted.lat(), 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(shifted.lng(), 2.5, epsilon = 1e-12);
    }
}
