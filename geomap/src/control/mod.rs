//! Pointer input of the editor.
//!
//! The map widget reports raw pointer events as [`PointerEvent`]s already converted into geographic
//! coordinates. The active layer turns them into edits; the returned [`EventPropagation`] tells the
//! widget whether it should still process the event itself (for example, to pan the map).

use geomap_types::LatLng;
use serde::{Deserialize, Serialize};

mod drag;

pub use drag::{DragStep, DragTracker};

/// Input device that produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerKind {
    /// Mouse or touchpad.
    Mouse,
    /// Single finger touch.
    Touch,
    /// Gesture with two or more fingers. Always left to the map widget.
    MultiTouch,
    /// Pencil or stylus.
    Pencil,
}

/// Stage of a pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerPhase {
    /// Button pressed or touch started.
    Down,
    /// Pointer moved, pressed or not.
    Move,
    /// Button released or touch ended.
    Up,
}

/// Raw pointer event reported by the map widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Stage of the gesture.
    pub phase: PointerPhase,
    /// Input device.
    pub kind: PointerKind,
    /// Geographic position of the pointer.
    pub position: LatLng,
    /// Whether a modifier that extends the selection (e.g. shift) is held.
    pub additive: bool,
}

impl PointerEvent {
    /// Creates a new event without modifiers.
    pub fn new(phase: PointerPhase, kind: PointerKind, position: LatLng) -> Self {
        Self {
            phase,
            kind,
            position,
            additive: false,
        }
    }

    /// Mouse button press.
    pub fn down(position: LatLng) -> Self {
        Self::new(PointerPhase::Down, PointerKind::Mouse, position)
    }

    /// Mouse move.
    pub fn moved(position: LatLng) -> Self {
        Self::new(PointerPhase::Move, PointerKind::Mouse, position)
    }

    /// Mouse button release.
    pub fn up(position: LatLng) -> Self {
        Self::new(PointerPhase::Up, PointerKind::Mouse, position)
    }

    /// Same event with a different device.
    pub fn with_kind(self, kind: PointerKind) -> Self {
        Self { kind, ..self }
    }

    /// Same event with the selection extending modifier.
    pub fn with_additive(self, additive: bool) -> Self {
        Self { additive, ..self }
    }
}

/// Value returned by the editor to indicate the status of the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPropagation {
    /// The editor did not use the event, the map widget should handle it.
    Propagate,
    /// The editor handled the event, the map widget should not process it.
    Stop,
    /// The editor handled the event and owns the current gesture: all following events of the
    /// gesture should be given to the editor, and the map must not pan.
    Consume,
}
