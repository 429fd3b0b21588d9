use geomap_types::LatLng;

use crate::history::{Command, CommandContext};
use crate::id::MarkerId;

/// Marker moved by the user while fixing its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveMarkerCommand {
    marker: MarkerId,
    from: LatLng,
    to: LatLng,
}

impl MoveMarkerCommand {
    /// Creates a new command.
    pub fn new(marker: MarkerId, from: LatLng, to: LatLng) -> Self {
        Self { marker, from, to }
    }
}

impl Command for MoveMarkerCommand {
    fn execute(&mut self, context: &mut CommandContext<'_>) {
        if !context.markers.set_marker_position(self.marker, self.to) {
            log::debug!("Skipping move of missing {}", self.marker);
        }
    }

    fn undo(&mut self, context: &mut CommandContext<'_>) {
        if !context.markers.set_marker_position(self.marker, self.from) {
            log::debug!("Skipping move of missing {}", self.marker);
        }
    }

    fn current_center(&self) -> Option<LatLng> {
        Some(self.to)
    }
}
