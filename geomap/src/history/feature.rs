use geomap_types::LatLng;

use crate::feature::GraphChange;
use crate::history::{Command, CommandContext};

/// Structural edit described by the state of the touched features before and after it.
///
/// Used for creation, deletion, division, insertion of nodes and imports. Features recorded as
/// absent on one side are deleted when that side is restored, and recreated with their original ids
/// when the other side is restored.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCommand {
    label: &'static str,
    change: GraphChange,
}

impl FeatureCommand {
    /// Creates a command. The label is only used for logging.
    pub fn new(label: &'static str, change: GraphChange) -> Self {
        Self { label, change }
    }

    /// Name of the edit.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Recorded change.
    pub fn change(&self) -> &GraphChange {
        &self.change
    }
}

impl Command for FeatureCommand {
    fn execute(&mut self, context: &mut CommandContext<'_>) {
        context.features.restore(&self.change.after);
    }

    fn undo(&mut self, context: &mut CommandContext<'_>) {
        context.features.restore(&self.change.before);
    }

    fn current_center(&self) -> Option<LatLng> {
        self.change.center()
    }
}
