//! Undo and redo of edits.
//!
//! Every edit that the user can take back is described by a [`Command`]. The edit is applied first,
//! then the command describing it is [registered](GeoHistoryManager::register) in the history.
//! Undoing pops the command from the undo stack, reverts it and moves it to the redo stack; redoing
//! does the opposite.

use std::collections::VecDeque;
use std::fmt::Debug;

use geomap_types::LatLng;

use crate::event::{Event, EventListenerManager, ListenerHandle};
use crate::feature::GeoFeatureManager;
use crate::marker::GeoMarkerManager;

mod feature;
mod marker;
mod move_node;

pub use feature::FeatureCommand;
pub use marker::MoveMarkerCommand;
pub use move_node::{MoveNodeCommand, NodeMerge, NodeMove};

/// Default number of commands kept in the undo stack.
pub const DEFAULT_HISTORY_DEPTH: usize = 10;

/// Managers a command operates on.
pub struct CommandContext<'a> {
    /// Node/way graph of the layer.
    pub features: &'a mut GeoFeatureManager,
    /// Markers of the layer.
    pub markers: &'a mut GeoMarkerManager,
}

/// Reversible edit.
///
/// Commands must not fail: if a feature they reference does not exist anymore, that part of the
/// command is skipped. Resources held by a command are released when it is dropped.
pub trait Command: Debug {
    /// Applies the edit again after it was undone.
    fn execute(&mut self, context: &mut CommandContext<'_>);
    /// Reverts the edit.
    fn undo(&mut self, context: &mut CommandContext<'_>);
    /// Place on the map where the edit happened, used to show it to the user after undo or redo.
    fn current_center(&self) -> Option<LatLng>;
}

/// Result of an undo or redo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryStep {
    /// Where the map should be moved to show the reverted edit.
    pub center: Option<LatLng>,
}

/// Change of the history state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEvent {
    /// Undo or redo became available or unavailable.
    AvailabilityChanged {
        /// Whether there is something to undo.
        undo: bool,
        /// Whether there is something to redo.
        redo: bool,
    },
}

/// Kind of [`HistoryEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryEventKind {
    /// [`HistoryEvent::AvailabilityChanged`]
    AvailabilityChanged,
}

impl Event for HistoryEvent {
    type Kind = HistoryEventKind;

    fn kind(&self) -> HistoryEventKind {
        match self {
            HistoryEvent::AvailabilityChanged { .. } => HistoryEventKind::AvailabilityChanged,
        }
    }
}

/// Linear undo/redo history with a limited depth.
pub struct GeoHistoryManager {
    undo: VecDeque<Box<dyn Command>>,
    redo: Vec<Box<dyn Command>>,
    max_depth: usize,
    listeners: EventListenerManager<HistoryEvent>,
    availability: (bool, bool),
}

impl Debug for GeoHistoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoHistoryManager")
            .field("undo", &self.undo)
            .field("redo", &self.redo)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl Default for GeoHistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl GeoHistoryManager {
    /// Creates an empty history keeping at most `max_depth` commands to undo.
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth: max_depth.max(1),
            listeners: EventListenerManager::new(),
            availability: (false, false),
        }
    }

    /// Maximum number of commands that can be undone.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Subscribes to history state changes.
    pub fn add_listener(
        &mut self,
        kind: HistoryEventKind,
        callback: impl FnMut(&HistoryEvent, &()) + 'static,
    ) -> ListenerHandle<HistoryEventKind> {
        self.listeners.add_listener(kind, callback)
    }

    /// Removes a listener added by [`GeoHistoryManager::add_listener`].
    pub fn remove_listener(&mut self, handle: &ListenerHandle<HistoryEventKind>) -> bool {
        self.listeners.remove_listener(handle)
    }

    /// Adds an already applied edit to the history.
    ///
    /// Everything that could be redone is dropped. If the undo stack grows over the maximum depth,
    /// the oldest command is dropped.
    pub fn register(&mut self, command: impl Command + 'static) {
        log::debug!("Registering {command:?}");
        self.redo.clear();
        self.undo.push_back(Box::new(command));
        while self.undo.len() > self.max_depth {
            self.undo.pop_front();
        }

        self.notify();
    }

    /// Reverts the last edit.
    pub fn undo(&mut self, context: &mut CommandContext<'_>) -> Option<HistoryStep> {
        let mut command = self.undo.pop_back()?;
        log::debug!("Undo {command:?}");
        command.undo(context);
        let step = HistoryStep {
            center: command.current_center(),
        };
        self.redo.push(command);

        self.notify();
        Some(step)
    }

    /// Applies the last undone edit again.
    pub fn redo(&mut self, context: &mut CommandContext<'_>) -> Option<HistoryStep> {
        let mut command = self.redo.pop()?;
        log::debug!("Redo {command:?}");
        command.execute(context);
        let step = HistoryStep {
            center: command.current_center(),
        };
        self.undo.push_back(command);

        self.notify();
        Some(step)
    }

    /// Drops every command.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.notify();
    }

    /// Returns true if there is something to undo.
    pub fn is_undo_enable(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Returns true if there is something to redo.
    pub fn is_redo_enable(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of commands that can be undone.
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Number of commands that can be redone.
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    fn notify(&mut self) {
        let availability = (self.is_undo_enable(), self.is_redo_enable());
        if availability == self.availability {
            return;
        }

        self.availability = availability;
        self.listeners.invoke(
            &HistoryEvent::AvailabilityChanged {
                undo: availability.0,
                redo: availability.1,
            },
            &(),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::tests::features;

    #[derive(Debug)]
    struct Counted {
        dropped: Rc<Cell<usize>>,
        log: Rc<RefCell<Vec<String>>>,
        name: usize,
    }

    impl Command for Counted {
        fn execute(&mut self, _: &mut CommandContext<'_>) {
            self.log.borrow_mut().push(format!("do {}", self.name));
        }

        fn undo(&mut self, _: &mut CommandContext<'_>) {
            self.log.borrow_mut().push(format!("undo {}", self.name));
        }

        fn current_center(&self) -> Option<LatLng> {
            None
        }
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            self.dropped.set(self.dropped.get() + 1);
        }
    }

    struct Fixture {
        dropped: Rc<Cell<usize>>,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dropped: Rc::new(Cell::new(0)),
                log: Rc::new(RefCell::new(vec![])),
            }
        }

        fn command(&self, name: usize) -> Counted {
            Counted {
                dropped: self.dropped.clone(),
                log: self.log.clone(),
                name,
            }
        }
    }

    #[test]
    fn oldest_command_is_dropped_beyond_depth() {
        let fixture = Fixture::new();
        let mut history = GeoHistoryManager::default();
        for i in 0..11 {
            history.register(fixture.command(i));
        }

        assert_eq!(history.undo_len(), 10);
        assert_eq!(history.redo_len(), 0);
        assert_eq!(fixture.dropped.get(), 1);
    }

    #[test]
    fn register_clears_redo() {
        let fixture = Fixture::new();
        let (mut features, host) = features();
        let mut markers = GeoMarkerManager::new(features.ids().clone(), host);
        let mut context = CommandContext {
            features: &mut features,
            markers: &mut markers,
        };

        let mut history = GeoHistoryManager::default();
        history.register(fixture.command(1));
        history.register(fixture.command(2));
        assert!(history.undo(&mut context).is_some());
        assert!(history.undo(&mut context).is_some());
        assert!(history.undo(&mut context).is_none());
        assert!(history.redo(&mut context).is_some());
        assert_eq!(*fixture.log.borrow(), vec!["undo 2", "undo 1", "do 1"]);

        history.register(fixture.command(3));
        assert!(!history.is_redo_enable());
        assert_eq!(fixture.dropped.get(), 1);

        history.clear();
        assert_eq!(fixture.dropped.get(), 3);
        assert!(!history.is_undo_enable());
    }

    #[test]
    fn availability_events() {
        let fixture = Fixture::new();
        let (mut features, host) = features();
        let mut markers = GeoMarkerManager::new(features.ids().clone(), host);
        let mut context = CommandContext {
            features: &mut features,
            markers: &mut markers,
        };

        let events = Rc::new(RefCell::new(vec![]));
        let mut history = GeoHistoryManager::default();
        let e = events.clone();
        history.add_listener(HistoryEventKind::AvailabilityChanged, move |event, _| {
            e.borrow_mut().push(*event)
        });

        history.register(fixture.command(1));
        history.register(fixture.command(2));
        history.undo(&mut context);
        history.undo(&mut context);

        assert_eq!(
            *events.borrow(),
            vec![
                HistoryEvent::AvailabilityChanged { undo: true, redo: false },
                HistoryEvent::AvailabilityChanged { undo: true, redo: true },
                HistoryEvent::AvailabilityChanged { undo: false, redo: true },
            ]
        );
    }
}
