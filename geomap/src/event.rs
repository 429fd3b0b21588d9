//! Keyed publish/subscribe used by every manager of the editor.
//!
//! Listeners are registered for an event *kind* and are called in registration order every time an
//! event of that kind is emitted. Registration returns a [`ListenerHandle`] that is later used to
//! unsubscribe.
//!
//! Callbacks receive the event and a shared reference to a context value chosen by the emitter. The
//! feature graph, for example, passes itself, so listeners can inspect the graph state right after
//! a mutation but cannot mutate it from inside the callback.

use std::fmt::Debug;
use std::hash::Hash;

use ahash::AHashMap;

/// Event that can be dispatched through an [`EventListenerManager`].
pub trait Event {
    /// Kind of the event that listeners subscribe to.
    type Kind: Copy + Eq + Hash + Debug;

    /// Kind of this event.
    fn kind(&self) -> Self::Kind;
}

/// Token returned by [`EventListenerManager::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle<K> {
    kind: K,
    id: u64,
}

impl<K: Copy> ListenerHandle<K> {
    /// Event kind the listener is registered for.
    pub fn kind(&self) -> K {
        self.kind
    }
}

type Callback<E, C> = Box<dyn FnMut(&E, &C)>;

/// Set of listeners keyed by event kind.
pub struct EventListenerManager<E: Event, C: ?Sized = ()> {
    listeners: AHashMap<E::Kind, Vec<(u64, Callback<E, C>)>>,
    next_id: u64,
}

impl<E: Event, C: ?Sized> Default for EventListenerManager<E, C> {
    fn default() -> Self {
        Self {
            listeners: AHashMap::new(),
            next_id: 0,
        }
    }
}

impl<E: Event, C: ?Sized> std::fmt::Debug for EventListenerManager<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListenerManager")
            .field("kinds", &self.listeners.keys().collect::<Vec<_>>())
            .field("count", &self.len())
            .finish()
    }
}

impl<E: Event, C: ?Sized> EventListenerManager<E, C> {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for the events of the given kind.
    pub fn add_listener(
        &mut self,
        kind: E::Kind,
        callback: impl FnMut(&E, &C) + 'static,
    ) -> ListenerHandle<E::Kind> {
        self.next_id += 1;
        let id = self.next_id;
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Box::new(callback)));

        ListenerHandle { kind, id }
    }

    /// Removes the listener. Returns false if it was already removed.
    pub fn remove_listener(&mut self, handle: &ListenerHandle<E::Kind>) -> bool {
        let Some(listeners) = self.listeners.get_mut(&handle.kind) else {
            return false;
        };

        let len = listeners.len();
        listeners.retain(|(id, _)| *id != handle.id);
        let removed = listeners.len() != len;
        if listeners.is_empty() {
            self.listeners.remove(&handle.kind);
        }

        removed
    }

    /// Removes every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Returns true if at least one listener is registered for the kind.
    pub fn has_listeners(&self, kind: E::Kind) -> bool {
        self.listeners.contains_key(&kind)
    }

    /// Total number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    /// Returns true if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Calls every listener registered for the kind of the event, in registration order.
    pub fn invoke(&mut self, event: &E, context: &C) {
        if let Some(listeners) = self.listeners.get_mut(&event.kind()) {
            for (_, callback) in listeners.iter_mut() {
                callback(event, context);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug)]
    enum TestEvent {
        Ping(u32),
        Pong,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestKind {
        Ping,
        Pong,
    }

    impl Event for TestEvent {
        type Kind = TestKind;

        fn kind(&self) -> TestKind {
            match self {
                TestEvent::Ping(_) => TestKind::Ping,
                TestEvent::Pong => TestKind::Pong,
            }
        }
    }

    #[test]
    fn listeners_called_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut manager = EventListenerManager::<TestEvent>::new();

        for name in ["first", "second", "third"] {
            let log = log.clone();
            manager.add_listener(TestKind::Ping, move |event, _| {
                if let TestEvent::Ping(v) = event {
                    log.borrow_mut().push(format!("{name}:{v}"));
                }
            });
        }

        manager.invoke(&TestEvent::Ping(1), &());
        assert_eq!(*log.borrow(), vec!["first:1", "second:1", "third:1"]);
    }

    #[test]
    fn only_matching_kind_is_invoked() {
        let count = Rc::new(RefCell::new(0));
        let mut manager = EventListenerManager::<TestEvent>::new();
        let c = count.clone();
        manager.add_listener(TestKind::Pong, move |_, _| *c.borrow_mut() += 1);

        manager.invoke(&TestEvent::Ping(3), &());
        assert_eq!(*count.borrow(), 0);
        manager.invoke(&TestEvent::Pong, &());
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn remove_listener_by_handle() {
        let count = Rc::new(RefCell::new(0));
        let mut manager = EventListenerManager::<TestEvent>::new();
        let c = count.clone();
        let handle = manager.add_listener(TestKind::Pong, move |_, _| *c.borrow_mut() += 1);

        assert!(manager.has_listeners(TestKind::Pong));
        assert!(manager.remove_listener(&handle));
        assert!(!manager.remove_listener(&handle));
        assert!(!manager.has_listeners(TestKind::Pong));

        manager.invoke(&TestEvent::Pong, &());
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn context_is_passed_to_listeners() {
        let seen = Rc::new(RefCell::new(String::new()));
        let mut manager = EventListenerManager::<TestEvent, str>::new();
        let s = seen.clone();
        manager.add_listener(TestKind::Pong, move |_, ctx: &str| s.borrow_mut().push_str(ctx));

        manager.invoke(&TestEvent::Pong, "graph");
        assert_eq!(*seen.borrow(), "graph");
    }
}
