use std::mem;

use crate::host::{MapHost, Primitive, PrimitiveHandle};

/// Rendering lifecycle of a feature.
///
/// A hidden feature keeps its primitive in the `Pending` state: every change to its look is
/// accumulated in the primitive without touching the host. When the feature becomes visible the
/// primitive is created in the host with all the accumulated changes at once. Hiding it removes the
/// primitive from the host and keeps the latest state as pending again.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderState<P: Primitive> {
    /// Not displayed.
    Pending(P),
    /// Displayed by the host.
    Materialized {
        /// Handle given by the host.
        handle: PrimitiveHandle,
        /// Last state pushed to the host.
        primitive: P,
    },
}

impl<P: Primitive> Default for RenderState<P> {
    fn default() -> Self {
        Self::Pending(P::default())
    }
}

impl<P: Primitive> RenderState<P> {
    /// Creates a pending state with the given primitive.
    pub fn new(primitive: P) -> Self {
        Self::Pending(primitive)
    }

    /// Current state of the primitive.
    pub fn primitive(&self) -> &P {
        match self {
            Self::Pending(primitive) => primitive,
            Self::Materialized { primitive, .. } => primitive,
        }
    }

    /// Host handle of the displayed primitive.
    pub fn handle(&self) -> Option<PrimitiveHandle> {
        match self {
            Self::Pending(_) => None,
            Self::Materialized { handle, .. } => Some(*handle),
        }
    }

    /// Whether the primitive is displayed.
    pub fn is_materialized(&self) -> bool {
        matches!(self, Self::Materialized { .. })
    }

    /// Modifies the primitive. A displayed primitive is pushed to the host if it actually changed.
    pub fn update(&mut self, host: &mut dyn MapHost, f: impl FnOnce(&mut P)) {
        match self {
            Self::Pending(primitive) => f(primitive),
            Self::Materialized { handle, primitive } => {
                let previous = primitive.clone();
                f(primitive);
                if *primitive != previous {
                    primitive.update(*handle, host);
                }
            }
        }
    }

    /// Displays the primitive. Does nothing if it is already displayed.
    pub fn materialize(&mut self, host: &mut dyn MapHost) {
        if let Self::Pending(primitive) = self {
            let primitive = mem::take(primitive);
            let handle = primitive.create(host);
            *self = Self::Materialized { handle, primitive };
        }
    }

    /// Removes the primitive from the host, keeping its state.
    pub fn release(&mut self, host: &mut dyn MapHost) {
        if let Self::Materialized { handle, primitive } = self {
            P::remove(*handle, host);
            let primitive = mem::take(primitive);
            *self = Self::Pending(primitive);
        }
    }

    /// Displays or hides the primitive.
    pub fn set_materialized(&mut self, materialized: bool, host: &mut dyn MapHost) {
        if materialized {
            self.materialize(host);
        } else {
            self.release(host);
        }
    }
}

#[cfg(test)]
mod tests {
    use geomap_types::latlng;

    use super::*;
    use crate::host::{HeadlessHost, MarkerPrimitive};

    #[test]
    fn pending_changes_are_applied_on_materialize() {
        let mut host = HeadlessHost::new();
        let mut state = RenderState::<MarkerPrimitive>::default();

        state.update(&mut host, |m| m.position = latlng!(1.0, 2.0));
        assert_eq!(host.marker_count(), 0);

        state.materialize(&mut host);
        let handle = state.handle().expect("materialized");
        assert_eq!(host.marker(handle).map(|m| m.position), Some(latlng!(1.0, 2.0)));

        state.update(&mut host, |m| m.opacity = 0.5);
        assert_eq!(host.marker(handle).map(|m| m.opacity), Some(0.5));
    }

    #[test]
    fn release_keeps_state() {
        let mut host = HeadlessHost::new();
        let mut state = RenderState::new(MarkerPrimitive {
            content: "a".into(),
            ..Default::default()
        });
        state.materialize(&mut host);
        state.release(&mut host);
        assert_eq!(host.marker_count(), 0);
        assert!(!state.is_materialized());
        assert_eq!(state.primitive().content, "a");

        state.update(&mut host, |m| m.content = "b".into());
        state.materialize(&mut host);
        assert_eq!(host.marker_count(), 1);
        assert_eq!(state.primitive().content, "b");
    }
}
