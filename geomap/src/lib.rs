//! Geomap is the editing core of an interactive map editor. It keeps a graph of geographic nodes and
//! the ways connecting them, and lets a user create, select, drag, split, merge and delete them with
//! a pointer over any map widget.
//!
//! # Main components
//!
//! The crate does not draw anything by itself. Everything visible is described as a primitive (a
//! marker or a polyline) and given to a [`MapHost`](host::MapHost), which is the only connection to
//! the actual map widget. The widget in turn reports viewport changes as a [`MapView`] and pointer
//! input as [`PointerEvent`](control::PointerEvent)s.
//!
//! * [`GeoMap`] is the editing session: a set of layers sharing the id space, the configuration and
//!   the viewport. Pointer events go to the active layer.
//! * [`GeoLayerDelegator`](delegator::GeoLayerDelegator) is one editable layer. It owns the managers
//!   below, routes input between them and keeps them consistent after every operation.
//! * [`GeoFeatureManager`](feature::GeoFeatureManager) owns the node/way graph. Every structural edit
//!   goes through it.
//! * [`visible`], [`activation`], [`style`] and [`pre_node`] derive what is shown, what is selected,
//!   how it looks and where new nodes can be inserted.
//! * [`invoker`] and [`candidate`] are the pointer state machines of the edit and create modes.
//! * [`history`] records every edit as a command that can be undone and redone.
//!
//! # Quick start
//!
//! ```no_run
//! use geomap::control::PointerEvent;
//! use geomap::host::HeadlessHost;
//! use geomap::view::{MapView, ScreenSize};
//! use geomap::{GeoMap, GeoMapConfig};
//! use geomap_types::latlng;
//!
//! let view = MapView::new(latlng!(37.566, 126.978), 18.0, ScreenSize::new(800.0, 600.0));
//! let mut map = GeoMap::new(GeoMapConfig::default(), view, HeadlessHost::shared());
//! let layer = map.create_layer();
//!
//! map.handle_pointer(&PointerEvent::down(latlng!(37.566, 126.978)));
//! map.handle_pointer(&PointerEvent::up(latlng!(37.566, 126.978)));
//!
//! let json = map.export_layer_json(layer).expect("layer exists");
//! ```

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

pub mod activation;
pub mod candidate;
pub mod control;
pub mod delegator;
pub mod error;
pub mod event;
pub mod feature;
pub mod geojson;
pub mod history;
pub mod host;
pub mod id;
pub mod invoker;
mod map;
pub mod marker;
pub mod policy;
pub mod pre_node;
pub mod style;
pub mod view;
pub mod visible;

#[cfg(test)]
pub(crate) mod tests;

pub use error::GeomapError;
pub use geomap_types;
pub use map::GeoMap;
pub use policy::GeoMapConfig;
pub use view::MapView;
