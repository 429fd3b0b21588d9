use std::collections::BTreeMap;

use crate::control::{EventPropagation, PointerEvent};
use crate::delegator::GeoLayerDelegator;
use crate::error::{FeatureRef, GeomapError};
use crate::geojson::ImportSummary;
use crate::host::SharedHost;
use crate::id::{IdGenerator, LayerId};
use crate::policy::GeoMapConfig;
use crate::view::MapView;

/// Map editing session: a set of editable layers over one map widget.
///
/// All layers share the id space, the configuration and the viewport. Pointer events are routed to
/// the active layer only.
pub struct GeoMap {
    host: SharedHost,
    ids: IdGenerator,
    config: GeoMapConfig,
    view: MapView,
    layers: BTreeMap<LayerId, GeoLayerDelegator>,
    active: Option<LayerId>,
}

impl std::fmt::Debug for GeoMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoMap")
            .field("view", &self.view)
            .field("layers", &self.layers.keys().collect::<Vec<_>>())
            .field("active", &self.active)
            .finish()
    }
}

impl GeoMap {
    /// Creates a map without layers.
    pub fn new(config: GeoMapConfig, view: MapView, host: SharedHost) -> Self {
        Self {
            host,
            ids: IdGenerator::new(),
            config,
            view,
            layers: BTreeMap::new(),
            active: None,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &GeoMapConfig {
        &self.config
    }

    /// Last viewport reported by the map widget.
    pub fn view(&self) -> &MapView {
        &self.view
    }

    /// Id allocator shared by every layer.
    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    /// Creates a new empty layer. The first created layer becomes active.
    pub fn create_layer(&mut self) -> LayerId {
        let id: LayerId = self.ids.next_id();
        let layer = GeoLayerDelegator::new(
            id,
            self.config.clone(),
            self.view,
            self.ids.clone(),
            self.host.clone(),
        );
        self.layers.insert(id, layer);
        if self.active.is_none() {
            self.active = Some(id);
        }

        log::debug!("Created {id}");
        id
    }

    /// Deletes the layer and removes everything it has drawn.
    pub fn delete_layer(&mut self, id: LayerId) -> Result<(), GeomapError> {
        let mut layer = self
            .layers
            .remove(&id)
            .ok_or(GeomapError::NotFound(FeatureRef::Layer(id)))?;
        layer.clear();
        if self.active == Some(id) {
            self.active = None;
        }

        log::debug!("Deleted {id}");
        Ok(())
    }

    /// Layer by id.
    pub fn layer(&self, id: LayerId) -> Option<&GeoLayerDelegator> {
        self.layers.get(&id)
    }

    /// Mutable layer by id.
    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut GeoLayerDelegator> {
        self.layers.get_mut(&id)
    }

    fn existing_layer_mut(&mut self, id: LayerId) -> Result<&mut GeoLayerDelegator, GeomapError> {
        self.layers
            .get_mut(&id)
            .ok_or(GeomapError::NotFound(FeatureRef::Layer(id)))
    }

    /// Ids of all layers in creation order.
    pub fn layer_ids(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.layers.keys().copied()
    }

    /// Number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Makes the layer receive pointer events. Gestures in progress in the previously active layer
    /// are abandoned.
    pub fn set_active_layer(&mut self, id: LayerId) -> Result<(), GeomapError> {
        if !self.layers.contains_key(&id) {
            return Err(GeomapError::NotFound(FeatureRef::Layer(id)));
        }

        if let Some(previous) = self.active.filter(|previous| *previous != id) {
            if let Some(layer) = self.layers.get_mut(&previous) {
                layer.cancel_gesture();
            }
        }

        self.active = Some(id);
        Ok(())
    }

    /// Id of the layer receiving pointer events.
    pub fn active_layer_id(&self) -> Option<LayerId> {
        self.active
    }

    /// Layer receiving pointer events.
    pub fn active_layer(&self) -> Option<&GeoLayerDelegator> {
        self.active.and_then(|id| self.layers.get(&id))
    }

    /// Mutable layer receiving pointer events.
    pub fn active_layer_mut(&mut self) -> Option<&mut GeoLayerDelegator> {
        self.active.and_then(|id| self.layers.get_mut(&id))
    }

    /// Applies a new viewport reported by the map widget to every layer.
    pub fn set_view(&mut self, view: MapView) {
        self.view = view;
        for layer in self.layers.values_mut() {
            layer.set_view(view);
        }
    }

    /// Applies a new configuration to every layer.
    pub fn set_config(&mut self, config: GeoMapConfig) {
        for layer in self.layers.values_mut() {
            layer.set_config(config.clone());
        }
        self.config = config;
    }

    /// Routes a pointer event to the active layer.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> EventPropagation {
        match self.active_layer_mut() {
            Some(layer) => layer.handle_pointer(event),
            None => EventPropagation::Propagate,
        }
    }

    /// Imports a GeoJSON feature collection into the layer.
    pub fn import_layer_json(
        &mut self,
        id: LayerId,
        json: &str,
        preserve_ids: bool,
    ) -> Result<ImportSummary, GeomapError> {
        self.existing_layer_mut(id)?.import_json(json, preserve_ids)
    }

    /// Exports the layer as a GeoJSON feature collection.
    pub fn export_layer_json(&self, id: LayerId) -> Result<String, GeomapError> {
        self.layers
            .get(&id)
            .ok_or(GeomapError::NotFound(FeatureRef::Layer(id)))?
            .export_json()
    }

    /// Undoes the last edit of the layer.
    pub fn undo(&mut self, id: LayerId) -> Result<bool, GeomapError> {
        Ok(self.existing_layer_mut(id)?.undo())
    }

    /// Redoes the last undone edit of the layer.
    pub fn redo(&mut self, id: LayerId) -> Result<bool, GeomapError> {
        Ok(self.existing_layer_mut(id)?.redo())
    }
}
