//! Fixtures shared by unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use geomap_types::LatLng;

use crate::feature::{GeoFeatureManager, GeoWay};
use crate::host::HeadlessHost;
use crate::id::{IdGenerator, NodeId, WayId};
use crate::view::{MapView, ScreenSize};

/// Empty graph drawing into a headless host.
pub(crate) fn features() -> (GeoFeatureManager, Rc<RefCell<HeadlessHost>>) {
    let host = HeadlessHost::shared();
    let manager = GeoFeatureManager::new(IdGenerator::new(), host.clone());
    (manager, host)
}

/// Creates a node at every point and an enabled way through them.
pub(crate) fn path(features: &mut GeoFeatureManager, points: &[LatLng]) -> (Vec<NodeId>, WayId) {
    let nodes: Vec<NodeId> = points
        .iter()
        .map(|p| features.create_node(*p, Default::default(), Default::default()))
        .collect();
    let way = features
        .add_way(nodes.clone(), Default::default())
        .expect("way is created");
    features.flush();
    (nodes, way)
}

/// 800x600 viewport centered at the point.
pub(crate) fn view_at(center: LatLng, zoom: f64) -> MapView {
    MapView::new(center, zoom, ScreenSize::new(800.0, 600.0))
}

/// Node list of the way, or an empty list if it does not exist.
pub(crate) fn way_nodes(features: &GeoFeatureManager, way: WayId) -> Vec<NodeId> {
    use crate::feature::FeatureGraph;

    features
        .way(way)
        .map(|way| way.nodes().to_vec())
        .unwrap_or_default()
}

/// Node lists of every way in ascending way id order.
pub(crate) fn all_ways(features: &GeoFeatureManager) -> Vec<Vec<NodeId>> {
    use crate::feature::FeatureGraph;

    features
        .ways()
        .map(|way: &GeoWay| way.nodes().to_vec())
        .collect()
}

/// Installs the test logger once.
pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
