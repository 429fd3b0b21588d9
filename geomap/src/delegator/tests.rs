use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use assert_matches::assert_matches;
use geomap_types::{latlng, LatLng};

use super::*;
use crate::control::{EventPropagation, PointerEvent};
use crate::host::HeadlessHost;
use crate::policy::ToolPolicy;
use crate::tests::{all_ways, init_logger, view_at, way_nodes};

const CENTER: LatLng = latlng!(10.0, 20.0);

fn layer_with(config: GeoMapConfig) -> (GeoLayerDelegator, Rc<RefCell<HeadlessHost>>) {
    init_logger();
    let host = HeadlessHost::shared();
    let layer = GeoLayerDelegator::new(
        LayerId::from(100),
        config,
        view_at(CENTER, 18.0),
        IdGenerator::new(),
        host.clone(),
    );
    (layer, host)
}

fn layer() -> (GeoLayerDelegator, Rc<RefCell<HeadlessHost>>) {
    layer_with(GeoMapConfig::default())
}

fn draw(layer: &mut GeoLayerDelegator, points: &[LatLng]) -> (Vec<NodeId>, WayId) {
    layer.edit("draw", |features| {
        let nodes: Vec<NodeId> = points
            .iter()
            .map(|p| features.create_node(*p, Default::default(), Default::default()))
            .collect();
        let way = features
            .add_way(nodes.clone(), Default::default())
            .expect("way is created");
        (nodes, way)
    })
}

fn line() -> [LatLng; 4] {
    [
        latlng!(10.0, 19.999),
        latlng!(10.0, 19.9995),
        latlng!(10.0, 20.0),
        latlng!(10.0, 20.0005),
    ]
}

fn record_events(layer: &mut GeoLayerDelegator, kind: LayerEventKind) -> Rc<RefCell<Vec<LayerEvent>>> {
    let events = Rc::new(RefCell::new(vec![]));
    let sink = events.clone();
    layer.add_listener(kind, move |event, _| sink.borrow_mut().push(event.clone()));
    events
}

fn click(layer: &mut GeoLayerDelegator, at: LatLng, additive: bool) -> EventPropagation {
    layer.handle_pointer(&PointerEvent::down(at).with_additive(additive));
    layer.handle_pointer(&PointerEvent::up(at).with_additive(additive))
}

fn drag(layer: &mut GeoLayerDelegator, from: LatLng, to: LatLng) -> EventPropagation {
    layer.handle_pointer(&PointerEvent::down(from));
    layer.handle_pointer(&PointerEvent::moved(to));
    layer.handle_pointer(&PointerEvent::up(to))
}

fn position(layer: &GeoLayerDelegator, node: NodeId) -> Option<LatLng> {
    layer.features().node(node).map(|n| n.position())
}

#[test]
fn drawing_in_create_mode_builds_a_way() {
    let (mut layer, _host) = layer();
    let added = record_events(&mut layer, LayerEventKind::WayAdded);
    layer.set_mode(EditMode::Create);

    let points = [latlng!(10.0, 19.999), latlng!(10.0, 20.0), latlng!(10.0, 20.001)];
    for point in points {
        assert_eq!(
            layer.handle_pointer(&PointerEvent::down(point)),
            EventPropagation::Consume
        );
        assert_eq!(
            layer.handle_pointer(&PointerEvent::up(point)),
            EventPropagation::Stop
        );
    }

    assert_eq!(layer.features().way_count(), 1);
    assert_eq!(layer.features().node_count(), 3);
    let way = layer.candidate().way().expect("way is being extended");
    assert_eq!(way_nodes(layer.features(), way).len(), 3);
    assert_eq!(layer.history().undo_len(), 2);
    assert_eq!(*added.borrow(), vec![LayerEvent::WayAdded(way)]);
}

#[test]
fn view_mode_leaves_events_to_the_map() {
    let (mut layer, _host) = layer();
    let modes = record_events(&mut layer, LayerEventKind::ModeChanged);
    let (nodes, _) = draw(&mut layer, &line());

    layer.set_mode(EditMode::View);
    assert_eq!(
        layer.handle_pointer(&PointerEvent::down(line()[0])),
        EventPropagation::Propagate
    );
    assert_eq!(
        layer.handle_pointer(&PointerEvent::up(line()[0])),
        EventPropagation::Propagate
    );
    assert!(!layer.activation().is_node_active(nodes[0]));
    assert_eq!(*modes.borrow(), vec![LayerEvent::ModeChanged(EditMode::View)]);
}

#[test]
fn multi_touch_is_never_handled() {
    let (mut layer, _host) = layer();
    draw(&mut layer, &line());

    let event = PointerEvent::down(line()[0]).with_kind(crate::control::PointerKind::MultiTouch);
    assert_eq!(layer.handle_pointer(&event), EventPropagation::Propagate);
    assert!(!layer.invoker().is_active());
}

#[test]
fn deleting_an_interior_node_drops_the_short_piece() {
    let (mut layer, _host) = layer();
    let deleted = record_events(&mut layer, LayerEventKind::NodeDeleted);
    let (nodes, way) = draw(&mut layer, &line());
    let [a, b, c, d] = [nodes[0], nodes[1], nodes[2], nodes[3]];

    layer.activate_nodes(&[b]).expect("node exists");
    assert!(layer.press_tool(Tool::Delete));

    assert_eq!(all_ways(layer.features()), vec![vec![c, d]]);
    assert!(!layer.features().contains_way(way));
    let remaining: Vec<WayId> = layer.features().ways().map(|way| way.id()).collect();
    assert_eq!(remaining.len(), 1);
    assert_ne!(remaining[0], way);
    assert!(!layer.features().contains_node(a));
    assert!(!layer.features().contains_node(b));
    assert!(layer.activation().is_empty());
    assert_eq!(
        *deleted.borrow(),
        vec![LayerEvent::NodeDeleted(a), LayerEvent::NodeDeleted(b)]
    );

    assert!(layer.undo());
    assert_eq!(way_nodes(layer.features(), way), nodes);
    assert!(!layer.features().contains_way(remaining[0]));
}

#[test]
fn deleting_a_segment_splits_the_way() {
    let (mut layer, _host) = layer();
    let (nodes, way) = draw(&mut layer, &line());

    layer
        .activate_segments(&[LineSegment::new(way, nodes[1], nodes[2])])
        .expect("segment exists");
    layer.delete_selection();

    assert_eq!(
        all_ways(layer.features()),
        vec![vec![nodes[0], nodes[1]], vec![nodes[2], nodes[3]]]
    );
    assert_eq!(layer.features().node_count(), 4);
}

#[test]
fn deleting_a_way_removes_its_nodes() {
    let (mut layer, _host) = layer();
    let (_, way) = draw(&mut layer, &line());
    let (other, _) = draw(&mut layer, &[latlng!(10.001, 19.999), latlng!(10.001, 20.0)]);

    layer.activate_ways(&[way]).expect("way exists");
    layer.delete_selection();

    assert_eq!(all_ways(layer.features()), vec![other]);
    assert_eq!(layer.features().node_count(), 2);
}

#[test]
fn divide_splits_at_selected_nodes() {
    let (mut layer, _host) = layer();
    let (nodes, way) = draw(&mut layer, &line());

    layer.activate_nodes(&[nodes[2]]).expect("node exists");
    let created = layer.divide_selection();

    assert_eq!(created.len(), 2);
    assert!(!layer.features().contains_way(way));
    assert_eq!(
        all_ways(layer.features()),
        vec![vec![nodes[0], nodes[1], nodes[2]], vec![nodes[2], nodes[3]]]
    );
    assert!(layer.activation().is_node_active(nodes[2]));

    assert!(layer.undo());
    assert_eq!(all_ways(layer.features()), vec![nodes]);
}

#[test]
fn disabled_tools_do_nothing() {
    let config = GeoMapConfig {
        tools: ToolPolicy::default().with_delete(false),
        ..Default::default()
    };
    let (mut layer, _host) = layer_with(config);
    let clicked = record_events(&mut layer, LayerEventKind::ToolButtonClicked);
    let (nodes, _) = draw(&mut layer, &line());

    layer.activate_nodes(&[nodes[1]]).expect("node exists");
    assert!(!layer.press_tool(Tool::Delete));
    assert_eq!(layer.features().node_count(), 4);
    assert!(clicked.borrow().is_empty());

    assert!(layer.press_tool(Tool::Close));
    assert_eq!(layer.mode(), EditMode::View);
    assert!(layer.activation().is_empty());
    assert_eq!(*clicked.borrow(), vec![LayerEvent::ToolButtonClicked(Tool::Close)]);
}

#[test]
fn copy_exports_selected_ways_with_their_nodes() {
    let (mut layer, _host) = layer();
    let copied = record_events(&mut layer, LayerEventKind::FeaturesCopied);
    let (_, way) = draw(&mut layer, &line());
    draw(&mut layer, &[latlng!(10.001, 19.999), latlng!(10.001, 20.0)]);

    layer.activate_ways(&[way]).expect("way exists");
    assert!(layer.press_tool(Tool::Copy));

    let events = copied.borrow();
    assert_matches!(
        events.as_slice(),
        [LayerEvent::FeaturesCopied(collection)] if collection.features.len() == 5
    );
}

#[test]
fn clicks_replace_and_extend_the_selection() {
    let (mut layer, _host) = layer();
    let activations = record_events(&mut layer, LayerEventKind::ActivationChanged);
    let (nodes, _) = draw(&mut layer, &line());
    let points = line();

    assert_eq!(click(&mut layer, points[0], false), EventPropagation::Stop);
    assert_eq!(
        layer.activation().nodes().iter().copied().collect::<Vec<_>>(),
        vec![nodes[0]]
    );

    click(&mut layer, points[1], false);
    assert_eq!(
        layer.activation().nodes().iter().copied().collect::<Vec<_>>(),
        vec![nodes[1]]
    );

    click(&mut layer, points[0], true);
    assert_eq!(
        layer.activation().nodes().iter().copied().collect::<Vec<_>>(),
        vec![nodes[0], nodes[1]]
    );

    click(&mut layer, points[1], true);
    assert_eq!(
        layer.activation().nodes().iter().copied().collect::<Vec<_>>(),
        vec![nodes[0]]
    );

    click(&mut layer, latlng!(10.0008, 20.0), false);
    assert!(layer.activation().is_empty());
    assert_eq!(activations.borrow().len(), 5);
}

#[test]
fn dragging_over_empty_place_selects_nodes_in_the_box() {
    let (mut layer, _host) = layer();
    let (nodes, _) = draw(&mut layer, &line());

    let propagation = drag(
        &mut layer,
        latlng!(10.0005, 19.9985),
        latlng!(9.9995, 19.99975),
    );

    assert_eq!(propagation, EventPropagation::Stop);
    assert_eq!(
        layer.activation().nodes().iter().copied().collect::<Vec<_>>(),
        vec![nodes[0], nodes[1]]
    );
    assert!(!layer.invoker().is_drag_box_visible());
}

#[test]
fn undo_of_a_move_enables_redo() {
    let (mut layer, host) = layer();
    let history = record_events(&mut layer, LayerEventKind::HistoryChanged);
    let (nodes, _) = draw(&mut layer, &line());
    layer.clear_history();

    let from = line()[1];
    let to = latlng!(10.0002, 19.9995);
    assert_eq!(
        layer.handle_pointer(&PointerEvent::down(from)),
        EventPropagation::Consume
    );
    layer.handle_pointer(&PointerEvent::moved(to));
    assert_eq!(layer.handle_pointer(&PointerEvent::up(to)), EventPropagation::Stop);

    assert_abs_diff_eq!(position(&layer, nodes[1]).expect("node exists"), to, epsilon = 1e-9);
    assert!(layer.history().is_undo_enable());

    assert!(layer.undo());
    assert_abs_diff_eq!(position(&layer, nodes[1]).expect("node exists"), from, epsilon = 1e-9);
    assert!(!layer.history().is_undo_enable());
    assert!(layer.history().is_redo_enable());
    assert!(host.borrow().last_pan().is_some());
    assert_eq!(
        history.borrow().last(),
        Some(&LayerEvent::HistoryChanged {
            undo: false,
            redo: true
        })
    );

    assert!(layer.redo());
    assert_abs_diff_eq!(position(&layer, nodes[1]).expect("node exists"), to, epsilon = 1e-9);
    assert!(!layer.redo());
}

#[test]
fn dropping_a_node_on_a_neighbour_merges_them() {
    let (mut layer, _host) = layer();
    let (nodes, way) = draw(&mut layer, &line()[..3]);

    drag(&mut layer, line()[2], latlng!(10.00001, 19.9995));

    assert_eq!(way_nodes(layer.features(), way), vec![nodes[0], nodes[1]]);
    assert!(!layer.features().contains_node(nodes[2]));

    assert!(layer.undo());
    assert_eq!(way_nodes(layer.features(), way), nodes);
    assert_abs_diff_eq!(position(&layer, nodes[2]).expect("node exists"), line()[2], epsilon = 1e-9);
}

#[test]
fn pressing_a_pre_node_inserts_a_node_and_drags_it() {
    let (mut layer, _host) = layer();
    let (nodes, way) = draw(&mut layer, &line()[..2]);
    assert_eq!(layer.pre_nodes().len(), 1);

    let midpoint = line()[0].midpoint(&line()[1]);
    let to = latlng!(10.0002, 19.99925);
    assert_eq!(
        layer.handle_pointer(&PointerEvent::down(midpoint)),
        EventPropagation::Consume
    );

    let inserted = way_nodes(layer.features(), way);
    assert_eq!(inserted.len(), 3);
    assert_eq!((inserted[0], inserted[2]), (nodes[0], nodes[1]));
    assert_eq!(layer.pre_nodes().len(), 2);

    layer.handle_pointer(&PointerEvent::moved(to));
    layer.handle_pointer(&PointerEvent::up(to));
    assert_abs_diff_eq!(position(&layer, inserted[1]).expect("node exists"), to, epsilon = 1e-9);
    assert_eq!(layer.history().undo_len(), 3);

    assert!(layer.undo());
    assert!(layer.undo());
    assert_eq!(way_nodes(layer.features(), way), nodes);
    assert_eq!(layer.pre_nodes().len(), 1);
}

#[test]
fn undo_and_redo_of_every_step_restore_the_graph() {
    let (mut layer, _host) = layer();
    let (nodes, _) = draw(&mut layer, &line());
    layer.activate_nodes(&[nodes[2]]).expect("node exists");
    layer.divide_selection();
    layer.clear_activation();
    layer.activate_nodes(&[nodes[0]]).expect("node exists");
    layer.delete_selection();

    let finished = all_ways(layer.features());
    let steps = layer.history().undo_len();
    assert_eq!(steps, 3);

    for _ in 0..steps {
        assert!(layer.undo());
    }
    assert_eq!(layer.features().node_count(), 0);
    assert_eq!(layer.features().way_count(), 0);

    for _ in 0..steps {
        assert!(layer.redo());
    }
    assert_eq!(all_ways(layer.features()), finished);
    assert!(layer.visible().verify(layer.features(), layer.markers()));
}

#[test]
fn markers_follow_the_selection_and_history() {
    let (mut layer, _host) = layer();
    let markers = record_events(&mut layer, LayerEventKind::MarkerAdded);
    let id = layer.add_marker(CENTER, MarkerOptions::default());
    assert_eq!(*markers.borrow(), vec![LayerEvent::MarkerAdded(id)]);

    click(&mut layer, CENTER, false);
    assert!(layer.activation().is_marker_active(id));

    // Markers that do not fix their position are not dragged.
    let to = latlng!(10.0003, 20.0003);
    drag(&mut layer, CENTER, to);
    assert_eq!(layer.markers().marker(id).map(|m| m.position()), Some(CENTER));

    layer.set_marker_fixing_position(id, true).expect("marker exists");
    drag(&mut layer, CENTER, to);
    assert_abs_diff_eq!(
        layer.markers().marker(id).map(|m| m.position()).expect("marker exists"),
        to,
        epsilon = 1e-9
    );

    assert!(layer.undo());
    assert_abs_diff_eq!(
        layer.markers().marker(id).map(|m| m.position()).expect("marker exists"),
        CENTER,
        epsilon = 1e-9
    );

    assert!(layer.delete_marker(id).is_ok());
    assert_matches!(
        layer.delete_marker(id),
        Err(GeomapError::NotFound(FeatureRef::Marker(missing))) if missing == id
    );
}

#[test]
fn unknown_ids_are_rejected() {
    let (mut layer, _host) = layer();
    assert_matches!(
        layer.activate_nodes(&[NodeId::from(42)]),
        Err(GeomapError::NotFound(FeatureRef::Node(_)))
    );
    assert_matches!(
        layer.activate_ways(&[WayId::from(42)]),
        Err(GeomapError::NotFound(FeatureRef::Way(_)))
    );
    assert!(layer.activation().is_empty());
}

#[test]
fn import_is_one_undo_step() {
    let (mut layer, _host) = layer();
    let source = layer_source();

    let summary = layer.import_json(&source, false).expect("valid document");
    assert_eq!((summary.nodes.len(), summary.ways.len()), (4, 1));
    assert_eq!(layer.history().undo_len(), 1);

    assert!(layer.undo());
    assert_eq!(layer.features().node_count(), 0);

    assert_matches!(
        layer.import_json("{\"type\": \"Point\"}", false),
        Err(GeomapError::InvalidGeoJson(_))
    );
    assert_eq!(layer.history().redo_len(), 1);
}

/// Export of a layer with one four-node way.
fn layer_source() -> String {
    let (mut source, _host) = layer();
    draw(&mut source, &line());
    source.export_json().expect("serializable")
}

#[test]
fn zooming_out_hides_plain_nodes() {
    let (mut layer, _host) = layer();
    let visibility = record_events(&mut layer, LayerEventKind::VisibilityChanged);
    let (nodes, _) = draw(&mut layer, &line());
    assert!(layer.visible().is_node_visible(nodes[1]));
    visibility.borrow_mut().clear();

    layer.set_view(view_at(CENTER, 14.0));
    assert!(!layer.visible().is_node_visible(nodes[1]));
    assert_eq!(layer.pre_nodes().len(), 0);
    assert_eq!(visibility.borrow().len(), 1);
}

#[test]
fn clear_releases_everything_drawn() {
    let (mut layer, host) = layer();
    draw(&mut layer, &line());
    layer.add_marker(CENTER, MarkerOptions::default());
    assert!(host.borrow().marker_count() > 0);

    layer.clear();
    assert_eq!(host.borrow().marker_count(), 0);
    assert_eq!(host.borrow().polyline_count(), 0);
    assert!(!layer.history().is_undo_enable());
}
