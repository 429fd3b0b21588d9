//! Exchange of the node/way graph as a GeoJSON feature collection.
//!
//! Nodes are written as `Point` features and ways as `LineString` features. The properties of a
//! feature carry its kind, id and tags:
//!
//! ```json
//! {"type": "node", "id": 3, "tags": {"name": "gate"}}
//! {"type": "way", "id": 7, "nodes": [3, 4, 5], "tags": {}}
//! ```
//!
//! Coordinates follow GeoJSON order, longitude first.

use std::collections::{BTreeMap, BTreeSet};

use geojson::{feature, Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use geomap_types::LatLng;
use serde_json::json;

use crate::error::GeomapError;
use crate::feature::{FeatureGraph, GeoFeatureManager, GeoNode, GeoWay, Tags};
use crate::id::{NodeId, WayId};

const KIND: &str = "type";
const KIND_NODE: &str = "node";
const KIND_WAY: &str = "way";
const ID: &str = "id";
const NODES: &str = "nodes";
const TAGS: &str = "tags";

/// Features created by an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Created nodes, in the document order.
    pub nodes: Vec<NodeId>,
    /// Created ways, in the document order.
    pub ways: Vec<WayId>,
}

fn node_feature(node: &GeoNode) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert(KIND.into(), json!(KIND_NODE));
    properties.insert(ID.into(), json!(node.id().value()));
    properties.insert(TAGS.into(), serde_json::Value::Object(node.tags().clone()));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(node.position().into()))),
        id: Some(feature::Id::Number(node.id().value().into())),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn way_feature(graph: &impl FeatureGraph, way: &GeoWay) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert(KIND.into(), json!(KIND_WAY));
    properties.insert(ID.into(), json!(way.id().value()));
    properties.insert(
        NODES.into(),
        json!(way.nodes().iter().map(NodeId::value).collect::<Vec<_>>()),
    );
    properties.insert(TAGS.into(), serde_json::Value::Object(way.tags().clone()));

    let coordinates: Vec<geojson::Position> = way
        .nodes()
        .iter()
        .filter_map(|id| graph.node(*id))
        .map(|node| node.position().into())
        .collect();

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(coordinates))),
        id: Some(feature::Id::Number(way.id().value().into())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Exports every node and way of the graph. Nodes go first, so a reader can resolve way node
/// references in one pass.
pub fn to_feature_collection(graph: &impl FeatureGraph) -> FeatureCollection {
    let mut features: Vec<Feature> = graph.nodes().map(node_feature).collect();
    features.extend(graph.ways().map(|way| way_feature(graph, way)));

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Exports the given ways together with all their nodes, and the given standalone nodes.
pub fn selection_to_feature_collection(
    graph: &impl FeatureGraph,
    nodes: &BTreeSet<NodeId>,
    ways: &BTreeSet<WayId>,
) -> FeatureCollection {
    let ways: Vec<&GeoWay> = ways.iter().filter_map(|id| graph.way(*id)).collect();
    let mut node_ids = nodes.clone();
    for way in &ways {
        node_ids.extend(way.nodes().iter().copied());
    }

    let mut features: Vec<Feature> = node_ids
        .iter()
        .filter_map(|id| graph.node(*id))
        .map(node_feature)
        .collect();
    features.extend(ways.into_iter().map(|way| way_feature(graph, way)));

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Parses a JSON document that must be a feature collection.
pub fn parse_feature_collection(json: &str) -> Result<FeatureCollection, GeomapError> {
    match json.parse::<GeoJson>() {
        Ok(GeoJson::FeatureCollection(collection)) => Ok(collection),
        Ok(_) => Err(GeomapError::InvalidGeoJson(
            "expected a feature collection".into(),
        )),
        Err(err) => Err(GeomapError::InvalidGeoJson(err.to_string())),
    }
}

#[derive(Debug)]
struct ParsedNode {
    id: Option<u64>,
    position: LatLng,
    tags: Tags,
}

#[derive(Debug)]
struct ParsedWay {
    id: Option<u64>,
    nodes: WayNodes,
    tags: Tags,
}

#[derive(Debug)]
enum WayNodes {
    /// Ids of node features of the same document.
    References(Vec<u64>),
    /// No references given: a node is created at every vertex.
    Coordinates(Vec<LatLng>),
}

fn invalid(index: usize, message: impl std::fmt::Display) -> GeomapError {
    GeomapError::InvalidGeoJson(format!("feature {index}: {message}"))
}

fn optional_id(properties: &JsonObject, index: usize) -> Result<Option<u64>, GeomapError> {
    match properties.get(ID) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .filter(|id| *id > 0)
            .map(Some)
            .ok_or_else(|| invalid(index, format!("id must be a positive integer, got {value}"))),
    }
}

fn tags(properties: &JsonObject, index: usize) -> Result<Tags, GeomapError> {
    match properties.get(TAGS) {
        None | Some(serde_json::Value::Null) => Ok(Tags::new()),
        Some(serde_json::Value::Object(tags)) => Ok(tags.clone()),
        Some(_) => Err(invalid(index, "tags must be an object")),
    }
}

fn position(position: &geojson::Position, index: usize) -> Result<LatLng, GeomapError> {
    LatLng::try_from(position).map_err(|err| invalid(index, err))
}

fn parse(
    collection: &FeatureCollection,
) -> Result<(Vec<ParsedNode>, Vec<ParsedWay>), GeomapError> {
    let mut nodes = vec![];
    let mut ways = vec![];

    for (index, feature) in collection.features.iter().enumerate() {
        let empty = JsonObject::new();
        let properties = feature.properties.as_ref().unwrap_or(&empty);
        let Some(geometry) = &feature.geometry else {
            return Err(invalid(index, "geometry is missing"));
        };

        let kind = properties.get(KIND).and_then(|kind| kind.as_str());
        match (&geometry.value, kind) {
            (Value::Point(point), None | Some(KIND_NODE)) => nodes.push(ParsedNode {
                id: optional_id(properties, index)?,
                position: position(point, index)?,
                tags: tags(properties, index)?,
            }),
            (Value::LineString(line), None | Some(KIND_WAY)) => {
                let coordinates = line
                    .iter()
                    .map(|p| position(p, index))
                    .collect::<Result<Vec<_>, _>>()?;
                let way_nodes = match properties.get(NODES) {
                    None | Some(serde_json::Value::Null) => WayNodes::Coordinates(coordinates),
                    Some(serde_json::Value::Array(refs)) => {
                        let refs = refs
                            .iter()
                            .map(|r| r.as_u64().ok_or_else(|| invalid(index, "node reference must be an integer")))
                            .collect::<Result<Vec<_>, _>>()?;
                        if refs.len() != coordinates.len() {
                            return Err(invalid(
                                index,
                                format!("{} node references for {} vertices", refs.len(), coordinates.len()),
                            ));
                        }
                        WayNodes::References(refs)
                    }
                    Some(_) => return Err(invalid(index, "nodes must be an array")),
                };

                ways.push(ParsedWay {
                    id: optional_id(properties, index)?,
                    nodes: way_nodes,
                    tags: tags(properties, index)?,
                });
            }
            (_, Some(kind)) => {
                return Err(invalid(index, format!("unexpected geometry for a feature of type {kind}")))
            }
            (_, None) => return Err(invalid(index, "only points and line strings are supported")),
        }
    }

    Ok((nodes, ways))
}

fn validate(
    graph: &GeoFeatureManager,
    nodes: &[ParsedNode],
    ways: &[ParsedWay],
    preserve_ids: bool,
) -> Result<(), GeomapError> {
    let mut node_ids = BTreeSet::new();
    for node in nodes {
        let Some(id) = node.id else {
            continue;
        };
        if !node_ids.insert(id) {
            return Err(GeomapError::InvalidGeoJson(format!("duplicate node id {id}")));
        }
        if preserve_ids && graph.contains_node(NodeId::from(id)) {
            return Err(GeomapError::InvalidGeoJson(format!("{} already exists", NodeId::from(id))));
        }
    }

    let mut way_ids = BTreeSet::new();
    for way in ways {
        if let WayNodes::References(refs) = &way.nodes {
            if let Some(missing) = refs.iter().find(|r| !node_ids.contains(r)) {
                return Err(GeomapError::InvalidGeoJson(format!(
                    "way references unknown node {missing}"
                )));
            }
        }

        let Some(id) = way.id else {
            continue;
        };
        if !way_ids.insert(id) {
            return Err(GeomapError::InvalidGeoJson(format!("duplicate way id {id}")));
        }
        if preserve_ids && graph.contains_way(WayId::from(id)) {
            return Err(GeomapError::InvalidGeoJson(format!("{} already exists", WayId::from(id))));
        }
    }

    Ok(())
}

/// Adds the features of the collection to the graph.
///
/// The whole document is validated before anything is added, so a failed import leaves the graph
/// untouched. With `preserve_ids` the features keep the ids given in the document (an id already in
/// use is an error); otherwise every feature gets a fresh id and way node references are
/// remapped accordingly. Features without an id always get a fresh one.
pub fn import_feature_collection(
    graph: &mut GeoFeatureManager,
    collection: &FeatureCollection,
    preserve_ids: bool,
) -> Result<ImportSummary, GeomapError> {
    let (nodes, ways) = parse(collection)?;
    validate(graph, &nodes, &ways, preserve_ids)?;

    let mut summary = ImportSummary::default();
    let mut id_map: BTreeMap<u64, NodeId> = BTreeMap::new();
    for node in nodes {
        let id = match node.id.filter(|_| preserve_ids) {
            Some(id) => {
                let id = NodeId::from(id);
                graph.add_node(GeoNode::new(id, node.position, Default::default(), node.tags));
                id
            }
            None => graph.create_node(node.position, Default::default(), node.tags),
        };
        if let Some(original) = node.id {
            id_map.insert(original, id);
        }
        summary.nodes.push(id);
    }

    for way in ways {
        let way_nodes: Vec<NodeId> = match way.nodes {
            WayNodes::References(refs) => refs.iter().filter_map(|r| id_map.get(r).copied()).collect(),
            WayNodes::Coordinates(coordinates) => coordinates
                .into_iter()
                .map(|position| {
                    let id = graph.create_node(position, Default::default(), Default::default());
                    summary.nodes.push(id);
                    id
                })
                .collect(),
        };

        let id = match way.id.filter(|_| preserve_ids) {
            Some(id) => {
                let id = WayId::from(id);
                graph.add_way_with_id(id, way_nodes, way.tags).then_some(id)
            }
            None => graph.add_way(way_nodes, way.tags),
        };
        match id {
            Some(id) => summary.ways.push(id),
            None => log::warn!("Skipped an imported way without nodes"),
        }
    }

    log::debug!(
        "Imported {} nodes and {} ways",
        summary.nodes.len(),
        summary.ways.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use geomap_types::latlng;

    use super::*;
    use crate::tests::{all_ways, features, path};

    fn structure(graph: &GeoFeatureManager) -> Vec<(Vec<LatLng>, Tags)> {
        graph
            .ways()
            .map(|way| {
                let positions = way
                    .nodes()
                    .iter()
                    .filter_map(|id| graph.node(*id))
                    .map(GeoNode::position)
                    .collect();
                (positions, way.tags().clone())
            })
            .collect()
    }

    #[test]
    fn export_then_import_keeps_structure_with_new_ids() {
        let (mut source, _) = features();
        let (nodes, way) = path(
            &mut source,
            &[latlng!(37.0, 127.0), latlng!(37.001, 127.0), latlng!(37.001, 127.001)],
        );
        let mut tags = Tags::new();
        tags.insert("name".into(), json!("fence"));
        source.set_way_tags(way, tags);
        path(&mut source, &[latlng!(37.001, 127.001), latlng!(37.002, 127.002)]);

        let json = serde_json::to_string(&to_feature_collection(&source)).expect("serializable");

        let (mut target, _) = features();
        target.ids().reserve(100);

        let collection = parse_feature_collection(&json).expect("valid document");
        let summary = import_feature_collection(&mut target, &collection, false).expect("imported");

        assert_eq!(summary.nodes.len(), 5);
        assert_eq!(summary.ways.len(), 2);
        assert!(summary.nodes.iter().all(|id| !nodes.contains(id)));
        assert_eq!(structure(&target), structure(&source));
    }

    #[test]
    fn ids_are_preserved_on_request() {
        let (mut source, _) = features();
        let (nodes, way) = path(&mut source, &[latlng!(10.0, 20.0), latlng!(10.0, 20.001)]);
        let collection = to_feature_collection(&source);

        let (mut target, _) = features();
        let summary = import_feature_collection(&mut target, &collection, true).expect("imported");
        assert_eq!(summary.nodes, nodes);
        assert_eq!(summary.ways, vec![way]);
        assert_eq!(all_ways(&target), vec![nodes.clone()]);

        let fresh = target.create_node(latlng!(0.0, 0.0), Default::default(), Default::default());
        assert!(fresh.value() > way.value());

        assert_matches!(
            import_feature_collection(&mut target, &collection, true),
            Err(GeomapError::InvalidGeoJson(_))
        );
    }

    #[test]
    fn line_without_references_creates_nodes() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[127.0, 37.0], [127.001, 37.0]]},
                "properties": {"type": "way"}
            }]
        }"#;
        let (mut graph, _) = features();
        let collection = parse_feature_collection(json).expect("valid document");
        let summary = import_feature_collection(&mut graph, &collection, false).expect("imported");

        assert_eq!(summary.nodes.len(), 2);
        assert_eq!(all_ways(&graph), vec![summary.nodes.clone()]);
        assert_eq!(
            graph.node(summary.nodes[0]).map(GeoNode::position),
            Some(latlng!(37.0, 127.0))
        );
    }

    #[test]
    fn invalid_document_changes_nothing() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [127.0, 37.0]},
                 "properties": {"type": "node", "id": 1}},
                {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[127.0, 37.0], [127.1, 37.0]]},
                 "properties": {"type": "way", "nodes": [1, 2]}}
            ]
        }"#;
        let (mut graph, _) = features();
        let collection = parse_feature_collection(json).expect("valid geojson");
        assert_matches!(
            import_feature_collection(&mut graph, &collection, false),
            Err(GeomapError::InvalidGeoJson(_))
        );
        assert_eq!(graph.node_count(), 0);

        assert_matches!(
            parse_feature_collection(r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#),
            Err(GeomapError::InvalidGeoJson(_))
        );
        assert_matches!(parse_feature_collection("not json"), Err(GeomapError::InvalidGeoJson(_)));
    }

    #[test]
    fn selection_includes_nodes_of_ways() {
        let (mut graph, _) = features();
        let (nodes, way) = path(&mut graph, &[latlng!(10.0, 20.0), latlng!(10.0, 20.001)]);
        let lonely = graph.create_node(latlng!(11.0, 21.0), Default::default(), Default::default());
        let other = graph.create_node(latlng!(12.0, 21.0), Default::default(), Default::default());

        let collection =
            selection_to_feature_collection(&graph, &BTreeSet::from([lonely]), &BTreeSet::from([way]));
        let ids: Vec<u64> = collection
            .features
            .iter()
            .filter_map(|f| f.property(ID).and_then(|id| id.as_u64()))
            .collect();

        assert_eq!(ids, vec![nodes[0].value(), nodes[1].value(), lonely.value(), way.value()]);
        assert!(!ids.contains(&other.value()));
    }
}
