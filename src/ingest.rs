//! Reading tile features from a GeoJSON `FeatureCollection`.
//!
//! Every feature carries a `kind` property (`street`, `ferry`, `park`,
//! `building`, `water` or `tile_boundary`); streets are assumed when it is
//! missing. A `MultiLineString` street becomes one segment per line.

use geo::{Geometry, LineString};
use geojson::GeoJson;
use serde::Deserialize;
use tilegraph_core::BuildError;
use tilegraph_core::TileBuilder;
use tilegraph_core::model::{
    AddressRange, Area, Endpoint, EntryRestriction, Feature, FeatureBase, FeatureId, FeatureKind,
    Ferry, JunctionType, Name, NodeRef, StreetSegment,
};
use tilegraph_core::spatial::TileBoundary;
use tracing::{debug, warn};

use crate::error::CliError;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Properties {
    kind: Option<String>,
    name: Option<String>,
    name_lang: Option<String>,
    road_class: Option<u8>,
    level0: i8,
    level1: i8,
    speed_limit: u8,
    junction0: Option<String>,
    junction1: Option<String>,
    entry0: Option<String>,
    entry1: Option<String>,
    left_start: u16,
    left_end: u16,
    right_start: u16,
    right_end: u16,
    roundabout: bool,
    ramp: bool,
    groups: Vec<u32>,
}

impl Properties {
    fn base(&self, geometry: Vec<LineString<f64>>) -> FeatureBase {
        let mut base = FeatureBase::new(geometry);
        self.annotate(&mut base);
        base
    }

    fn annotate(&self, base: &mut FeatureBase) {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            let lang = self.name_lang.as_deref().unwrap_or("und");
            base.names.push(Name::official(lang, name));
        }
        base.groups.clone_from(&self.groups);
    }

    fn road_class(&self) -> u8 {
        self.road_class.unwrap_or(4).min(4)
    }

    fn address(&self) -> AddressRange {
        AddressRange {
            left_start: self.left_start,
            left_end: self.left_end,
            right_start: self.right_start,
            right_end: self.right_end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Street,
    Ferry,
    Area(FeatureKind),
    TileBoundary,
}

fn input_kind(kind: Option<&str>) -> InputKind {
    match kind.unwrap_or("street") {
        "street" => InputKind::Street,
        "ferry" => InputKind::Ferry,
        "park" => InputKind::Area(FeatureKind::Park),
        "building" => InputKind::Area(FeatureKind::Building),
        "water" => InputKind::Area(FeatureKind::Water),
        "tile_boundary" => InputKind::TileBoundary,
        other => {
            debug!("Unknown feature kind {other:?}, storing as other");
            InputKind::Area(FeatureKind::Other(0))
        }
    }
}

fn junction(value: Option<&str>) -> JunctionType {
    match value {
        Some("border") => JunctionType::BorderCrossing,
        Some("ramp") => JunctionType::BifurcationRamp,
        _ => JunctionType::Normal,
    }
}

fn entry(value: Option<&str>) -> EntryRestriction {
    match value {
        Some("no_through") => EntryRestriction::NoThroughTraffic,
        Some("no_entry") => EntryRestriction::NoEntry,
        Some("no_way") => EntryRestriction::NoWay,
        _ => EntryRestriction::NoRestrictions,
    }
}

fn lines_of(geometry: Geometry<f64>) -> Option<Vec<LineString<f64>>> {
    match geometry {
        Geometry::LineString(line) => Some(vec![line]),
        Geometry::MultiLineString(lines) => Some(lines.0),
        Geometry::Polygon(polygon) => {
            let (exterior, interiors) = polygon.into_inner();
            Some(std::iter::once(exterior).chain(interiors).collect())
        }
        Geometry::MultiPolygon(polygons) => Some(
            polygons
                .0
                .into_iter()
                .flat_map(|p| {
                    let (exterior, interiors) = p.into_inner();
                    std::iter::once(exterior).chain(interiors)
                })
                .collect(),
        ),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub added: usize,
    pub skipped: usize,
    pub tile_boundary: bool,
}

/// Parses `text` and adds every usable feature to `builder`.
///
/// Features with unsupported or malformed geometry are skipped with a
/// warning.
///
/// # Errors
///
/// Returns an error if `text` is not a GeoJSON feature collection or the
/// builder fails fatally.
pub fn load_features(text: &str, builder: &mut TileBuilder) -> Result<IngestReport, CliError> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| CliError::GeoJson(e.to_string()))?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(CliError::GeoJson(
            "expected a FeatureCollection".to_string(),
        ));
    };

    let mut report = IngestReport::default();
    for (index, feature) in collection.features.into_iter().enumerate() {
        let props: Properties = match feature.properties {
            Some(map) => serde_json::from_value(serde_json::Value::Object(map))
                .map_err(|e| CliError::GeoJson(format!("feature {index}: {e}")))?,
            None => Properties::default(),
        };
        let Some(geometry) = feature.geometry else {
            warn!("Skipping feature {index} without geometry");
            report.skipped += 1;
            continue;
        };
        let geometry: Geometry<f64> = match geometry.value.try_into() {
            Ok(geometry) => geometry,
            Err(e) => {
                warn!("Skipping feature {index}: {e}");
                report.skipped += 1;
                continue;
            }
        };

        let kind = input_kind(props.kind.as_deref());
        if kind == InputKind::TileBoundary {
            if let Geometry::Polygon(polygon) = geometry {
                builder.set_tile_boundary(TileBoundary::new(polygon));
                report.tile_boundary = true;
            } else {
                warn!("Ignoring tile boundary {index}, it is not a polygon");
                report.skipped += 1;
            }
            continue;
        }

        let Some(lines) = lines_of(geometry) else {
            warn!("Skipping feature {index} with unsupported geometry");
            report.skipped += 1;
            continue;
        };

        let mut tally = |added: bool| {
            if added {
                report.added += 1;
            } else {
                report.skipped += 1;
            }
        };
        match kind {
            InputKind::Street | InputKind::Ferry => {
                for line in lines {
                    tally(add_routeable(builder, kind, line, &props, index)?);
                }
            }
            InputKind::Area(area_kind) => {
                let area = Area {
                    kind: area_kind,
                    base: props.base(lines),
                };
                tally(add_or_skip(builder, area.into(), index)?.is_some());
            }
            InputKind::TileBoundary => {}
        }
    }

    debug!(
        "Loaded {} features, skipped {}",
        report.added, report.skipped
    );
    Ok(report)
}

fn add_routeable(
    builder: &mut TileBuilder,
    kind: InputKind,
    line: LineString<f64>,
    props: &Properties,
    index: usize,
) -> Result<bool, CliError> {
    let feature: Feature = if kind == InputKind::Ferry {
        let mut ferry = Ferry::new(line);
        props.annotate(&mut ferry.base);
        ferry.road_class = props.road_class();
        ferry.into()
    } else {
        let mut segment = StreetSegment::new(line);
        props.annotate(&mut segment.base);
        segment.road_class = props.road_class();
        segment.address = props.address();
        segment.roundabout = props.roundabout;
        segment.ramp = props.ramp;
        segment.into()
    };
    let Some(id) = add_or_skip(builder, feature, index)? else {
        return Ok(false);
    };

    let levels = [props.level0, props.level1];
    let junctions = [props.junction0.as_deref(), props.junction1.as_deref()];
    let entries = [props.entry0.as_deref(), props.entry1.as_deref()];
    for endpoint in Endpoint::BOTH {
        let node = builder.node_mut(NodeRef::new(id, endpoint))?;
        node.level = levels[endpoint.index()];
        node.junction = junction(junctions[endpoint.index()]);
        node.entry = entry(entries[endpoint.index()]);
        node.speed_limit = props.speed_limit;
    }
    Ok(true)
}

fn add_or_skip(
    builder: &mut TileBuilder,
    feature: Feature,
    index: usize,
) -> Result<Option<FeatureId>, CliError> {
    match builder.add_feature(feature) {
        Ok(id) => Ok(Some(id)),
        Err(e) if !e.is_fatal() && !matches!(e, BuildError::StaleIndex { .. }) => {
            warn!("Skipping feature {index}: {e}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use tilegraph_core::TileConfig;
    use tilegraph_core::model::{JunctionType, MapFeature};

    use super::*;

    const INPUT: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "kind": "street", "name": "Main", "road_class": 2, "level1": 1, "junction0": "border" },
                "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [10.0, 0.0]] }
            },
            {
                "type": "Feature",
                "properties": { "name": "Side" },
                "geometry": { "type": "MultiLineString", "coordinates": [[[10.0, 0.0], [10.0, 10.0]], [[10.0, 10.0], [20.0, 10.0]]] }
            },
            {
                "type": "Feature",
                "properties": { "kind": "park" },
                "geometry": { "type": "Polygon", "coordinates": [[[0.0, 5.0], [5.0, 5.0], [5.0, 9.0], [0.0, 5.0]]] }
            },
            {
                "type": "Feature",
                "properties": { "kind": "street" },
                "geometry": { "type": "Point", "coordinates": [1.0, 1.0] }
            },
            {
                "type": "Feature",
                "properties": { "kind": "tile_boundary" },
                "geometry": { "type": "Polygon", "coordinates": [[[-1.0, -1.0], [30.0, -1.0], [30.0, 30.0], [-1.0, 30.0], [-1.0, -1.0]]] }
            }
        ]
    }"#;

    #[test]
    fn loads_mixed_collection() {
        let mut builder = TileBuilder::new(TileConfig::default());
        let report = load_features(INPUT, &mut builder).unwrap();
        assert_eq!(report.added, 4);
        assert_eq!(report.skipped, 1);
        assert!(report.tile_boundary);

        let store = builder.store();
        assert_eq!(store.routeable_ids().len(), 3);
        let main = store
            .iter()
            .find(|(_, f)| f.names().iter().any(|n| n.text == "Main"))
            .map(|(id, _)| id)
            .unwrap();
        assert_eq!(store.get(main).unwrap().road_class(), Some(2));
        let zero = store.node(NodeRef::new(main, Endpoint::Zero)).unwrap();
        assert_eq!(zero.junction, JunctionType::BorderCrossing);
        assert_eq!(store.node(NodeRef::new(main, Endpoint::One)).unwrap().level, 1);
    }

    #[test]
    fn rejects_non_collections() {
        let mut builder = TileBuilder::new(TileConfig::default());
        let single = r#"{ "type": "Point", "coordinates": [0.0, 0.0] }"#;
        assert!(matches!(
            load_features(single, &mut builder),
            Err(CliError::GeoJson(_))
        ));
        assert!(load_features("not json", &mut builder).is_err());
    }

    #[test]
    fn degenerate_lines_are_skipped() {
        let input = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": null,
                "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0]] }
            }]
        }"#;
        let mut builder = TileBuilder::new(TileConfig::default());
        let report = load_features(input, &mut builder).unwrap();
        assert_eq!(report.added, 0);
        assert_eq!(report.skipped, 1);
    }
}
