//! Boundary documents → country features.
//!
//! Accepts a TopoJSON `Topology` (shared, optionally quantized arcs) or a
//! plain GeoJSON `FeatureCollection`.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::country::{CountryFeature, FeatureId};
use crate::geo::{LonLat, MultiPolygon, Polygon, Ring};

/// Decode every country polygon in `doc`. For a topology, `object` names
/// the entry in `objects` to read.
pub fn decode_features(doc: &Value, object: &str) -> anyhow::Result<Vec<CountryFeature>> {
    match doc["type"].as_str() {
        Some("Topology") => decode_topology(doc, object),
        Some("FeatureCollection") => decode_geojson(doc),
        other => bail!("unsupported boundary document type {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// TopoJSON
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Topology {
    #[serde(default)]
    transform: Option<Transform>,
    arcs: Vec<Vec<Vec<f64>>>,
    objects: HashMap<String, TopoGeometry>,
}

#[derive(Debug, Deserialize)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct TopoGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    arcs: Value,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometries: Vec<TopoGeometry>,
}

/// Absolute coordinates for every arc, undoing delta encoding and quantization.
fn decode_arcs(raw: &[Vec<Vec<f64>>], transform: Option<&Transform>) -> anyhow::Result<Vec<Vec<LonLat>>> {
    raw.iter()
        .enumerate()
        .map(|(i, arc)| {
            let (mut x, mut y) = (0.0, 0.0);
            arc.iter()
                .map(|pos| {
                    let (px, py) = match pos.as_slice() {
                        [px, py, ..] => (*px, *py),
                        _ => bail!("arc {i} has a position with fewer than two coordinates"),
                    };
                    Ok(match transform {
                        Some(t) => {
                            x += px;
                            y += py;
                            LonLat::new(x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1])
                        }
                        None => LonLat::new(px, py),
                    })
                })
                .collect()
        })
        .collect()
}

/// Stitch arcs into one ring. A negative index `!i` walks arc `i` backwards;
/// consecutive arcs share their joining point, so it is kept once.
fn stitch(indices: &[i64], arcs: &[Vec<LonLat>]) -> anyhow::Result<Vec<LonLat>> {
    let mut points: Vec<LonLat> = Vec::new();
    for &index in indices {
        let (i, reversed) = if index < 0 { (!index, true) } else { (index, false) };
        let arc = usize::try_from(i)
            .ok()
            .and_then(|i| arcs.get(i))
            .ok_or_else(|| anyhow!("arc index {index} out of range ({} arcs)", arcs.len()))?;
        points.pop();
        if reversed {
            points.extend(arc.iter().rev());
        } else {
            points.extend(arc.iter());
        }
    }
    Ok(points)
}

fn topo_polygon(rings: &[Vec<i64>], arcs: &[Vec<LonLat>]) -> anyhow::Result<Option<Polygon>> {
    let mut rings = rings
        .iter()
        .map(|r| stitch(r, arcs))
        .collect::<anyhow::Result<Vec<_>>>()?
        .into_iter()
        .filter(|r| r.len() >= 3)
        .map(Ring::new);
    Ok(rings.next().map(|exterior| Polygon::new(exterior, rings.collect())))
}

fn topo_geometry(geom: &TopoGeometry, arcs: &[Vec<LonLat>]) -> anyhow::Result<MultiPolygon> {
    let mut polygons = Vec::new();
    match geom.kind.as_str() {
        "Polygon" => {
            let rings: Vec<Vec<i64>> = serde_json::from_value(geom.arcs.clone())
                .context("polygon arcs are not a list of rings")?;
            polygons.extend(topo_polygon(&rings, arcs)?);
        }
        "MultiPolygon" => {
            let members: Vec<Vec<Vec<i64>>> = serde_json::from_value(geom.arcs.clone())
                .context("multipolygon arcs are not a list of polygons")?;
            for rings in &members {
                polygons.extend(topo_polygon(rings, arcs)?);
            }
        }
        _ => {}
    }
    Ok(MultiPolygon(polygons))
}

fn collect_topo(
    geom: &TopoGeometry,
    arcs: &[Vec<LonLat>],
    out: &mut Vec<CountryFeature>,
) -> anyhow::Result<()> {
    if geom.kind == "GeometryCollection" {
        for child in &geom.geometries {
            collect_topo(child, arcs, out)?;
        }
        return Ok(());
    }

    let geometry = topo_geometry(geom, arcs)?;
    if geometry.is_empty() {
        return Ok(());
    }
    let properties = geom.properties.clone().unwrap_or_default();
    push_feature(geom.id.as_ref(), properties, geometry, out);
    Ok(())
}

fn decode_topology(doc: &Value, object: &str) -> anyhow::Result<Vec<CountryFeature>> {
    let topology: Topology = serde_json::from_value(doc.clone()).context("malformed topology")?;
    let root = topology
        .objects
        .get(object)
        .ok_or_else(|| anyhow!("topology has no object named {object:?}"))?;
    let arcs = decode_arcs(&topology.arcs, topology.transform.as_ref())?;

    let mut features = Vec::new();
    collect_topo(root, &arcs, &mut features)?;
    Ok(features)
}

// ---------------------------------------------------------------------------
// GeoJSON
// ---------------------------------------------------------------------------

fn geojson_ring(coords: &Value) -> Option<Ring> {
    let points: Vec<LonLat> = coords
        .as_array()?
        .iter()
        .filter_map(|pt| {
            let arr = pt.as_array()?;
            Some(LonLat::new(arr.first()?.as_f64()?, arr.get(1)?.as_f64()?))
        })
        .collect();
    (points.len() >= 3).then(|| Ring::new(points))
}

fn geojson_polygon(rings: &Value) -> Option<Polygon> {
    let mut rings = rings.as_array()?.iter().filter_map(geojson_ring);
    let exterior = rings.next()?;
    Some(Polygon::new(exterior, rings.collect()))
}

fn geojson_geometry(geom: &Value) -> MultiPolygon {
    let coords = &geom["coordinates"];
    let polygons = match geom["type"].as_str().unwrap_or("") {
        "Polygon" => geojson_polygon(coords).into_iter().collect(),
        "MultiPolygon" => coords
            .as_array()
            .map(|polys| polys.iter().filter_map(geojson_polygon).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    MultiPolygon(polygons)
}

fn decode_geojson(doc: &Value) -> anyhow::Result<Vec<CountryFeature>> {
    let items = doc["features"]
        .as_array()
        .ok_or_else(|| anyhow!("feature collection has no features array"))?;

    let mut features = Vec::new();
    for item in items {
        let geometry = geojson_geometry(&item["geometry"]);
        if geometry.is_empty() {
            continue;
        }
        let properties = item["properties"].as_object().cloned().unwrap_or_default();
        push_feature(item.get("id"), properties, geometry, &mut features);
    }
    Ok(features)
}

// ---------------------------------------------------------------------------

fn push_feature(
    raw_id: Option<&Value>,
    properties: Map<String, Value>,
    geometry: MultiPolygon,
    out: &mut Vec<CountryFeature>,
) {
    let name = ["name", "NAME", "ADMIN"]
        .iter()
        .find_map(|key| properties.get(*key).and_then(Value::as_str))
        .unwrap_or("")
        .trim()
        .to_string();
    let Some(id) = FeatureId::from_raw(raw_id, &name) else {
        log::debug!("skipping feature with neither id nor name");
        return;
    };
    let name = if name.is_empty() { id.to_string() } else { name };
    out.push(CountryFeature { id, name, geometry, properties });
}

/// Parse an `id<TAB>name` table (header line optional) into names by numeric id.
pub fn parse_names_tsv(text: &str) -> HashMap<u16, String> {
    text.lines()
        .filter_map(|line| {
            let (id, name) = line.split_once('\t')?;
            let id = id.trim().parse::<u16>().ok()?;
            let name = name.trim();
            (!name.is_empty()).then(|| (id, name.to_string()))
        })
        .collect()
}

/// Rename features whose numeric id appears in `names`.
pub fn apply_names(features: &mut [CountryFeature], names: &HashMap<u16, String>) -> usize {
    let mut renamed = 0;
    for feature in features {
        if let Some(name) = feature.id.code().and_then(|c| names.get(&c)) {
            feature.name.clone_from(name);
            renamed += 1;
        }
    }
    renamed
}
