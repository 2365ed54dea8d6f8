//! The storage JSON codec.
//!
//! This is the shape persisted to disk by the versioning engine. Encoding is
//! canonical and deterministic; decoding is permissive: every field has a
//! default, and a handful of legacy key aliases are accepted (line azimuth
//! under `bearing`, arc rotation under `rot` or `rotation`).
//!
//! Decoding also implements the flat-format upgrade path: segments found at
//! the top level of a site document are folded into the default
//! layer/parcel/geometry chain, de-duplicated against every segment id the
//! site already owns, so repeated decode/encode cycles are idempotent.

use serde::{Deserialize, Deserializer, Serialize};

use crate::entities::{
    ArcSegment, AttrMap, Coord, Geometry, GeometryLayer, LineSegment, Parcel, Point, Segment,
    Site, SiteHistory,
};
use crate::error::{GeometryError, Result};
use crate::ids::ObjectId;

/// Storage document for a [`Site`]; the shape written to snapshot files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDoc {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub history: Option<HistoryDoc>,
    #[serde(default)]
    pub geometry_layers: Vec<LayerDoc>,
    #[serde(default)]
    pub metadata: AttrMap,
    #[serde(default)]
    pub attributes: AttrMap,
    /// Present only in session mode; legacy documents stored it as a number.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de_session_id"
    )]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<PointDoc>>,
    /// Session-mode mirror of every segment owned through the layer chain;
    /// also the legacy flat format's segment list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<SegmentDoc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryDoc {
    #[serde(default)]
    pub current_version: u64,
    #[serde(default)]
    pub previous_version_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDoc {
    #[serde(default)]
    pub geometry_layer_id: Option<String>,
    #[serde(default = "default_layer_type")]
    pub geometry_layer_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub parcels: Vec<ParcelDoc>,
    #[serde(default)]
    pub attributes: AttrMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelDoc {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub number: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub area: f64,
    #[serde(default)]
    pub attributes: AttrMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometryDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryDoc {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default = "default_geometry_kind")]
    pub kind: String,
    #[serde(default = "default_true")]
    pub is_closed: bool,
    #[serde(default)]
    pub segments: Vec<SegmentDoc>,
    #[serde(default)]
    pub attributes: AttrMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointDoc {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub layer: String,
    #[serde(default)]
    pub attributes: AttrMap,
}

/// Segment document shared by both codecs.
///
/// Line azimuth is persisted under the legacy key `bearing` in both forms;
/// `azimuth` is accepted on decode only. Arc rotation is `rot` in storage
/// form and `rotation` in frontend form; decode accepts either in either
/// form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDoc {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_segment_type")]
    pub segment_type: String,
    #[serde(default)]
    pub start: Coord,
    #[serde(default)]
    pub end: Coord,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub layer: String,
    #[serde(default)]
    pub attributes: AttrMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azimuth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Coord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
}

fn default_true() -> bool {
    true
}

fn default_layer_type() -> String {
    "Boundary".to_string()
}

fn default_geometry_kind() -> String {
    "Polygon".to_string()
}

fn default_segment_type() -> String {
    "line".to_string()
}

fn de_session_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "sessionId must be a string or number, got {other}"
        ))),
    }
}

fn id_or_generate(id: Option<String>) -> ObjectId {
    id.map_or_else(ObjectId::generate, ObjectId::new)
}

// ---------------------------------------------------------------------------
// Per-entity encode/decode
// ---------------------------------------------------------------------------

pub fn encode_point(point: &Point) -> PointDoc {
    PointDoc {
        id: Some(point.id.to_string()),
        x: point.x,
        y: point.y,
        layer: point.layer.clone(),
        attributes: point.attributes.clone(),
    }
}

pub fn decode_point(doc: PointDoc) -> Point {
    Point {
        id: id_or_generate(doc.id),
        x: doc.x,
        y: doc.y,
        layer: doc.layer,
        attributes: doc.attributes,
    }
}

fn base_segment_doc(segment: &Segment) -> SegmentDoc {
    SegmentDoc {
        id: Some(segment.id().to_string()),
        segment_type: segment.kind().as_str().to_string(),
        start: segment.start(),
        end: segment.end(),
        length: segment.length(),
        layer: segment.layer().to_string(),
        attributes: segment.attributes().clone(),
        bearing: None,
        azimuth: None,
        center: None,
        radius: None,
        rot: None,
        rotation: None,
        delta: None,
    }
}

pub fn encode_segment_storage(segment: &Segment) -> SegmentDoc {
    let mut doc = base_segment_doc(segment);
    match segment {
        Segment::Line(line) => doc.bearing = Some(line.azimuth()),
        Segment::Arc(arc) => {
            doc.center = Some(arc.center);
            doc.radius = Some(arc.radius);
            doc.rot = Some(arc.rotation.as_str().to_string());
            doc.delta = arc.delta;
        }
    }
    doc
}

pub fn encode_segment_frontend(segment: &Segment) -> SegmentDoc {
    let mut doc = base_segment_doc(segment);
    match segment {
        Segment::Line(line) => doc.bearing = Some(line.azimuth()),
        Segment::Arc(arc) => {
            doc.center = Some(arc.center);
            doc.radius = Some(arc.radius);
            doc.rotation = Some(arc.rotation.as_str().to_string());
            doc.delta = arc.delta;
        }
    }
    doc
}

pub fn decode_segment(doc: SegmentDoc) -> Result<Segment> {
    match doc.segment_type.as_str() {
        "line" => {
            let azimuth = doc.bearing.or(doc.azimuth).unwrap_or(0.0);
            let mut line = LineSegment::with_raw_azimuth(doc.start, doc.end, azimuth);
            line.id = id_or_generate(doc.id);
            line.length = doc.length;
            line.layer = doc.layer;
            line.attributes = doc.attributes;
            Ok(Segment::Line(line))
        }
        "arc" => {
            let rotation = doc
                .rot
                .or(doc.rotation)
                .unwrap_or_else(|| "cw".to_string())
                .parse()?;
            Ok(Segment::Arc(ArcSegment {
                id: id_or_generate(doc.id),
                start: doc.start,
                end: doc.end,
                center: doc.center.unwrap_or_default(),
                radius: doc.radius.unwrap_or(0.0),
                rotation,
                delta: doc.delta,
                length: doc.length,
                layer: doc.layer,
                attributes: doc.attributes,
            }))
        }
        other => Err(GeometryError::UnknownSegmentKind(other.to_string())),
    }
}

pub fn encode_geometry_storage(geometry: &Geometry) -> GeometryDoc {
    GeometryDoc {
        id: Some(geometry.id.to_string()),
        kind: geometry.kind.clone(),
        is_closed: geometry.is_closed,
        segments: geometry.segments.iter().map(encode_segment_storage).collect(),
        attributes: geometry.attributes.clone(),
    }
}

pub fn encode_geometry_frontend(geometry: &Geometry) -> GeometryDoc {
    GeometryDoc {
        id: Some(geometry.id.to_string()),
        kind: geometry.kind.clone(),
        is_closed: geometry.is_closed,
        segments: geometry.segments.iter().map(encode_segment_frontend).collect(),
        attributes: geometry.attributes.clone(),
    }
}

pub fn decode_geometry(doc: GeometryDoc) -> Result<Geometry> {
    let mut geometry = Geometry {
        id: id_or_generate(doc.id),
        kind: doc.kind,
        is_closed: doc.is_closed,
        segments: Vec::with_capacity(doc.segments.len()),
        attributes: doc.attributes,
    };
    for segment in doc.segments {
        geometry.segments.push(decode_segment(segment)?);
    }
    Ok(geometry)
}

pub fn encode_parcel_storage(parcel: &Parcel) -> ParcelDoc {
    ParcelDoc {
        id: Some(parcel.id.to_string()),
        number: parcel.number,
        name: parcel.name.clone(),
        area: parcel.area,
        attributes: parcel.attributes.clone(),
        geometry: parcel.geometry.as_ref().map(encode_geometry_storage),
    }
}

pub fn decode_parcel_storage(doc: ParcelDoc) -> Result<Parcel> {
    Ok(Parcel {
        id: id_or_generate(doc.id),
        name: doc.name,
        feature_type: "parcel".to_string(),
        number: doc.number,
        area: doc.area,
        geometry: doc.geometry.map(decode_geometry).transpose()?,
        style: AttrMap::new(),
        attributes: doc.attributes,
    })
}

pub fn encode_layer_storage(layer: &GeometryLayer) -> LayerDoc {
    LayerDoc {
        geometry_layer_id: Some(layer.id.to_string()),
        geometry_layer_type: layer.layer_type.clone(),
        name: layer.name.clone(),
        visible: layer.visible,
        parcels: layer.parcels.iter().map(encode_parcel_storage).collect(),
        attributes: layer.attributes.clone(),
    }
}

pub fn decode_layer_storage(doc: LayerDoc) -> Result<GeometryLayer> {
    let mut layer = GeometryLayer {
        id: id_or_generate(doc.geometry_layer_id),
        layer_type: doc.geometry_layer_type,
        // The storage form carries no title; it defaults to the name.
        title: doc.name.clone(),
        name: doc.name,
        visible: doc.visible,
        parcels: Vec::with_capacity(doc.parcels.len()),
        attributes: doc.attributes,
    };
    for parcel in doc.parcels {
        layer.parcels.push(decode_parcel_storage(parcel)?);
    }
    Ok(layer)
}

/// Fold legacy top-level segments into the default chain, skipping any id
/// the site already owns anywhere.
pub(crate) fn fold_legacy_segments(site: &mut Site, docs: Vec<SegmentDoc>) -> Result<()> {
    if docs.is_empty() {
        return Ok(());
    }
    let mut owned: Vec<ObjectId> = site.segments().map(|s| s.id().clone()).collect();
    let mut incoming = Vec::new();
    for doc in docs {
        let segment = decode_segment(doc)?;
        if !owned.contains(segment.id()) {
            owned.push(segment.id().clone());
            incoming.push(segment);
        }
    }
    if incoming.is_empty() {
        return Ok(());
    }
    let geometry = site.default_geometry_mut();
    for segment in incoming {
        geometry.add_segment(segment);
    }
    Ok(())
}

impl Site {
    /// Encode to the storage form.
    ///
    /// In session mode the document additionally carries the flat points
    /// list and a mirror of every owned segment, which older clients read.
    pub fn to_storage(&self) -> SiteDoc {
        let session_mode = self.session_id.is_some();
        SiteDoc {
            project_id: self.project_id.clone(),
            site_id: Some(self.id.to_string()),
            name: self.name.clone(),
            version: self.version,
            history: self.history.as_ref().map(|h| HistoryDoc {
                current_version: h.current_version,
                previous_version_file: h.previous_version_file.clone(),
            }),
            geometry_layers: self.layers.iter().map(encode_layer_storage).collect(),
            metadata: self.metadata.clone(),
            attributes: self.attributes.clone(),
            session_id: self.session_id.clone(),
            points: session_mode.then(|| self.points.iter().map(encode_point).collect()),
            segments: session_mode
                .then(|| self.segments().map(encode_segment_storage).collect()),
        }
    }

    /// Decode from the storage form, upgrading legacy flat documents.
    pub fn from_storage(doc: SiteDoc) -> Result<Site> {
        let mut site = Site {
            project_id: doc.project_id,
            id: id_or_generate(doc.site_id),
            name: doc.name,
            version: doc.version,
            history: doc.history.map(|h| SiteHistory {
                current_version: h.current_version,
                previous_version_file: h.previous_version_file,
            }),
            layers: Vec::with_capacity(doc.geometry_layers.len()),
            metadata: doc.metadata,
            attributes: doc.attributes,
            session_id: doc.session_id,
            points: Vec::new(),
        };
        for layer in doc.geometry_layers {
            site.layers.push(decode_layer_storage(layer)?);
        }
        for point in doc.points.unwrap_or_default() {
            site.points.push(decode_point(point));
        }
        fold_legacy_segments(&mut site, doc.segments.unwrap_or_default())?;
        Ok(site)
    }
}
