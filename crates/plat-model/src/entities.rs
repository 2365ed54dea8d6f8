//! The geometry entity hierarchy.
//!
//! A [`Site`] is the aggregate root. It owns an ordered list of
//! [`GeometryLayer`]s, each layer owns [`Parcel`]s, a parcel owns at most one
//! [`Geometry`], and a geometry owns an ordered list of [`Segment`]s. In
//! session-editing mode the site additionally owns a flat list of
//! [`Point`]s used as the primary editing surface.
//!
//! Containment is exclusive ownership; lookups by id are explicit traversals
//! down the chain, never back-references.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::azimuth::{
    FixedEndpoint, Quadrant, azimuth_from_delta, bearing_to_azimuth, displacement,
    normalize_azimuth,
};
use crate::error::{GeometryError, Result};
use crate::ids::ObjectId;

/// Free-form attribute mapping carried verbatim through both codecs.
///
/// A `BTreeMap` keeps key order stable so repeated encodes of the same state
/// are byte-identical.
pub type AttrMap = BTreeMap<String, serde_json::Value>;

/// A 2D coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Coord {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another coordinate.
    pub fn distance(&self, other: Coord) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// A survey point owned by the site's flat point list.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: ObjectId,
    pub x: f64,
    pub y: f64,
    pub layer: String,
    pub attributes: AttrMap,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            id: ObjectId::generate(),
            x,
            y,
            layer: String::new(),
            attributes: AttrMap::new(),
        }
    }
}

/// The closed set of segment variants; the variant is the immutable
/// segment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Line,
    Arc,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Arc => "arc",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentKind {
    type Err = GeometryError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "line" => Ok(Self::Line),
            "arc" => Ok(Self::Arc),
            _ => Err(GeometryError::UnknownSegmentKind(value.to_string())),
        }
    }
}

/// Arc sweep direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Cw,
    Ccw,
}

impl Rotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cw => "cw",
            Self::Ccw => "ccw",
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rotation {
    type Err = GeometryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "cw" => Ok(Self::Cw),
            "ccw" => Ok(Self::Ccw),
            _ => Err(GeometryError::InvalidRotation(value.to_string())),
        }
    }
}

/// A straight segment between two endpoints.
///
/// `azimuth` is always stored normalized to [0, 360); the quadrant bearing
/// is a derived presentation of it, never stored separately. `length` is a
/// non-authoritative cache of the endpoint distance.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSegment {
    pub id: ObjectId,
    pub start: Coord,
    pub end: Coord,
    azimuth: f64,
    pub length: f64,
    pub layer: String,
    pub attributes: AttrMap,
}

impl LineSegment {
    /// Build a line segment with azimuth and length derived from the
    /// endpoints.
    pub fn from_endpoints(start: Coord, end: Coord) -> Self {
        Self {
            id: ObjectId::generate(),
            start,
            end,
            azimuth: azimuth_from_delta(end.x - start.x, end.y - start.y),
            length: start.distance(end),
            layer: String::new(),
            attributes: AttrMap::new(),
        }
    }

    pub(crate) fn with_raw_azimuth(start: Coord, end: Coord, azimuth: f64) -> Self {
        Self {
            id: ObjectId::generate(),
            start,
            end,
            azimuth: normalize_azimuth(azimuth),
            length: 0.0,
            layer: String::new(),
            attributes: AttrMap::new(),
        }
    }

    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    pub fn set_azimuth(&mut self, azimuth: f64) {
        self.azimuth = normalize_azimuth(azimuth);
    }

    /// The azimuth expressed as a quadrant bearing.
    pub fn bearing(&self) -> (Quadrant, f64) {
        crate::azimuth::azimuth_to_bearing(self.azimuth)
    }

    /// Re-derive azimuth and length from the current endpoints.
    pub fn rederive(&mut self) {
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        self.azimuth = azimuth_from_delta(dx, dy);
        self.length = self.start.distance(self.end);
    }

    /// Move the non-fixed endpoint so the segment runs `distance` units
    /// along the given quadrant bearing from the fixed endpoint, then
    /// recompute azimuth and length from the new endpoints.
    pub fn recalculate_by_bearing_distance(
        &mut self,
        quadrant: Quadrant,
        bearing: f64,
        distance: f64,
        fixed: FixedEndpoint,
    ) -> Result<()> {
        if !(0.0..=90.0).contains(&bearing) {
            return Err(GeometryError::BearingOutOfRange(bearing));
        }
        if distance <= 0.0 {
            return Err(GeometryError::NonPositiveDistance(distance));
        }
        let azimuth = bearing_to_azimuth(quadrant, bearing)?;
        let (dx, dy) = displacement(azimuth, distance);
        match fixed {
            FixedEndpoint::Start => {
                let end = Coord::new(self.start.x + dx, self.start.y + dy);
                if !end.is_finite() {
                    return Err(GeometryError::NonFiniteCoordinate { x: end.x, y: end.y });
                }
                self.end = end;
            }
            FixedEndpoint::End => {
                let start = Coord::new(self.end.x - dx, self.end.y - dy);
                if !start.is_finite() {
                    return Err(GeometryError::NonFiniteCoordinate {
                        x: start.x,
                        y: start.y,
                    });
                }
                self.start = start;
            }
        }
        self.rederive();
        Ok(())
    }
}

/// A circular arc between two endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcSegment {
    pub id: ObjectId,
    pub start: Coord,
    pub end: Coord,
    pub center: Coord,
    pub radius: f64,
    pub rotation: Rotation,
    pub delta: Option<f64>,
    pub length: f64,
    pub layer: String,
    pub attributes: AttrMap,
}

/// A segment is either a line or an arc; the variant never changes after
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Line(LineSegment),
    Arc(ArcSegment),
}

impl Segment {
    pub fn kind(&self) -> SegmentKind {
        match self {
            Self::Line(_) => SegmentKind::Line,
            Self::Arc(_) => SegmentKind::Arc,
        }
    }

    pub fn id(&self) -> &ObjectId {
        match self {
            Self::Line(s) => &s.id,
            Self::Arc(s) => &s.id,
        }
    }

    pub fn start(&self) -> Coord {
        match self {
            Self::Line(s) => s.start,
            Self::Arc(s) => s.start,
        }
    }

    pub fn end(&self) -> Coord {
        match self {
            Self::Line(s) => s.end,
            Self::Arc(s) => s.end,
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            Self::Line(s) => s.length,
            Self::Arc(s) => s.length,
        }
    }

    pub fn layer(&self) -> &str {
        match self {
            Self::Line(s) => &s.layer,
            Self::Arc(s) => &s.layer,
        }
    }

    pub fn set_layer(&mut self, layer: impl Into<String>) {
        match self {
            Self::Line(s) => s.layer = layer.into(),
            Self::Arc(s) => s.layer = layer.into(),
        }
    }

    pub fn attributes(&self) -> &AttrMap {
        match self {
            Self::Line(s) => &s.attributes,
            Self::Arc(s) => &s.attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut AttrMap {
        match self {
            Self::Line(s) => &mut s.attributes,
            Self::Arc(s) => &mut s.attributes,
        }
    }

    pub fn as_line_mut(&mut self) -> Option<&mut LineSegment> {
        match self {
            Self::Line(s) => Some(s),
            Self::Arc(_) => None,
        }
    }

    /// Replace both endpoints and recompute the cached length; for lines
    /// the azimuth is re-derived from the new endpoint delta as well.
    pub fn update_endpoints(&mut self, start: Coord, end: Coord) {
        match self {
            Self::Line(s) => {
                s.start = start;
                s.end = end;
                s.rederive();
            }
            Self::Arc(s) => {
                s.start = start;
                s.end = end;
                s.length = start.distance(end);
            }
        }
    }
}

/// An ordered sequence of segments with a type tag and a closed flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub id: ObjectId,
    /// Free-form type tag, e.g. "Polygon" or "LineString".
    pub kind: String,
    pub is_closed: bool,
    pub segments: Vec<Segment>,
    pub attributes: AttrMap,
}

impl Geometry {
    pub fn new(kind: impl Into<String>, is_closed: bool) -> Self {
        Self {
            id: ObjectId::generate(),
            kind: kind.into(),
            is_closed,
            segments: Vec::new(),
            attributes: AttrMap::new(),
        }
    }

    pub fn add_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn remove_segment(&mut self, id: &ObjectId) -> bool {
        match self.segments.iter().position(|s| s.id() == id) {
            Some(index) => {
                self.segments.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn segment(&self, id: &ObjectId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id() == id)
    }

    pub fn segment_mut(&mut self, id: &ObjectId) -> Option<&mut Segment> {
        self.segments.iter_mut().find(|s| s.id() == id)
    }
}

/// A parcel (property/feature) owned by exactly one layer.
///
/// `area` is caller-supplied and never recomputed from the geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Parcel {
    pub id: ObjectId,
    pub name: String,
    pub feature_type: String,
    pub number: i64,
    pub area: f64,
    pub geometry: Option<Geometry>,
    /// Presentation-only styling, carried in the frontend form.
    pub style: AttrMap,
    pub attributes: AttrMap,
}

impl Parcel {
    pub fn new(name: impl Into<String>, feature_type: impl Into<String>) -> Self {
        Self {
            id: ObjectId::generate(),
            name: name.into(),
            feature_type: feature_type.into(),
            number: 0,
            area: 0.0,
            geometry: None,
            style: AttrMap::new(),
            attributes: AttrMap::new(),
        }
    }
}

/// A named collection of parcels with a visibility flag.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryLayer {
    pub id: ObjectId,
    pub layer_type: String,
    pub name: String,
    pub title: String,
    pub visible: bool,
    pub parcels: Vec<Parcel>,
    pub attributes: AttrMap,
}

impl GeometryLayer {
    pub fn new(layer_type: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: ObjectId::generate(),
            layer_type: layer_type.into(),
            title: name.clone(),
            name,
            visible: true,
            parcels: Vec::new(),
            attributes: AttrMap::new(),
        }
    }

    pub fn add_parcel(&mut self, parcel: Parcel) {
        self.parcels.push(parcel);
    }

    pub fn remove_parcel(&mut self, id: &ObjectId) -> bool {
        match self.parcels.iter().position(|p| &p.id == id) {
            Some(index) => {
                self.parcels.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn parcel(&self, id: &ObjectId) -> Option<&Parcel> {
        self.parcels.iter().find(|p| &p.id == id)
    }

    pub fn parcel_mut(&mut self, id: &ObjectId) -> Option<&mut Parcel> {
        self.parcels.iter_mut().find(|p| &p.id == id)
    }
}

/// Snapshot chain bookkeeping stamped onto a site by each commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteHistory {
    pub current_version: u64,
    /// Name of the retained snapshot holding the pre-mutation state, when
    /// one exists.
    pub previous_version_file: Option<String>,
}

pub(crate) const DEFAULT_LAYER_NAME: &str = "Default Layer";
pub(crate) const DEFAULT_LAYER_TYPE: &str = "Boundary";
pub(crate) const DEFAULT_PARCEL_NAME: &str = "Default Parcel";

/// The aggregate root: one site per editing session.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub project_id: String,
    pub id: ObjectId,
    pub name: String,
    pub version: u64,
    pub history: Option<SiteHistory>,
    pub layers: Vec<GeometryLayer>,
    pub metadata: AttrMap,
    pub attributes: AttrMap,
    /// Set in session-editing mode; enables the flat points/segments
    /// mirror in the storage form.
    pub session_id: Option<String>,
    pub points: Vec<Point>,
}

impl Site {
    pub fn new(project_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            id: ObjectId::generate(),
            name: name.into(),
            version: 0,
            history: None,
            layers: Vec::new(),
            metadata: AttrMap::new(),
            attributes: AttrMap::new(),
            session_id: None,
            points: Vec::new(),
        }
    }

    /// Fresh version-0 site for an editing session.
    pub fn for_session(session_id: &str) -> Self {
        let mut site = Self::new("", format!("Session {session_id}"));
        site.id = ObjectId::new(session_id);
        site.session_id = Some(session_id.to_string());
        site
    }

    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn remove_point(&mut self, id: &ObjectId) -> bool {
        match self.points.iter().position(|p| &p.id == id) {
            Some(index) => {
                self.points.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn point(&self, id: &ObjectId) -> Option<&Point> {
        self.points.iter().find(|p| &p.id == id)
    }

    pub fn point_mut(&mut self, id: &ObjectId) -> Option<&mut Point> {
        self.points.iter_mut().find(|p| &p.id == id)
    }

    pub fn add_layer(&mut self, layer: GeometryLayer) {
        self.layers.push(layer);
    }

    pub fn remove_layer(&mut self, id: &ObjectId) -> bool {
        match self.layers.iter().position(|l| &l.id == id) {
            Some(index) => {
                self.layers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn layer(&self, id: &ObjectId) -> Option<&GeometryLayer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    pub fn layer_mut(&mut self, id: &ObjectId) -> Option<&mut GeometryLayer> {
        self.layers.iter_mut().find(|l| &l.id == id)
    }

    pub fn parcel(&self, id: &ObjectId) -> Option<&Parcel> {
        self.layers.iter().find_map(|l| l.parcel(id))
    }

    pub fn parcel_mut(&mut self, id: &ObjectId) -> Option<&mut Parcel> {
        self.layers.iter_mut().find_map(|l| l.parcel_mut(id))
    }

    pub fn remove_parcel(&mut self, id: &ObjectId) -> bool {
        self.layers.iter_mut().any(|l| l.remove_parcel(id))
    }

    /// Every segment owned anywhere in the layer chain, in layer order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.layers
            .iter()
            .flat_map(|l| l.parcels.iter())
            .filter_map(|p| p.geometry.as_ref())
            .flat_map(|g| g.segments.iter())
    }

    pub fn segment(&self, id: &ObjectId) -> Option<&Segment> {
        self.segments().find(|s| s.id() == id)
    }

    pub fn segment_mut(&mut self, id: &ObjectId) -> Option<&mut Segment> {
        self.layers
            .iter_mut()
            .flat_map(|l| l.parcels.iter_mut())
            .filter_map(|p| p.geometry.as_mut())
            .find_map(|g| g.segment_mut(id))
    }

    pub fn remove_segment(&mut self, id: &ObjectId) -> bool {
        self.layers
            .iter_mut()
            .flat_map(|l| l.parcels.iter_mut())
            .filter_map(|p| p.geometry.as_mut())
            .any(|g| g.remove_segment(id))
    }

    /// Clear a parcel's geometry by geometry id, deleting the geometry.
    pub fn detach_geometry(&mut self, id: &ObjectId) -> bool {
        for parcel in self.layers.iter_mut().flat_map(|l| l.parcels.iter_mut()) {
            if parcel.geometry.as_ref().is_some_and(|g| &g.id == id) {
                parcel.geometry = None;
                return true;
            }
        }
        false
    }

    /// Drop all layers and points, keeping the site shell intact.
    pub fn clear(&mut self) {
        self.layers.clear();
        self.points.clear();
    }

    /// Find or create the default layer → parcel → geometry chain used by
    /// session-based editing, and return its geometry.
    pub fn default_geometry_mut(&mut self) -> &mut Geometry {
        let index = self
            .layers
            .iter()
            .position(|l| l.name == DEFAULT_LAYER_NAME || l.layer_type == DEFAULT_LAYER_TYPE);
        let index = match index {
            Some(index) => index,
            None => {
                self.layers
                    .push(GeometryLayer::new(DEFAULT_LAYER_TYPE, DEFAULT_LAYER_NAME));
                self.layers.len() - 1
            }
        };
        let layer = &mut self.layers[index];
        if layer.parcels.is_empty() {
            layer.parcels.push(Parcel::new(DEFAULT_PARCEL_NAME, "parcel"));
        }
        let parcel = &mut layer.parcels[0];
        parcel
            .geometry
            .get_or_insert_with(|| Geometry::new("LineString", false))
    }
}
