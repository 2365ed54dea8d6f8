//! High-level mutation operations.
//!
//! Every operation runs the same three-step cycle under the session's lock:
//! load the current site, apply an in-memory change with field-level
//! validation, commit the result through the versioning engine. Update
//! operations only touch fields the caller supplied, and attribute updates
//! merge shallowly into the existing mapping.

use std::fmt;
use std::str::FromStr;
use std::sync::PoisonError;

use plat_model::{
    ArcSegment, AttrMap, Coord, FixedEndpoint, GeometryError, LineSegment, ObjectId, Point,
    Quadrant, Rotation, Segment, SegmentKind, Site, SiteDoc, SiteView,
};

use crate::engine::GeometryStore;
use crate::error::{Result, StoreError};
use crate::session::{SessionId, SessionResolver};

/// Input for [`GeometryStore::add_point`].
#[derive(Debug, Clone, Default)]
pub struct NewPoint {
    pub x: f64,
    pub y: f64,
    pub attributes: Option<AttrMap>,
}

/// Partial update for [`GeometryStore::update_point`]; absent fields are
/// left unchanged.
#[derive(Debug, Clone, Default)]
pub struct PointUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub layer: Option<String>,
    pub attributes: Option<AttrMap>,
}

/// Input for [`GeometryStore::add_segment`].
///
/// Arc parameters ride in `attributes`: a `center` object, `radius`,
/// `rotation`, and `delta`, each with a sensible default when absent.
#[derive(Debug, Clone)]
pub struct NewSegment {
    pub start: Coord,
    pub end: Coord,
    pub kind: SegmentKind,
    pub attributes: Option<AttrMap>,
}

/// Input for [`GeometryStore::update_segment`].
#[derive(Debug, Clone)]
pub struct SegmentUpdate {
    pub start: Coord,
    pub end: Coord,
    pub layer: Option<String>,
    pub attributes: Option<AttrMap>,
}

/// Input for [`GeometryStore::recalculate_segment`].
#[derive(Debug, Clone)]
pub struct Recalculation {
    pub quadrant: Quadrant,
    pub bearing: f64,
    pub distance: f64,
    pub fixed: FixedEndpoint,
}

/// Deletable object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Point,
    Segment,
    Parcel,
    Layer,
    /// Deleting a geometry detaches it from its owning parcel.
    Geometry,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Segment => "segment",
            Self::Parcel => "parcel",
            Self::Layer => "layer",
            Self::Geometry => "geometry",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, String> {
        match value.to_ascii_lowercase().as_str() {
            "point" => Ok(Self::Point),
            "segment" => Ok(Self::Segment),
            "parcel" => Ok(Self::Parcel),
            "layer" => Ok(Self::Layer),
            "geometry" => Ok(Self::Geometry),
            _ => Err(format!("unknown object kind: {value}")),
        }
    }
}

/// A whole-site payload for [`GeometryStore::replace`], in either JSON form.
#[derive(Debug, Clone)]
pub enum SitePayload {
    Storage(serde_json::Value),
    Frontend(serde_json::Value),
}

impl SitePayload {
    /// Sniff the form: a payload carrying `collections`, `points`, or
    /// `segments` at the top level is the frontend shape.
    pub fn detect(value: serde_json::Value) -> Self {
        let frontend = value
            .as_object()
            .is_some_and(|o| {
                o.contains_key("collections")
                    || o.contains_key("points")
                    || o.contains_key("segments")
            });
        if frontend {
            Self::Frontend(value)
        } else {
            Self::Storage(value)
        }
    }

    fn decode(self) -> Result<Site> {
        match self {
            Self::Storage(value) => {
                let doc: SiteDoc = serde_json::from_value(value)
                    .map_err(|source| StoreError::InvalidPayload { source })?;
                Ok(Site::from_storage(doc)?)
            }
            Self::Frontend(value) => {
                let view: SiteView = serde_json::from_value(value)
                    .map_err(|source| StoreError::InvalidPayload { source })?;
                Ok(Site::from_frontend(view)?)
            }
        }
    }
}

fn ensure_finite(x: f64, y: f64) -> Result<()> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(GeometryError::NonFiniteCoordinate { x, y }.into())
    }
}

fn layer_from_attributes(attributes: &AttrMap) -> String {
    attributes
        .get("layer")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl<R: SessionResolver> GeometryStore<R> {
    /// Add a point to the site's flat point list.
    pub fn add_point(&self, session: &SessionId, new: NewPoint) -> Result<(Site, ObjectId)> {
        ensure_finite(new.x, new.y)?;
        let lock = self.session_lock(session);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut site = self.load_locked(session)?;
        let mut point = Point::new(new.x, new.y);
        if let Some(attributes) = new.attributes {
            point.layer = layer_from_attributes(&attributes);
            point.attributes = attributes;
        }
        let id = point.id.clone();
        site.add_point(point);
        let site = self.commit_locked(session, site, "add_point")?;
        Ok((site, id))
    }

    /// Update the supplied fields of an existing point.
    pub fn update_point(
        &self,
        session: &SessionId,
        id: &ObjectId,
        update: PointUpdate,
    ) -> Result<Site> {
        let lock = self.session_lock(session);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut site = self.load_locked(session)?;
        let point = site.point_mut(id).ok_or_else(|| StoreError::NotFound {
            kind: "point",
            id: id.to_string(),
        })?;
        if let Some(x) = update.x {
            ensure_finite(x, point.y)?;
            point.x = x;
        }
        if let Some(y) = update.y {
            ensure_finite(point.x, y)?;
            point.y = y;
        }
        if let Some(layer) = update.layer {
            point.layer = layer;
        }
        if let Some(attributes) = update.attributes {
            point.attributes.extend(attributes);
        }
        self.commit_locked(session, site, "update_point")
    }

    /// Add a segment, materializing the default layer/parcel/geometry chain
    /// on first use.
    pub fn add_segment(&self, session: &SessionId, new: NewSegment) -> Result<(Site, ObjectId)> {
        ensure_finite(new.start.x, new.start.y)?;
        ensure_finite(new.end.x, new.end.y)?;
        let attributes = new.attributes.unwrap_or_default();
        let layer = layer_from_attributes(&attributes);
        let length = new.start.distance(new.end);

        let segment = match new.kind {
            SegmentKind::Line => {
                let mut line = LineSegment::from_endpoints(new.start, new.end);
                line.layer = layer;
                line.attributes = attributes;
                Segment::Line(line)
            }
            SegmentKind::Arc => {
                let center = attributes
                    .get("center")
                    .and_then(|v| serde_json::from_value::<Coord>(v.clone()).ok())
                    .unwrap_or(new.start);
                let radius = attributes
                    .get("radius")
                    .and_then(serde_json::Value::as_f64)
                    .unwrap_or(length / 2.0);
                let rotation = match attributes.get("rotation").and_then(serde_json::Value::as_str)
                {
                    Some(token) => token.parse::<Rotation>()?,
                    None => Rotation::Cw,
                };
                let delta = attributes.get("delta").and_then(serde_json::Value::as_f64);
                Segment::Arc(ArcSegment {
                    id: ObjectId::generate(),
                    start: new.start,
                    end: new.end,
                    center,
                    radius,
                    rotation,
                    delta,
                    length,
                    layer,
                    attributes,
                })
            }
        };
        let id = segment.id().clone();

        let lock = self.session_lock(session);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut site = self.load_locked(session)?;
        site.default_geometry_mut().add_segment(segment);
        let site = self.commit_locked(session, site, "add_segment")?;
        Ok((site, id))
    }

    /// Replace a segment's endpoints (recomputing length, and azimuth for
    /// lines) and optionally its layer and attributes.
    pub fn update_segment(
        &self,
        session: &SessionId,
        id: &ObjectId,
        update: SegmentUpdate,
    ) -> Result<Site> {
        ensure_finite(update.start.x, update.start.y)?;
        ensure_finite(update.end.x, update.end.y)?;
        let lock = self.session_lock(session);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut site = self.load_locked(session)?;
        let segment = site.segment_mut(id).ok_or_else(|| StoreError::NotFound {
            kind: "segment",
            id: id.to_string(),
        })?;
        segment.update_endpoints(update.start, update.end);
        if let Some(layer) = update.layer {
            segment.set_layer(layer);
        }
        if let Some(attributes) = update.attributes {
            segment.attributes_mut().extend(attributes);
        }
        self.commit_locked(session, site, "update_segment")
    }

    /// Recalculate a line segment from a quadrant bearing and a distance,
    /// keeping one endpoint fixed.
    pub fn recalculate_segment(
        &self,
        session: &SessionId,
        id: &ObjectId,
        recalculation: Recalculation,
    ) -> Result<Site> {
        let lock = self.session_lock(session);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut site = self.load_locked(session)?;
        let segment = site.segment_mut(id).ok_or_else(|| StoreError::NotFound {
            kind: "segment",
            id: id.to_string(),
        })?;
        let line = segment.as_line_mut().ok_or_else(|| StoreError::NotALine {
            id: id.to_string(),
        })?;
        line.recalculate_by_bearing_distance(
            recalculation.quadrant,
            recalculation.bearing,
            recalculation.distance,
            recalculation.fixed,
        )?;
        self.commit_locked(session, site, "recalculate_segment")
    }

    /// Delete an object by kind and id.
    pub fn delete_object(
        &self,
        session: &SessionId,
        kind: ObjectKind,
        id: &ObjectId,
    ) -> Result<Site> {
        let lock = self.session_lock(session);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut site = self.load_locked(session)?;
        let removed = match kind {
            ObjectKind::Point => site.remove_point(id),
            ObjectKind::Segment => site.remove_segment(id),
            ObjectKind::Parcel => site.remove_parcel(id),
            ObjectKind::Layer => site.remove_layer(id),
            ObjectKind::Geometry => site.detach_geometry(id),
        };
        if !removed {
            return Err(StoreError::NotFound {
                kind: kind.as_str(),
                id: id.to_string(),
            });
        }
        let action = match kind {
            ObjectKind::Point => "delete_point",
            ObjectKind::Segment => "delete_segment",
            ObjectKind::Parcel => "delete_parcel",
            ObjectKind::Layer => "delete_layer",
            ObjectKind::Geometry => "delete_geometry",
        };
        self.commit_locked(session, site, action)
    }

    /// Replace the whole site from a client payload in either JSON form.
    pub fn replace(&self, session: &SessionId, payload: SitePayload, action: &str) -> Result<Site> {
        let mut site = payload.decode()?;
        site.session_id = Some(session.as_str().to_string());
        let lock = self.session_lock(session);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.commit_locked(session, site, action)
    }

    /// Empty the site (all layers and points) as a committed mutation.
    pub fn clear(&self, session: &SessionId) -> Result<Site> {
        let lock = self.session_lock(session);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut site = self.load_locked(session)?;
        site.clear();
        self.commit_locked(session, site, "clear_site")
    }

    /// The current site encoded in frontend form.
    pub fn frontend(&self, session: &SessionId) -> Result<serde_json::Value> {
        let site = self.load(session)?;
        serde_json::to_value(site.to_frontend())
            .map_err(|source| StoreError::InvalidPayload { source })
    }
}
