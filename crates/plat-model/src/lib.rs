//! Survey geometry domain model.
//!
//! Points, line/arc segments, parcels, and layers, aggregated under a
//! [`Site`], with two JSON codecs: the storage form persisted to snapshot
//! files and the frontend form exchanged with the display client. The
//! [`azimuth`] module holds the compass math used to recalculate segments
//! from a bearing and a distance.

pub mod azimuth;
pub mod entities;
pub mod error;
pub mod frontend;
pub mod ids;
pub mod storage;

pub use azimuth::{
    FixedEndpoint, Quadrant, azimuth_from_delta, azimuth_to_bearing, bearing_to_azimuth,
    displacement, normalize_azimuth,
};
pub use entities::{
    ArcSegment, AttrMap, Coord, Geometry, GeometryLayer, LineSegment, Parcel, Point, Rotation,
    Segment, SegmentKind, Site, SiteHistory,
};
pub use error::{GeometryError, Result};
pub use frontend::SiteView;
pub use ids::ObjectId;
pub use storage::SiteDoc;
