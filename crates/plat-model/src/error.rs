use thiserror::Error;

/// Errors raised by geometry math and the JSON codecs.
///
/// Every variant is an invalid-argument condition: the input was malformed
/// or out of range, and nothing was mutated.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("bearing must be in range 0-90 degrees, got {0}")]
    BearingOutOfRange(f64),
    #[error("distance must be greater than 0, got {0}")]
    NonPositiveDistance(f64),
    #[error("invalid quadrant: {0} (must be NE, NW, SW, or SE)")]
    InvalidQuadrant(String),
    #[error("invalid rotation: {0} (must be 'cw' or 'ccw')")]
    InvalidRotation(String),
    #[error("unknown segment type: {0}")]
    UnknownSegmentKind(String),
    #[error("fixed endpoint must be 'start' or 'end', got {0}")]
    InvalidFixedEndpoint(String),
    #[error("calculated coordinates are not finite: ({x}, {y})")]
    NonFiniteCoordinate { x: f64, y: f64 },
}

pub type Result<T> = std::result::Result<T, GeometryError>;
