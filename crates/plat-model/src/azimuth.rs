//! Azimuth and quadrant-bearing conversions.
//!
//! An azimuth is a compass direction in decimal degrees, 0-360, with 0° at
//! North and increasing clockwise. A bearing is the same direction expressed
//! as an angle of 0-90° within one of the four compass quadrants (NE, SE,
//! SW, NW). Both representations are used by surveyors; segments store the
//! azimuth and derive the bearing on demand.

use std::fmt;
use std::str::FromStr;

use crate::error::{GeometryError, Result};

/// Compass quadrant for a quadrant bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Quadrant {
    Ne,
    Se,
    Sw,
    Nw,
}

impl Quadrant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ne => "NE",
            Self::Se => "SE",
            Self::Sw => "SW",
            Self::Nw => "NW",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quadrant {
    type Err = GeometryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_uppercase().as_str() {
            "NE" => Ok(Self::Ne),
            "SE" => Ok(Self::Se),
            "SW" => Ok(Self::Sw),
            "NW" => Ok(Self::Nw),
            _ => Err(GeometryError::InvalidQuadrant(value.to_string())),
        }
    }
}

/// Which endpoint of a segment stays fixed during recalculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixedEndpoint {
    #[default]
    Start,
    End,
}

impl FromStr for FixedEndpoint {
    type Err = GeometryError;

    fn from_str(value: &str) -> Result<Self> {
        // "start_pt"/"end_pt" are the wire tokens older clients send.
        match value.to_ascii_lowercase().as_str() {
            "start" | "start_pt" => Ok(Self::Start),
            "end" | "end_pt" => Ok(Self::End),
            _ => Err(GeometryError::InvalidFixedEndpoint(value.to_string())),
        }
    }
}

/// Normalize an azimuth into [0, 360), including for negative input.
pub fn normalize_azimuth(azimuth: f64) -> f64 {
    azimuth.rem_euclid(360.0)
}

/// Convert an azimuth to a quadrant bearing.
///
/// The circle is partitioned into four 90° arcs: [0,90) is NE measured from
/// North, [90,180) is SE measured from South, [180,270) is SW measured from
/// South, and [270,360) is NW measured from North. The bearing is always in
/// [0, 90].
pub fn azimuth_to_bearing(azimuth: f64) -> (Quadrant, f64) {
    let azimuth = normalize_azimuth(azimuth);
    if azimuth < 90.0 {
        (Quadrant::Ne, azimuth)
    } else if azimuth < 180.0 {
        (Quadrant::Se, 180.0 - azimuth)
    } else if azimuth < 270.0 {
        (Quadrant::Sw, azimuth - 180.0)
    } else {
        (Quadrant::Nw, 360.0 - azimuth)
    }
}

/// Convert a quadrant bearing back to an azimuth in [0, 360).
pub fn bearing_to_azimuth(quadrant: Quadrant, bearing: f64) -> Result<f64> {
    if !(0.0..=90.0).contains(&bearing) {
        return Err(GeometryError::BearingOutOfRange(bearing));
    }
    let azimuth = match quadrant {
        Quadrant::Ne => bearing,
        Quadrant::Se => 180.0 - bearing,
        Quadrant::Sw => 180.0 + bearing,
        Quadrant::Nw => 360.0 - bearing,
    };
    Ok(normalize_azimuth(azimuth))
}

/// Derive the azimuth of the direction (dx, dy).
///
/// `atan2` measures from East counterclockwise; the azimuth measures from
/// North clockwise, so `azimuth = (90 - angle) mod 360`.
pub fn azimuth_from_delta(dx: f64, dy: f64) -> f64 {
    normalize_azimuth(90.0 - dy.atan2(dx).to_degrees())
}

/// Displacement (dx, dy) of travelling `distance` along `azimuth`.
///
/// With 0° at North and clockwise rotation, the East component is
/// `distance * sin` and the North component `distance * cos`.
pub fn displacement(azimuth: f64, distance: f64) -> (f64, f64) {
    let radians = azimuth.to_radians();
    (distance * radians.sin(), distance * radians.cos())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{
        FixedEndpoint, Quadrant, azimuth_from_delta, azimuth_to_bearing, bearing_to_azimuth,
        displacement, normalize_azimuth,
    };
    use crate::error::GeometryError;

    const EPS: f64 = 1e-9;

    #[test]
    fn azimuth_to_bearing_fixtures() {
        let cases = [
            (0.0, Quadrant::Ne, 0.0),
            (45.0, Quadrant::Ne, 45.0),
            (90.0, Quadrant::Se, 90.0),
            (135.0, Quadrant::Se, 45.0),
            (180.0, Quadrant::Sw, 0.0),
            (210.0, Quadrant::Sw, 30.0),
            (225.0, Quadrant::Sw, 45.0),
            (270.0, Quadrant::Nw, 90.0),
            (315.0, Quadrant::Nw, 45.0),
        ];
        for (azimuth, quadrant, bearing) in cases {
            let (q, b) = azimuth_to_bearing(azimuth);
            assert_eq!(q, quadrant, "azimuth {azimuth}");
            assert!((b - bearing).abs() < EPS, "azimuth {azimuth}: got {b}");
        }
    }

    #[test]
    fn bearing_to_azimuth_fixtures() {
        let cases = [
            (Quadrant::Ne, 0.0, 0.0),
            (Quadrant::Ne, 45.0, 45.0),
            (Quadrant::Se, 45.0, 135.0),
            (Quadrant::Sw, 30.0, 210.0),
            (Quadrant::Sw, 45.0, 225.0),
            (Quadrant::Nw, 45.0, 315.0),
            (Quadrant::Nw, 90.0, 270.0),
        ];
        for (quadrant, bearing, azimuth) in cases {
            let a = bearing_to_azimuth(quadrant, bearing).unwrap();
            assert!(
                (a - azimuth).abs() < EPS,
                "{quadrant} {bearing}: got {a}, want {azimuth}"
            );
        }
    }

    #[test]
    fn bearing_out_of_range_is_rejected() {
        assert!(matches!(
            bearing_to_azimuth(Quadrant::Ne, -0.1),
            Err(GeometryError::BearingOutOfRange(_))
        ));
        assert!(matches!(
            bearing_to_azimuth(Quadrant::Sw, 90.1),
            Err(GeometryError::BearingOutOfRange(_))
        ));
    }

    #[test]
    fn negative_azimuth_normalizes_into_range() {
        assert!((normalize_azimuth(-90.0) - 270.0).abs() < EPS);
        let (q, b) = azimuth_to_bearing(-45.0);
        assert_eq!(q, Quadrant::Nw);
        assert!((b - 45.0).abs() < EPS);
    }

    #[test]
    fn quadrant_parses_case_insensitively() {
        assert_eq!("sw".parse::<Quadrant>().unwrap(), Quadrant::Sw);
        assert_eq!("Ne".parse::<Quadrant>().unwrap(), Quadrant::Ne);
        assert!(matches!(
            "north".parse::<Quadrant>(),
            Err(GeometryError::InvalidQuadrant(_))
        ));
    }

    #[test]
    fn fixed_endpoint_accepts_wire_tokens() {
        assert_eq!("start".parse::<FixedEndpoint>().unwrap(), FixedEndpoint::Start);
        assert_eq!("end_pt".parse::<FixedEndpoint>().unwrap(), FixedEndpoint::End);
        assert!("middle".parse::<FixedEndpoint>().is_err());
    }

    #[test]
    fn azimuth_from_delta_cardinal_directions() {
        assert!((azimuth_from_delta(0.0, 10.0) - 0.0).abs() < EPS);
        assert!((azimuth_from_delta(10.0, 0.0) - 90.0).abs() < EPS);
        assert!((azimuth_from_delta(0.0, -10.0) - 180.0).abs() < EPS);
        assert!((azimuth_from_delta(-10.0, 0.0) - 270.0).abs() < EPS);
    }

    proptest! {
        #[test]
        fn azimuth_round_trips_through_bearing(azimuth in 0.0f64..360.0) {
            let (quadrant, bearing) = azimuth_to_bearing(azimuth);
            prop_assert!((0.0..=90.0).contains(&bearing));
            let back = bearing_to_azimuth(quadrant, bearing).unwrap();
            prop_assert!((back - azimuth).abs() < 1e-9 || (back - azimuth).abs() > 360.0 - 1e-9);
        }

        // Boundary bearings (exactly 0 or 90) are shared between two
        // quadrants, so the quadrant round-trip is only exact inside the
        // open interval.
        #[test]
        fn bearing_round_trips_through_azimuth(
            quadrant in prop_oneof![
                Just(Quadrant::Ne),
                Just(Quadrant::Se),
                Just(Quadrant::Sw),
                Just(Quadrant::Nw),
            ],
            bearing in 0.001f64..89.999,
        ) {
            let azimuth = bearing_to_azimuth(quadrant, bearing).unwrap();
            let (q, b) = azimuth_to_bearing(azimuth);
            prop_assert_eq!(q, quadrant);
            prop_assert!((b - bearing).abs() < 1e-9);
        }

        #[test]
        fn displacement_has_requested_length(
            azimuth in 0.0f64..360.0,
            distance in 0.1f64..10_000.0,
        ) {
            let (dx, dy) = displacement(azimuth, distance);
            prop_assert!((dx.hypot(dy) - distance).abs() < 1e-6);
            let back = azimuth_from_delta(dx, dy);
            prop_assert!((back - azimuth).abs() < 1e-6 || (back - azimuth).abs() > 360.0 - 1e-6);
        }
    }
}
