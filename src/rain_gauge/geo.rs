// rain_gauge - Local rainfall tracker built on nearby personal weather stations
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use serde::Serialize;
use std::error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateError {
    Latitude(f64),
    Longitude(f64),
}

impl fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latitude(v) => write!(f, "invalid latitude {} (must be within -90 to 90)", v),
            Self::Longitude(v) => write!(f, "invalid longitude {} (must be within -180 to 180)", v),
        }
    }
}

impl error::Error for CoordinateError {}

/// A point on the earth, in decimal degrees.
///
/// Coordinates can only be constructed via `Coordinate::new` which rejects values
/// that are not finite or are outside of valid geographic ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }

        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }

        Ok(Coordinate { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to `other` in statute miles.
    pub fn distance_miles(&self, other: &Coordinate) -> f64 {
        haversine::distance(
            haversine::Location {
                latitude: self.latitude,
                longitude: self.longitude,
            },
            haversine::Location {
                latitude: other.latitude,
                longitude: other.longitude,
            },
            haversine::Units::Miles,
        )
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4},{:.4}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod test {
    use super::{Coordinate, CoordinateError};

    #[test]
    fn test_coordinate_valid() {
        let c = Coordinate::new(40.0, -75.0).unwrap();
        assert_eq!(40.0, c.latitude());
        assert_eq!(-75.0, c.longitude());
    }

    #[test]
    fn test_coordinate_bounds() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert_eq!(Err(CoordinateError::Latitude(90.5)), Coordinate::new(90.5, 0.0));
        assert_eq!(Err(CoordinateError::Longitude(-180.5)), Coordinate::new(0.0, -180.5));
    }

    #[test]
    fn test_coordinate_not_finite() {
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_distance_miles() {
        let a = Coordinate::new(40.0, -75.0).unwrap();
        let b = Coordinate::new(41.0, -75.0).unwrap();

        // One degree of latitude is roughly 69 miles
        let d = a.distance_miles(&b);
        assert!((d - 69.1).abs() < 0.5, "unexpected distance {}", d);
        assert!(a.distance_miles(&a).abs() < 1e-9);
    }

    #[test]
    fn test_display() {
        let c = Coordinate::new(40.12344, -75.0).unwrap();
        assert_eq!("40.1234,-75.0000", c.to_string());
    }
}
