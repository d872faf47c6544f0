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

use crate::client::StationLocation;
use crate::geo::Coordinate;
use serde::Serialize;

/// A personal weather station close enough to be used for a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub id: String,
    pub display_name: String,
    pub coordinate: Coordinate,
    pub distance_miles: f64,
}

/// Pick the stations nearest to `origin` from directory results.
///
/// Candidates further than `radius_miles` or with invalid coordinates are dropped. The
/// remainder are ordered by distance, keeping directory order for equal distances, and
/// at most `max_results` are returned.
pub fn nearest(
    origin: &Coordinate,
    candidates: Vec<StationLocation>,
    radius_miles: f64,
    max_results: usize,
) -> Vec<Station> {
    let mut stations: Vec<Station> = candidates
        .into_iter()
        .enumerate()
        .filter_map(|(i, candidate)| {
            let coordinate = match Coordinate::new(candidate.latitude, candidate.longitude) {
                Ok(c) => c,
                Err(e) => {
                    tracing::debug!(message = "skipping station with invalid location", station = %candidate.id, error = %e);
                    return None;
                }
            };

            let distance_miles = origin.distance_miles(&coordinate);
            if radius_miles.is_nan() || distance_miles > radius_miles {
                return None;
            }

            Some(Station {
                display_name: candidate.name.unwrap_or_else(|| format!("Station {}", i)),
                id: candidate.id,
                coordinate,
                distance_miles,
            })
        })
        .collect();

    // sort_by is stable so ties keep directory order
    stations.sort_by(|a, b| a.distance_miles.total_cmp(&b.distance_miles));
    stations.truncate(max_results);
    stations
}
