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

use crate::cache::HistoryCache;
use crate::client::WeatherComClient;
use crate::geo::Coordinate;
use crate::history::{self, DailyPrecipitation};
use crate::locator::{self, Station};
use crate::metrics::{Endpoint, Outcome, RainMetrics};
use crate::window::{self, CumulativeMode, Window, WindowError};
use chrono::{DateTime, Days, Local, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error;
use std::fmt;

pub const DEFAULT_RADIUS_MILES: f64 = 1.0;
pub const DEFAULT_MAX_STATIONS: usize = 5;
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;
pub const DEFAULT_WINDOW_DAYS: usize = 7;

#[derive(Debug)]
pub enum ReportError {
    Window(WindowError),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Window(e) => write!(f, "{}", e),
        }
    }
}

impl error::Error for ReportError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Window(e) => Some(e),
        }
    }
}

impl From<WindowError> for ReportError {
    fn from(e: WindowError) -> Self {
        ReportError::Window(e)
    }
}

/// How the coordinate of a request was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    Gps,
    Address,
}

/// Where and when a report is for.
///
/// The lookback window ends the day before the local date of `timestamp` since the
/// current day is still accumulating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationRequest {
    pub coordinate: Coordinate,
    pub source: LocationSource,
    pub timestamp: DateTime<Local>,
}

impl LocationRequest {
    pub fn new(coordinate: Coordinate, source: LocationSource) -> Self {
        Self::at(coordinate, source, Local::now())
    }

    pub fn at(coordinate: Coordinate, source: LocationSource, timestamp: DateTime<Local>) -> Self {
        LocationRequest {
            coordinate,
            source,
            timestamp,
        }
    }

    pub fn last_day(&self) -> NaiveDate {
        let today = self.timestamp.date_naive();
        today.checked_sub_days(Days::new(1)).unwrap_or(today)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub radius_miles: f64,
    pub max_stations: usize,
    pub lookback_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            radius_miles: DEFAULT_RADIUS_MILES,
            max_stations: DEFAULT_MAX_STATIONS,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

/// Everything needed to chart rainfall around a location and map the stations used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub origin: Coordinate,
    pub source: LocationSource,
    pub stations: Vec<Station>,
    pub history: Vec<DailyPrecipitation>,
    pub window: Window,
}

impl Report {
    /// True if no stations were near enough to produce any data.
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

/// Locates stations, fetches their history, and windows the result for a report.
#[derive(Debug)]
pub struct Aggregator {
    client: WeatherComClient,
    settings: Settings,
    metrics: RainMetrics,
    cache: HistoryCache,
}

impl Aggregator {
    pub fn new(client: WeatherComClient, settings: Settings, metrics: RainMetrics) -> Self {
        Aggregator {
            client,
            settings,
            metrics,
            cache: HistoryCache::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Find at most `max_results` stations within `radius_miles` of `coord`, nearest first.
    ///
    /// Any failure talking to the station directory results in no stations. Callers should
    /// treat that as "no data" for the location.
    pub async fn locate(&self, coord: &Coordinate, radius_miles: f64, max_results: usize) -> Vec<Station> {
        match self.client.nearby_stations(coord).await {
            Ok(candidates) => {
                self.metrics.upstream(Endpoint::Directory, Outcome::Success);
                let num_candidates = candidates.len();
                let stations = locator::nearest(coord, candidates, radius_miles, max_results);
                tracing::debug!(
                    message = "located stations",
                    coordinate = %coord,
                    candidates = num_candidates,
                    stations = stations.len(),
                );
                stations
            }
            Err(e) => {
                self.metrics.upstream(Endpoint::Directory, Outcome::Failure);
                tracing::warn!(message = "failed to fetch nearby stations", coordinate = %coord, error = %e);
                Vec::new()
            }
        }
    }

    /// Average daily precipitation of `stations` for `lookback_days` days ending on `last_day`.
    ///
    /// The result always has exactly one entry per day, oldest first. Station days that
    /// can't be fetched or have no precipitation total are skipped and days without any
    /// reporting station are zero.
    pub async fn fetch_history(
        &self,
        stations: &[Station],
        lookback_days: u32,
        last_day: NaiveDate,
    ) -> Vec<DailyPrecipitation> {
        self.fetch_history_counted(stations, lookback_days, last_day).await.0
    }

    /// Like `fetch_history` but also returns the number of station days that failed.
    async fn fetch_history_counted(
        &self,
        stations: &[Station],
        lookback_days: u32,
        last_day: NaiveDate,
    ) -> (Vec<DailyPrecipitation>, usize) {
        let days = history::lookback_days(last_day, lookback_days);
        let mut averages = BTreeMap::new();
        let mut failures = 0;

        for day in days.iter() {
            let mut values = Vec::with_capacity(stations.len());

            for station in stations {
                match self.client.daily_history(&station.id, *day).await {
                    Ok(observations) => {
                        self.metrics.upstream(Endpoint::History, Outcome::Success);
                        match history::station_day_max(&observations) {
                            Some(v) => values.push(v),
                            None => {
                                tracing::debug!(message = "no precipitation reported", station = %station.id, date = %day)
                            }
                        }
                    }
                    Err(e) => {
                        failures += 1;
                        self.metrics.upstream(Endpoint::History, Outcome::Failure);
                        tracing::warn!(
                            message = "skipping station history",
                            station = %station.id,
                            date = %day,
                            error = %e,
                        );
                    }
                }
            }

            if let Some(avg) = history::day_average(&values) {
                averages.insert(*day, avg);
            }
        }

        (history::fill_window(&days, &averages), failures)
    }

    /// Build a report for the request with a display window of `window_days` days.
    pub async fn report(
        &self,
        req: &LocationRequest,
        window_days: usize,
        mode: CumulativeMode,
    ) -> Result<Report, ReportError> {
        let lookback_days = self.settings.lookback_days;
        // Validate the window before making any upstream requests
        if window_days == 0 || window_days > lookback_days as usize {
            return Err(ReportError::Window(WindowError {
                requested: window_days,
                available: lookback_days as usize,
            }));
        }

        let stations = self
            .locate(&req.coordinate, self.settings.radius_miles, self.settings.max_stations)
            .await;
        if stations.is_empty() {
            tracing::info!(message = "no stations found", coordinate = %req.coordinate, radius_miles = self.settings.radius_miles);
        }

        let last_day = req.last_day();
        let history = match self.cache.get(&stations, last_day, lookback_days) {
            Some(h) => {
                self.metrics.cache_hit();
                tracing::debug!(message = "using cached station history", last_day = %last_day);
                h
            }
            None => {
                let (h, failures) = self.fetch_history_counted(&stations, lookback_days, last_day).await;
                // Partial history is only used for this report so a later request can retry
                if !stations.is_empty() && failures == 0 {
                    self.cache.insert(&stations, last_day, lookback_days, h.clone());
                } else if failures > 0 {
                    tracing::debug!(message = "not caching incomplete station history", failures = failures);
                }
                h
            }
        };

        let window = window::window_with(&history, window_days, mode)?;
        self.metrics.report(stations.len());
        tracing::info!(
            message = "generated report",
            coordinate = %req.coordinate,
            stations = stations.len(),
            window_days = window_days,
            total_inches = window.total_inches(),
        );

        Ok(Report {
            origin: req.coordinate,
            source: req.source,
            stations,
            history,
            window,
        })
    }
}

#[cfg(test)]
mod test {
    use super::{LocationRequest, LocationSource, Settings};
    use crate::geo::Coordinate;
    use chrono::{Local, NaiveDate, TimeZone};

    #[test]
    fn test_last_day_is_yesterday() {
        let coord = Coordinate::new(40.0, -75.0).unwrap();
        let ts = Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let req = LocationRequest::at(coord, LocationSource::Gps, ts);

        assert_eq!(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(), req.last_day());
    }

    #[test]
    fn test_settings_default() {
        let s = Settings::default();
        assert_eq!(1.0, s.radius_miles);
        assert_eq!(5, s.max_stations);
        assert_eq!(30, s.lookback_days);
    }
}
