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

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Endpoint {
    Directory,
    History,
    Geocode,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct UpstreamLabels {
    endpoint: Endpoint,
    outcome: Outcome,
}

/// Holder for metrics about report generation and the upstream calls made for them.
///
/// All metrics are created and registered upon call to `RainMetrics::new()`. When the
/// registry is created with the "rain_gauge" prefix, all metrics share it.
#[derive(Debug, Clone, Default)]
pub struct RainMetrics {
    upstream_requests: Family<UpstreamLabels, Counter>,
    reports: Counter,
    history_cache_hits: Counter,
    stations_located: Gauge,
}

impl RainMetrics {
    /// Create a new `RainMetrics` and register each metric with the provided `Registry`.
    pub fn new(reg: &mut Registry) -> Self {
        let metrics = Self::default();

        reg.register(
            "upstream_requests",
            "Requests made to upstream weather and geocoding services",
            metrics.upstream_requests.clone(),
        );
        reg.register("reports", "Rainfall reports generated", metrics.reports.clone());
        reg.register(
            "history_cache_hits",
            "Reports that reused previously fetched station history",
            metrics.history_cache_hits.clone(),
        );
        reg.register(
            "stations_located",
            "Number of stations used for the most recent report",
            metrics.stations_located.clone(),
        );

        metrics
    }

    pub fn upstream(&self, endpoint: Endpoint, outcome: Outcome) {
        self.upstream_requests
            .get_or_create(&UpstreamLabels { endpoint, outcome })
            .inc();
    }

    pub fn report(&self, num_stations: usize) {
        self.reports.inc();
        self.stations_located.set(num_stations as i64);
    }

    pub fn cache_hit(&self) {
        self.history_cache_hits.inc();
    }
}
