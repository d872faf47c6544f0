//! Mock api.weather.com responses shared by the integration tests.

#![allow(dead_code)]

use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use rain_gauge::client::WeatherComClient;
use rain_gauge::metrics::RainMetrics;
use rain_gauge::report::{Aggregator, Settings};
use reqwest::Client;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "test-key";
pub const DIRECTORY_PATH: &str = "/v3/location/near";
pub const HISTORY_PATH: &str = "/v2/pws/history/all";

/// Directory response with three stations within five miles of (40.0, -75.0), listed out of
/// distance order, and one station about 35 miles away.
pub fn directory_json() -> serde_json::Value {
    serde_json::json!({
        "location": {
            "stationName": ["Far Away", null, "Closest", "Second"],
            "stationId": ["KPAFAR", "KPAC", "KPAA", "KPAB"],
            "latitude": [40.5, 40.03, 40.01, 40.0],
            "longitude": [-75.0, -75.0, -75.0, -75.02],
            "qcStatus": [1, 1, 1, 1]
        }
    })
}

pub fn history_json(station: &str, totals: &[Option<f64>]) -> serde_json::Value {
    let observations: Vec<serde_json::Value> = totals
        .iter()
        .map(|t| {
            serde_json::json!({
                "stationID": station,
                "obsTimeLocal": "2024-06-14 23:59:00",
                "imperial": {"precipTotal": t, "precipRate": 0.0}
            })
        })
        .collect();

    serde_json::json!({ "observations": observations })
}

pub async fn mount_directory(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(DIRECTORY_PATH))
        .and(query_param("product", "pws"))
        .and(query_param("apiKey", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Respond to every history request for `station` with the same observations.
pub async fn mount_history(server: &MockServer, station: &str, totals: &[Option<f64>]) {
    Mock::given(method("GET"))
        .and(path(HISTORY_PATH))
        .and(query_param("stationId", station))
        .and(query_param("units", "e"))
        .respond_with(ResponseTemplate::new(200).set_body_json(history_json(station, totals)))
        .mount(server)
        .await;
}

/// Respond to history requests for `station` on `date` (YYYYMMDD) with `template`, taking
/// precedence over any mock mounted with `mount_history`.
pub async fn mount_history_on(server: &MockServer, station: &str, date: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(HISTORY_PATH))
        .and(query_param("stationId", station))
        .and(query_param("date", date))
        .respond_with(template)
        .with_priority(1)
        .mount(server)
        .await;
}

/// The three stations in range: KPAA reports [0.1, 0.3], KPAB reports [0.2], and KPAC
/// has observations without any precipitation total.
pub async fn mount_standard_history(server: &MockServer) {
    mount_history(server, "KPAA", &[Some(0.1), Some(0.3)]).await;
    mount_history(server, "KPAB", &[Some(0.2)]).await;
    mount_history(server, "KPAC", &[None, None]).await;
}

pub fn aggregator(server: &MockServer, settings: Settings) -> (Aggregator, Registry) {
    let mut registry = Registry::with_prefix("rain_gauge");
    let metrics = RainMetrics::new(&mut registry);
    let client = WeatherComClient::new(Client::new(), &server.uri(), API_KEY).unwrap();
    (Aggregator::new(client, settings, metrics), registry)
}

/// Value of a single series, e.g. `rain_gauge_reports_total`, from the text exposition of
/// the registry. `None` if the series has never been recorded.
pub fn metric_value(registry: &Registry, series: &str) -> Option<u64> {
    let mut buf = String::new();
    encode(&mut buf, registry).unwrap();

    buf.lines()
        .filter_map(|line| line.strip_prefix(series))
        .filter_map(|rest| rest.strip_prefix(' '))
        .map(|value| value.parse().unwrap())
        .next()
}

pub fn upstream_series(endpoint: &str, outcome: &str) -> String {
    format!(
        "rain_gauge_upstream_requests_total{{endpoint=\"{}\",outcome=\"{}\"}}",
        endpoint, outcome
    )
}

pub fn five_mile_settings() -> Settings {
    Settings {
        radius_miles: 5.0,
        max_stations: 5,
        lookback_days: 30,
    }
}

pub fn assert_close(expected: f64, actual: f64) {
    assert!(
        (expected - actual).abs() < 1e-9,
        "expected {} but got {}",
        expected,
        actual
    );
}
