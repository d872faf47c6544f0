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

use crate::geo::Coordinate;
use crate::geocode::NominatimClient;
use crate::metrics::{Endpoint, Outcome, RainMetrics};
use crate::report::{Aggregator, LocationRequest, LocationSource, DEFAULT_WINDOW_DAYS};
use crate::window::CumulativeMode;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const OPENMETRICS_FORMAT: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// State shared by all HTTP handlers.
#[derive(Debug)]
pub struct RequestContext {
    registry: Registry,
    aggregator: Aggregator,
    geocoder: NominatimClient,
    metrics: RainMetrics,
}

impl RequestContext {
    pub fn new(registry: Registry, aggregator: Aggregator, geocoder: NominatimClient, metrics: RainMetrics) -> Self {
        RequestContext {
            registry,
            aggregator,
            geocoder,
            metrics,
        }
    }

    /// Turn report parameters into a request, preferring an address over coordinates.
    async fn location(&self, params: &ReportParams) -> Result<LocationRequest, (StatusCode, String)> {
        if let Some(address) = params.address.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            return match self.geocoder.geocode(address).await {
                Ok(Some(coord)) => {
                    self.metrics.upstream(Endpoint::Geocode, Outcome::Success);
                    Ok(LocationRequest::new(coord, LocationSource::Address))
                }
                Ok(None) => {
                    self.metrics.upstream(Endpoint::Geocode, Outcome::Success);
                    Err((StatusCode::NOT_FOUND, format!("could not geocode address {:?}", address)))
                }
                Err(e) => {
                    self.metrics.upstream(Endpoint::Geocode, Outcome::Failure);
                    tracing::warn!(message = "geocoding failed", address = %address, error = %e);
                    Err((StatusCode::BAD_GATEWAY, format!("geocoding failed: {}", e)))
                }
            };
        }

        match (params.lat, params.lon) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon)
                .map(|coord| LocationRequest::new(coord, LocationSource::Gps))
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string())),
            _ => Err((
                StatusCode::BAD_REQUEST,
                "either address or both lat and lon are required".to_owned(),
            )),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub address: Option<String>,
    pub days: Option<usize>,
    pub mode: Option<String>,
}

/// Build the router for rainfall reports and Prometheus metrics.
pub fn router(context: Arc<RequestContext>) -> Router {
    Router::new()
        .route("/report", get(report))
        .route("/metrics", get(text_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}

async fn report(State(context): State<Arc<RequestContext>>, Query(params): Query<ReportParams>) -> Response {
    let mode = match params.mode.as_deref().map(str::parse::<CumulativeMode>).transpose() {
        Ok(m) => m.unwrap_or_default(),
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let req = match context.location(&params).await {
        Ok(r) => r,
        Err((status, msg)) => return error_response(status, msg),
    };

    let days = params.days.unwrap_or(DEFAULT_WINDOW_DAYS);
    match context.aggregator.report(&req, days, mode).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn text_metrics(State(context): State<Arc<RequestContext>>) -> Response {
    let mut buf = String::new();

    match encode(&mut buf, &context.registry) {
        Ok(_) => {
            tracing::debug!(message = "encoded prometheus metrics to text format", num_bytes = buf.len());
            ([(CONTENT_TYPE, OPENMETRICS_FORMAT)], buf).into_response()
        }
        Err(e) => {
            tracing::error!(message = "error encoding metrics", error = %e);
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

fn error_response(status: StatusCode, msg: String) -> Response {
    (status, Json(serde_json::json!({ "error": msg }))).into_response()
}
