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
use chrono::NaiveDate;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::error;
use std::fmt;

#[derive(Debug)]
pub enum ClientError {
    Internal(reqwest::Error),
    InvalidUrl(String),
    Unexpected(StatusCode, Url),
    Malformed(Url, String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(e) => write!(f, "{}", e),
            Self::InvalidUrl(s) => write!(f, "invalid base URL {}", s),
            Self::Unexpected(status, url) => write!(f, "unexpected status {} for {}", status, url),
            Self::Malformed(url, msg) => write!(f, "malformed response for {}: {}", url, msg),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Internal(e) => Some(e),
            _ => None,
        }
    }
}

/// Client for the station directory and daily history endpoints of api.weather.com
#[derive(Debug, Clone)]
pub struct WeatherComClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl WeatherComClient {
    const USER_AGENT: &'static str = concat!("rain_gauge/", env!("CARGO_PKG_VERSION"));
    const JSON_RESPONSE: &'static str = "application/json";
    const PRODUCT_PWS: &'static str = "pws";
    const UNITS_IMPERIAL: &'static str = "e";
    const DATE_FORMAT: &'static str = "%Y%m%d";

    pub fn new(client: Client, base_url: &str, api_key: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|_| ClientError::InvalidUrl(base_url.to_owned()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        Ok(WeatherComClient {
            client,
            base_url,
            api_key: api_key.to_owned(),
        })
    }

    /// Fetch personal weather stations the directory considers "near" the coordinate.
    ///
    /// The directory decides what counts as near, callers are expected to do their own
    /// distance filtering. An empty response body results in no stations.
    pub async fn nearby_stations(&self, coord: &Coordinate) -> Result<Vec<StationLocation>, ClientError> {
        let request_url = self.near_url(coord);
        tracing::debug!(message = "making station directory request", coordinate = %coord);

        let res = self.make_request(request_url.clone()).await?;
        match parse_body::<NearResponse>(&request_url, res).await? {
            Some(near) => near.location.into_stations(&request_url),
            None => Ok(Vec::new()),
        }
    }

    /// Fetch every observation a station recorded on a particular calendar day.
    ///
    /// Stations without data for the day are reported by the API as an empty body which
    /// results in no observations rather than an error.
    pub async fn daily_history(&self, station: &str, date: NaiveDate) -> Result<Vec<HistoryObservation>, ClientError> {
        let request_url = self.history_url(station, date);
        tracing::debug!(message = "making daily history request", station = %station, date = %date);

        let res = self.make_request(request_url.clone()).await?;
        Ok(parse_body::<HistoryResponse>(&request_url, res)
            .await?
            .map(|h| h.observations)
            .unwrap_or_default())
    }

    async fn make_request(&self, url: Url) -> Result<Response, ClientError> {
        let res = self
            .client
            .get(url.clone())
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, Self::JSON_RESPONSE)
            .send()
            .await
            .map_err(ClientError::Internal)?;

        let status = res.status();
        if status == StatusCode::OK || status == StatusCode::NO_CONTENT {
            Ok(res)
        } else {
            Err(ClientError::Unexpected(status, url))
        }
    }

    fn near_url(&self, coord: &Coordinate) -> Url {
        let mut url = self.endpoint_url(&["v3", "location", "near"]);
        // The geocode parameter is sent with a literal comma which the form encoder
        // used by `query_pairs_mut` would escape.
        url.set_query(Some(&format!(
            "geocode={},{}&product={}&format=json&apiKey={}",
            coord.latitude(),
            coord.longitude(),
            Self::PRODUCT_PWS,
            utf8_percent_encode(&self.api_key, NON_ALPHANUMERIC),
        )));

        url
    }

    fn history_url(&self, station: &str, date: NaiveDate) -> Url {
        let mut url = self.endpoint_url(&["v2", "pws", "history", "all"]);
        url.query_pairs_mut()
            .append_pair("stationId", station)
            .append_pair("date", &date.format(Self::DATE_FORMAT).to_string())
            .append_pair("format", "json")
            .append_pair("units", Self::UNITS_IMPERIAL)
            .append_pair("apiKey", &self.api_key);

        url
    }

    fn endpoint_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Can't fail: base URLs that cannot be a base are rejected in `new()`
        if let Ok(mut p) = url.path_segments_mut() {
            p.pop_if_empty().extend(segments);
        }

        url
    }
}

/// Parse a JSON body, returning `None` when the server sent nothing at all.
pub(crate) async fn parse_body<T: DeserializeOwned>(url: &Url, res: Response) -> Result<Option<T>, ClientError> {
    if res.status() == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    let body = res.bytes().await.map_err(ClientError::Internal)?;
    if body.is_empty() {
        return Ok(None);
    }

    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| ClientError::Malformed(url.clone(), e.to_string()))
}

/// A station as reported by the directory, before any distance filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct StationLocation {
    pub id: String,
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize, Debug)]
struct NearResponse {
    location: NearLocations,
}

/// The directory reports stations as parallel arrays, one entry per station.
#[derive(Deserialize, Debug)]
struct NearLocations {
    #[serde(alias = "stationId")]
    station_id: Vec<String>,
    #[serde(alias = "stationName")]
    station_name: Option<Vec<Option<String>>>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
}

impl NearLocations {
    fn into_stations(self, url: &Url) -> Result<Vec<StationLocation>, ClientError> {
        let len = self.station_id.len();
        let names_len = self.station_name.as_ref().map(|n| n.len()).unwrap_or(len);
        if self.latitude.len() != len || self.longitude.len() != len || names_len != len {
            return Err(ClientError::Malformed(
                url.clone(),
                format!(
                    "mismatched station arrays: {} ids, {} latitudes, {} longitudes, {} names",
                    len,
                    self.latitude.len(),
                    self.longitude.len(),
                    names_len
                ),
            ));
        }

        let mut names = self.station_name.unwrap_or_else(|| vec![None; len]).into_iter();
        Ok(self
            .station_id
            .into_iter()
            .zip(self.latitude)
            .zip(self.longitude)
            .map(|((id, latitude), longitude)| StationLocation {
                id,
                name: names.next().flatten(),
                latitude,
                longitude,
            })
            .collect())
    }
}

#[derive(Deserialize, Debug)]
struct HistoryResponse {
    #[serde(default)]
    observations: Vec<HistoryObservation>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryObservation {
    #[serde(alias = "stationID")]
    pub station_id: Option<String>,
    #[serde(alias = "obsTimeLocal")]
    pub obs_time_local: Option<String>,
    pub imperial: Option<ImperialReadings>,
}

impl HistoryObservation {
    /// Precipitation accumulated so far that day in inches, if reported
    pub fn precip_total(&self) -> Option<f64> {
        self.imperial.as_ref().and_then(|i| i.precip_total)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ImperialReadings {
    #[serde(alias = "precipTotal")]
    pub precip_total: Option<f64>,
    #[serde(alias = "precipRate")]
    pub precip_rate: Option<f64>,
}
