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

//! Address to coordinate lookup using a Nominatim (OpenStreetMap) compatible API.

use crate::client::{parse_body, ClientError};
use crate::geo::Coordinate;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: Client,
    base_url: Url,
}

impl NominatimClient {
    // Nominatim usage policy requires an identifying user agent
    const USER_AGENT: &'static str = concat!("rain_gauge/", env!("CARGO_PKG_VERSION"));
    const JSON_RESPONSE: &'static str = "application/json";

    pub fn new(client: Client, base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|_| ClientError::InvalidUrl(base_url.to_owned()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        Ok(NominatimClient { client, base_url })
    }

    /// Resolve an address or place name to the coordinate of the best match.
    ///
    /// Returns `Ok(None)` when the service has no match for the address.
    pub async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, ClientError> {
        let request_url = self.search_url(address);
        tracing::debug!(message = "making geocoding request", address = %address);

        let res = self
            .client
            .get(request_url.clone())
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, Self::JSON_RESPONSE)
            .send()
            .await
            .map_err(ClientError::Internal)?;

        let status = res.status();
        if status != StatusCode::OK && status != StatusCode::NO_CONTENT {
            return Err(ClientError::Unexpected(status, request_url));
        }

        let places = parse_body::<Vec<Place>>(&request_url, res).await?.unwrap_or_default();
        match places.first() {
            Some(place) => place.coordinate(&request_url).map(Some),
            None => Ok(None),
        }
    }

    fn search_url(&self, address: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut p) = url.path_segments_mut() {
            p.pop_if_empty().push("search");
        }

        url.query_pairs_mut()
            .append_pair("q", address)
            .append_pair("format", "json")
            .append_pair("limit", "1");
        url
    }
}

/// Nominatim reports coordinates as strings.
#[derive(Deserialize, Debug)]
struct Place {
    lat: String,
    lon: String,
}

impl Place {
    fn coordinate(&self, url: &Url) -> Result<Coordinate, ClientError> {
        let malformed = |msg: String| ClientError::Malformed(url.clone(), msg);
        let lat = self
            .lat
            .parse::<f64>()
            .map_err(|e| malformed(format!("latitude {:?}: {}", self.lat, e)))?;
        let lon = self
            .lon
            .parse::<f64>()
            .map_err(|e| malformed(format!("longitude {:?}: {}", self.lon, e)))?;

        Coordinate::new(lat, lon).map_err(|e| malformed(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::NominatimClient;
    use crate::client::ClientError;
    use reqwest::Client;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_geocode_first_result() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "1600 Market St, Philadelphia"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"lat": "39.9526", "lon": "-75.1652", "display_name": "Philadelphia"},
                {"lat": "10.0", "lon": "10.0", "display_name": "Elsewhere"}
            ])))
            .mount(&mock_server)
            .await;

        let client = NominatimClient::new(Client::new(), &mock_server.uri()).unwrap();
        let coord = client.geocode("1600 Market St, Philadelphia").await.unwrap().unwrap();

        assert_eq!(39.9526, coord.latitude());
        assert_eq!(-75.1652, coord.longitude());
    }

    #[tokio::test]
    async fn test_geocode_no_match() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&mock_server)
            .await;

        let client = NominatimClient::new(Client::new(), &mock_server.uri()).unwrap();
        assert_eq!(None, client.geocode("nowhere at all").await.unwrap());
    }

    #[tokio::test]
    async fn test_geocode_bad_coordinates() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"lat": "north", "lon": "-75.0"}
            ])))
            .mount(&mock_server)
            .await;

        let client = NominatimClient::new(Client::new(), &mock_server.uri()).unwrap();
        let res = client.geocode("somewhere").await;
        assert!(matches!(res, Err(ClientError::Malformed(_, _))));
    }

    #[tokio::test]
    async fn test_geocode_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = NominatimClient::new(Client::new(), &mock_server.uri()).unwrap();
        let res = client.geocode("somewhere").await;
        assert!(matches!(res, Err(ClientError::Unexpected(_, _))));
    }
}
