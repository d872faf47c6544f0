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

//! Local rainfall tracker built on nearby personal weather stations
//!
//! ## Features
//!
//! `rain_gauge` estimates how much rain fell at a location over the last month. It finds
//! personal weather stations near a coordinate or address using the api.weather.com
//! station directory, fetches the daily history of each station, and averages the
//! precipitation totals across stations for each day.
//!
//! * Stations are limited to those within a radius (1 mile by default) and the nearest
//!   five are used.
//! * History covers the 30 days ending yesterday. Today is never included since its
//!   totals are still accumulating.
//! * The reported value for a station on a day is the highest precipitation total any of
//!   its observations that day included. Days where no station reported anything are zero.
//! * A display window of the most recent days (7 by default) is reported along with a
//!   cumulative total for each day in it.
//!
//! ## Build
//!
//! `rain_gauge` is a Rust program and must be built from source using a [Rust toolchain](https://rustup.rs/).
//!
//! ```text
//! cargo build --release
//! ```
//!
//! ## Usage
//!
//! An API key for api.weather.com is required. It can be passed with `--api-key` or the
//! `WEATHER_COM_API_KEY` environment variable.
//!
//! ### Single report
//!
//! ```text
//! ./rain_gauge report --lat 40.0 --lon -75.0 --days 7
//! ./rain_gauge report --address "Philadelphia, PA" --mode rolling
//! ```
//!
//! ### Server
//!
//! ```text
//! ./rain_gauge serve --bind 0.0.0.0:9783
//! curl -sS 'http://localhost:9783/report?lat=40.0&lon=-75.0&days=14' | jq
//! ```
//!
//! Prometheus metrics about upstream requests and generated reports are exposed at
//! `/metrics`.
//!

pub mod cache;
pub mod client;
pub mod geo;
pub mod geocode;
pub mod history;
pub mod http;
pub mod locator;
pub mod metrics;
pub mod report;
pub mod window;
