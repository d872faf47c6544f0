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

use clap::{Args, Parser, Subcommand};
use prometheus_client::registry::Registry;
use rain_gauge::client::WeatherComClient;
use rain_gauge::geo::Coordinate;
use rain_gauge::geocode::NominatimClient;
use rain_gauge::http::RequestContext;
use rain_gauge::metrics::RainMetrics;
use rain_gauge::report::{
    Aggregator, LocationRequest, LocationSource, Report, Settings, DEFAULT_LOOKBACK_DAYS, DEFAULT_MAX_STATIONS,
    DEFAULT_RADIUS_MILES, DEFAULT_WINDOW_DAYS,
};
use rain_gauge::window::CumulativeMode;
use reqwest::Client;
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{self, SignalKind};
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 9783);
const DEFAULT_TIMEOUT_MILLIS: u64 = 5000;
const DEFAULT_API_URL: &str = "https://api.weather.com/";
const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/";

#[derive(Debug, Parser)]
#[clap(name = "rain_gauge", version = clap::crate_version!())]
struct RainGaugeApplication {
    /// API key for api.weather.com
    #[clap(long, env = "WEATHER_COM_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Base URL for the api.weather.com API
    #[clap(long, default_value_t = DEFAULT_API_URL.into())]
    api_url: String,

    /// Base URL for the Nominatim API used to look up addresses
    #[clap(long, default_value_t = DEFAULT_GEOCODER_URL.into())]
    geocoder_url: String,

    /// Only use weather stations within this distance of the location, in miles.
    #[clap(long, default_value_t = DEFAULT_RADIUS_MILES, value_parser = parse_radius)]
    radius_miles: f64,

    /// Use at most this many weather stations, nearest first.
    #[clap(long, default_value_t = DEFAULT_MAX_STATIONS)]
    max_stations: usize,

    /// Number of days of history to fetch, ending yesterday.
    #[clap(long, default_value_t = DEFAULT_LOOKBACK_DAYS, value_parser = clap::value_parser!(u32).range(1..=366))]
    lookback_days: u32,

    /// Timeout for each request to upstream APIs, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a rainfall report for a single location and exit
    Report(ReportArgs),

    /// Serve rainfall reports as JSON along with Prometheus metrics
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
struct ReportArgs {
    /// Latitude of the location, in decimal degrees
    #[clap(long, allow_hyphen_values = true, requires = "lon", required_unless_present = "address")]
    lat: Option<f64>,

    /// Longitude of the location, in decimal degrees
    #[clap(long, allow_hyphen_values = true, requires = "lat")]
    lon: Option<f64>,

    /// Address or place name of the location. Takes precedence over coordinates.
    #[clap(long)]
    address: Option<String>,

    /// Number of most recent days to display.
    #[clap(long, default_value_t = DEFAULT_WINDOW_DAYS)]
    days: usize,

    /// How cumulative totals are computed: 'prefix', 'rolling', or 'rolling:N'
    #[clap(long, default_value_t = CumulativeMode::Prefix)]
    mode: CumulativeMode,

    /// Print the report as JSON instead of a table
    #[clap(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Address to bind to. By default, rain_gauge will bind to public address since
    /// reports and metrics are meant to be consumed by other systems.
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    bind: SocketAddr,
}

fn parse_radius(s: &str) -> Result<f64, String> {
    let radius = s.parse::<f64>().map_err(|e| e.to_string())?;
    if radius.is_finite() && radius >= 0.0 {
        Ok(radius)
    } else {
        Err(format!("radius must be a non-negative number of miles, got {}", s))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = RainGaugeApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .with_writer(io::stderr)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let timeout = Duration::from_millis(opts.timeout_millis);
    let http_client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let client = WeatherComClient::new(http_client.clone(), &opts.api_url, &opts.api_key).unwrap_or_else(|e| {
        tracing::error!(message = "invalid API URL", api_url = %opts.api_url, error = %e);
        process::exit(1)
    });

    let geocoder = NominatimClient::new(http_client, &opts.geocoder_url).unwrap_or_else(|e| {
        tracing::error!(message = "invalid geocoder URL", geocoder_url = %opts.geocoder_url, error = %e);
        process::exit(1)
    });

    let settings = Settings {
        radius_miles: opts.radius_miles,
        max_stations: opts.max_stations,
        lookback_days: opts.lookback_days,
    };

    let mut registry = Registry::with_prefix("rain_gauge");
    let metrics = RainMetrics::new(&mut registry);
    let aggregator = Aggregator::new(client, settings, metrics.clone());

    match opts.command {
        Command::Report(args) => run_report(&aggregator, &geocoder, args).await,
        Command::Serve(args) => {
            let context = Arc::new(RequestContext::new(registry, aggregator, geocoder, metrics));
            run_server(context, args, &opts.api_url).await
        }
    }
}

async fn run_report(
    aggregator: &Aggregator,
    geocoder: &NominatimClient,
    args: ReportArgs,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let req = match (&args.address, args.lat, args.lon) {
        (Some(address), _, _) => match geocoder.geocode(address).await {
            Ok(Some(coord)) => LocationRequest::new(coord, LocationSource::Address),
            Ok(None) => {
                tracing::error!(message = "could not geocode the provided address", address = %address);
                process::exit(1)
            }
            Err(e) => {
                tracing::error!(message = "geocoding failed", address = %address, error = %e);
                process::exit(1)
            }
        },
        (None, Some(lat), Some(lon)) => LocationRequest::new(Coordinate::new(lat, lon)?, LocationSource::Gps),
        _ => {
            tracing::error!("either --address or both --lat and --lon are required");
            process::exit(1)
        }
    };

    let report = aggregator.report(&req, args.days, args.mode).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &Report) {
    let origin = &report.origin;
    println!("Location: ({:.4}, {:.4})", origin.latitude(), origin.longitude());

    if report.is_empty() {
        println!("No weather stations found near this location.");
        return;
    }

    println!();
    println!("{:<16} {:<24} {:>10}", "Station", "Name", "Miles");
    for s in report.stations.iter() {
        println!("{:<16} {:<24} {:>10.2}", s.id, s.display_name, s.distance_miles);
    }

    println!();
    println!("{:<14} {:>14} {:>16}", "Date", "Precip [in]", "Cumulative [in]");
    for (day, cumulative) in report.window.days.iter().zip(report.window.cumulative.iter()) {
        println!(
            "{:<14} {:>14.2} {:>16.2}",
            day.date.format("%a %m-%d"),
            day.average_inches,
            cumulative
        );
    }
}

async fn run_server(
    context: Arc<RequestContext>,
    args: ServeArgs,
    api_url: &str,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = rain_gauge::http::router(context);
    let server = axum::Server::try_bind(&args.bind)
        .unwrap_or_else(|e| {
            tracing::error!(message = "error binding to address", address = %args.bind, error = %e);
            process::exit(1)
        })
        .serve(app.into_make_service());

    tracing::info!(message = "server started", address = %args.bind, api_url = %api_url);

    server
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        })
        .await?;

    tracing::info!("server shutdown");
    Ok(())
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
