//! LibreLinkUp glucose reader
//!
//! Logs into the LibreLinkUp follower service, follows its regional
//! redirect, and prints the current reading of the first linked patient as
//! one JSON object on stdout, for desktop shell widgets to display.
//!
//! Usage:
//!   libre-glucose              - Print the current reading
//!   libre-glucose watch [secs] - Print a reading every N seconds
//!   libre-glucose --help       - Show help
//!   LIBRE_GLUCOSE_DBG=1 libre-glucose - Enable debug output on stderr

mod client;
mod config;
mod error;
mod protocol;
mod reading;
mod regions;
mod session;
mod transport;
mod trend;
mod units;

use std::env;
use std::time::Duration;

use log::{info, warn};

use crate::client::{render, LibreClient};
use crate::config::{settings_file_path, Config, SETTINGS_ENV};
use crate::error::GlucoseError;
use crate::transport::HttpTransport;

const DEFAULT_WATCH_SECS: u64 = 60;
const MIN_WATCH_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<(), GlucoseError> {
    let args: Vec<String> = env::args().collect();

    // Logs go to stderr; stdout is reserved for the JSON result
    if env::var("LIBRE_GLUCOSE_DBG").is_ok() {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .init();
    }

    match args.get(1).map(|s| s.as_str()) {
        None | Some("fetch") => {
            let config = load_config()?;
            cmd_fetch(&config).await?;
        }
        Some("watch") => {
            let config = load_config()?;
            cmd_watch(&config, args.get(2)).await?;
        }
        Some("regions") => {
            cmd_show_regions();
        }
        Some("path") | Some("paths") => {
            println!("{}", settings_file_path().display());
        }
        Some("--help") | Some("-h") | Some("help") => {
            print_help();
        }
        Some("--version") | Some("-V") => {
            println!("libre-glucose {}", env!("CARGO_PKG_VERSION"));
        }
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(2);
        }
    }

    Ok(())
}

/// Print a failure for the widget before bailing out
fn reported<T>(result: Result<T, GlucoseError>) -> Result<T, GlucoseError> {
    result.inspect_err(|e| println!("{}", e.to_json()))
}

fn load_config() -> Result<Config, GlucoseError> {
    let path = settings_file_path();
    info!("Loading settings from {}", path.display());
    reported(Config::load(&path))
}

fn http_client() -> Result<LibreClient<HttpTransport>, GlucoseError> {
    reported(HttpTransport::new()).map(LibreClient::new)
}

/// Fetch one reading and print it
async fn cmd_fetch(config: &Config) -> Result<(), GlucoseError> {
    let client = http_client()?;
    print_reading(&client, config).await
}

/// Fetch a reading every `interval` seconds until interrupted
async fn cmd_watch(config: &Config, interval: Option<&String>) -> Result<(), GlucoseError> {
    let period = reported(watch_interval(interval.map(String::as_str)))?;
    let client = http_client()?;
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        print_reading(&client, config).await?;
    }
}

fn watch_interval(arg: Option<&str>) -> Result<Duration, GlucoseError> {
    let secs = match arg {
        Some(s) => s
            .parse::<u64>()
            .map_err(|_| GlucoseError::Config(format!("invalid interval '{}'", s)))?,
        None => DEFAULT_WATCH_SECS,
    };
    if secs < MIN_WATCH_SECS {
        warn!("Interval {}s too short, using {}s", secs, MIN_WATCH_SECS);
    }
    Ok(Duration::from_secs(secs.max(MIN_WATCH_SECS)))
}

async fn print_reading(client: &LibreClient<HttpTransport>, config: &Config) -> Result<(), GlucoseError> {
    let result = client.fetch_reading(config).await;
    match &result {
        Ok(reading) => info!("Reading {} {}", reading.display_value, reading.unit.label()),
        Err(e) => warn!("Fetch failed: {}", e),
    }
    println!("{}", render(&result)?);
    Ok(())
}

fn cmd_show_regions() {
    println!("Global:  {}", regions::DEFAULT_HOST);
    for (code, host) in regions::REGIONS {
        println!("  {:<5}  {}", code, host);
    }
}

fn print_help() {
    eprintln!("LibreLinkUp glucose reader v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  libre-glucose                Print the current reading as JSON");
    eprintln!("  libre-glucose watch [secs]   Print a reading every N seconds (default {})", DEFAULT_WATCH_SECS);
    eprintln!("  libre-glucose regions        List regional API hosts");
    eprintln!("  libre-glucose path           Show the settings file location");
    eprintln!("  libre-glucose help           Show this help");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("  LIBRE_GLUCOSE_DBG=1          Enable debug output");
    eprintln!("  {}       Use another settings file", SETTINGS_ENV);
    eprintln!();
    eprintln!("SETTINGS:");
    eprintln!("  {}", settings_file_path().display());
    eprintln!("  under \"libreGlucose\": username, password, glucoseUnit (mmol/L | mg/dL),");
    eprintln!("  lowThreshold, highThreshold (mmol/L), clientVersion, region");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_interval() {
        assert_eq!(watch_interval(None).unwrap(), Duration::from_secs(DEFAULT_WATCH_SECS));
        assert_eq!(watch_interval(Some("120")).unwrap(), Duration::from_secs(120));
        assert_eq!(watch_interval(Some("1")).unwrap(), Duration::from_secs(MIN_WATCH_SECS));
    }

    #[test]
    fn test_bad_watch_interval_is_reported() {
        let err = reported(watch_interval(Some("soon"))).unwrap_err();
        assert_eq!(
            err.to_json(),
            serde_json::json!({ "error": "Config load failed: invalid interval 'soon'" })
        );
    }

    #[test]
    fn test_reported_passes_values_through() {
        assert_eq!(reported(Ok::<_, GlucoseError>(7)).unwrap(), 7);
    }
}
