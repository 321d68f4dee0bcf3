//! Skycast - weather forecasts with offline-friendly caching
//!
//! Composition root: builds the cache, warms it from disk, wires up the API
//! clients, then runs a single fetch and prints the result.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use skycast::cache::CacheManager;
use skycast::cli::Cli;
use skycast::data::{weather_code_to_condition, WeatherClient, WeatherData};
use skycast::fetch::WeatherService;
use skycast::geocode::GeocodeClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cache =
        CacheManager::new().ok_or("could not determine a cache directory for this platform")?;
    cache.preload().await;

    let service = WeatherService::new(WeatherClient::new()?, cache);
    let geocoder = GeocodeClient::new()?;

    let weather = service
        .fetch_weather(cli.latitude, cli.longitude, cli.refresh)
        .await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&weather)?);
        return Ok(());
    }

    let place = geocoder
        .reverse_geocode(cli.latitude, cli.longitude)
        .await
        .unwrap_or_else(|| format!("{:.2}, {:.2}", cli.latitude, cli.longitude));
    print_report(&place, &weather);

    Ok(())
}

/// Routes diagnostics to stderr so piped stdout stays clean.
///
/// `RUST_LOG` takes precedence; otherwise verbosity flags pick the level.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("skycast={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints a plain-text forecast report
fn print_report(place: &str, weather: &WeatherData) {
    let current = &weather.current;
    println!("Weather for {place}");
    println!(
        "  Now: {:.1}°C (feels like {:.1}°C), {}",
        current.temperature, current.feels_like, current.condition
    );
    println!(
        "  Humidity {}%, wind {:.0} km/h",
        current.humidity, current.wind_speed
    );

    if !weather.hourly.is_empty() {
        println!();
        println!("Next hours:");
        for hour in weather.hourly.iter().take(12) {
            println!(
                "  {}  {:>5.1}°C  {:>3}% precip  {}",
                hour.time.format("%H:%M"),
                hour.temperature,
                hour.precipitation_probability,
                weather_code_to_condition(hour.weather_code)
            );
        }
    }

    if !weather.daily.is_empty() {
        println!();
        println!("Daily forecast:");
        for day in &weather.daily {
            println!(
                "  {}  {:>5.1}°C / {:<5.1}°C  {:>3}% precip  {}",
                day.date.format("%a %b %d"),
                day.temperature_min,
                day.temperature_max,
                day.precipitation_probability,
                weather_code_to_condition(day.weather_code)
            );
        }
    }
}
