//! Command-line interface parsing for Skycast
//!
//! This module handles parsing of CLI arguments using clap, including
//! coordinate range validation and the --refresh flag that bypasses the
//! cache.

use clap::Parser;
use thiserror::Error;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// Latitude is outside the valid range
    #[error("Invalid latitude '{0}': must be a number between -90 and 90")]
    InvalidLatitude(String),

    /// Longitude is outside the valid range
    #[error("Invalid longitude '{0}': must be a number between -180 and 180")]
    InvalidLongitude(String),
}

/// Skycast - weather forecasts with offline-friendly caching
#[derive(Parser, Debug)]
#[command(name = "skycast")]
#[command(about = "Weather forecasts with offline-friendly caching")]
#[command(version)]
#[command(allow_negative_numbers = true)]
pub struct Cli {
    /// Latitude in decimal degrees (-90 to 90)
    #[arg(value_parser = parse_latitude)]
    pub latitude: f64,

    /// Longitude in decimal degrees (-180 to 180)
    #[arg(value_parser = parse_longitude)]
    pub longitude: f64,

    /// Bypass the cache and fetch fresh data from the API
    #[arg(long)]
    pub refresh: bool,

    /// Print the forecast as JSON instead of a text report
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parses and range-checks a latitude argument.
pub fn parse_latitude(s: &str) -> Result<f64, CliError> {
    let lat: f64 = s
        .parse()
        .map_err(|_| CliError::InvalidLatitude(s.to_string()))?;
    if !(-90.0..=90.0).contains(&lat) {
        return Err(CliError::InvalidLatitude(s.to_string()));
    }
    Ok(lat)
}

/// Parses and range-checks a longitude argument.
pub fn parse_longitude(s: &str) -> Result<f64, CliError> {
    let lon: f64 = s
        .parse()
        .map_err(|_| CliError::InvalidLongitude(s.to_string()))?;
    if !(-180.0..=180.0).contains(&lon) {
        return Err(CliError::InvalidLongitude(s.to_string()));
    }
    Ok(lon)
}
