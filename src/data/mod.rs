//! Core data models for Skycast
//!
//! This module contains the normalized weather types produced by the
//! Open-Meteo client and cached by the rest of the application.

pub mod weather;

pub use weather::{weather_code_to_condition, WeatherClient, WeatherError};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Complete weather result for one location: current conditions plus hourly
/// and daily forecast series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    /// Current conditions at the requested coordinates
    pub current: CurrentConditions,
    /// Hourly forecasts for the next 48 hours
    pub hourly: Vec<HourlyForecast>,
    /// Daily forecasts for the next 7 days
    pub daily: Vec<DailyForecast>,
    /// When this data was fetched from the API
    pub fetched_at: DateTime<Utc>,
}

/// Current weather conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Temperature in Celsius
    pub temperature: f64,
    /// Feels-like temperature in Celsius
    pub feels_like: f64,
    /// Current weather condition
    pub condition: WeatherCondition,
    /// Relative humidity percentage (0-100)
    pub humidity: u8,
    /// Wind speed in km/h
    pub wind_speed: f64,
    /// Wind direction in degrees
    pub wind_direction: f64,
}

/// Weather forecast for a single hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    /// Time of the forecast
    pub time: NaiveDateTime,
    /// Temperature in Celsius
    pub temperature: f64,
    /// WMO weather code
    pub weather_code: u8,
    /// Precipitation probability percentage (0-100)
    pub precipitation_probability: u8,
    /// Wind speed in km/h
    pub wind_speed: f64,
}

/// Weather forecast for a single day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// Date of the forecast
    pub date: NaiveDate,
    /// Minimum temperature in Celsius
    pub temperature_min: f64,
    /// Maximum temperature in Celsius
    pub temperature_max: f64,
    /// WMO weather code
    pub weather_code: u8,
    /// Maximum precipitation probability percentage (0-100)
    pub precipitation_probability: u8,
    /// Maximum UV index for the day
    pub uv_index_max: f64,
    /// Sunrise time
    pub sunrise: NaiveTime,
    /// Sunset time
    pub sunset: NaiveTime,
}

/// Types of weather conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Rain,
    Showers,
    Thunderstorm,
    Snow,
    Fog,
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WeatherCondition::Clear => "Clear",
            WeatherCondition::PartlyCloudy => "Partly cloudy",
            WeatherCondition::Cloudy => "Cloudy",
            WeatherCondition::Rain => "Rain",
            WeatherCondition::Showers => "Showers",
            WeatherCondition::Thunderstorm => "Thunderstorm",
            WeatherCondition::Snow => "Snow",
            WeatherCondition::Fog => "Fog",
        };
        write!(f, "{label}")
    }
}
