//! Open-Meteo weather API client
//!
//! This module fetches forecast data from the Open-Meteo API and parses it
//! into the normalized weather types in [`crate::data`]. Requests carry a
//! fixed timeout; a request that exceeds it is aborted and surfaces as a
//! network failure, which the fetch layer treats like any other.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use super::{CurrentConditions, DailyForecast, HourlyForecast, WeatherCondition, WeatherData};

/// Base URL for the Open-Meteo API
const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Hard timeout on every forecast request, in seconds
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Errors that can occur when fetching weather data
#[derive(Debug, Error)]
pub enum WeatherError {
    /// HTTP request failed, timed out, or returned a non-success status
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Missing expected field in response
    #[error("Missing expected field in response: {0}")]
    MissingField(String),

    /// Invalid time format in response
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),
}

/// Client for fetching weather data from the Open-Meteo API
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
}

impl WeatherClient {
    /// Create a new WeatherClient with the default endpoint and request
    /// timeout.
    pub fn new() -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: OPEN_METEO_BASE_URL.to_string(),
        })
    }

    /// Create a new WeatherClient with a custom base URL (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch a full forecast for the given coordinates: current conditions
    /// plus 48 hourly and 7 daily entries.
    ///
    /// # Returns
    /// * `Ok(WeatherData)` - Normalized forecast for the location
    /// * `Err(WeatherError)` - If the request, status check, or parsing fails
    pub async fn fetch_forecast(&self, lat: f64, lon: f64) -> Result<WeatherData, WeatherError> {
        let url = format!(
            "{}?latitude={}&longitude={}\
             &current=temperature_2m,relative_humidity_2m,apparent_temperature,weather_code,wind_speed_10m,wind_direction_10m\
             &hourly=temperature_2m,weather_code,precipitation_probability,wind_speed_10m&forecast_hours=48\
             &daily=temperature_2m_min,temperature_2m_max,weather_code,precipitation_probability_max,uv_index_max,sunrise,sunset&forecast_days=7\
             &timezone=auto",
            self.base_url, lat, lon
        );

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let text = response.text().await?;
        let api_response: OpenMeteoResponse = serde_json::from_str(&text)?;

        parse_response(api_response)
    }
}

/// Parse the Open-Meteo API response into a WeatherData struct
fn parse_response(response: OpenMeteoResponse) -> Result<WeatherData, WeatherError> {
    let current = CurrentConditions {
        temperature: response.current.temperature_2m,
        feels_like: response.current.apparent_temperature,
        condition: weather_code_to_condition(response.current.weather_code),
        humidity: response.current.relative_humidity_2m as u8,
        wind_speed: response.current.wind_speed_10m,
        wind_direction: response.current.wind_direction_10m,
    };

    let hourly = parse_hourly(&response.hourly)?;
    let daily = parse_daily(&response.daily)?;

    Ok(WeatherData {
        current,
        hourly,
        daily,
        fetched_at: Utc::now(),
    })
}

/// Parse hourly weather data arrays into HourlyForecast structs
fn parse_hourly(hourly: &HourlyWeather) -> Result<Vec<HourlyForecast>, WeatherError> {
    let len = hourly.time.len();

    // All hourly arrays must line up index-for-index
    if hourly.temperature_2m.len() != len
        || hourly.weather_code.len() != len
        || hourly.precipitation_probability.len() != len
        || hourly.wind_speed_10m.len() != len
    {
        return Err(WeatherError::MissingField(
            "hourly arrays have inconsistent lengths".to_string(),
        ));
    }

    let mut forecasts = Vec::with_capacity(len);
    for i in 0..len {
        forecasts.push(HourlyForecast {
            time: parse_datetime(&hourly.time[i])?,
            temperature: hourly.temperature_2m[i],
            weather_code: hourly.weather_code[i],
            precipitation_probability: hourly.precipitation_probability[i],
            wind_speed: hourly.wind_speed_10m[i],
        });
    }

    Ok(forecasts)
}

/// Parse daily weather data arrays into DailyForecast structs
fn parse_daily(daily: &DailyWeather) -> Result<Vec<DailyForecast>, WeatherError> {
    let len = daily.time.len();

    if daily.temperature_2m_min.len() != len
        || daily.temperature_2m_max.len() != len
        || daily.weather_code.len() != len
        || daily.precipitation_probability_max.len() != len
        || daily.uv_index_max.len() != len
        || daily.sunrise.len() != len
        || daily.sunset.len() != len
    {
        return Err(WeatherError::MissingField(
            "daily arrays have inconsistent lengths".to_string(),
        ));
    }

    let mut forecasts = Vec::with_capacity(len);
    for i in 0..len {
        forecasts.push(DailyForecast {
            date: parse_date(&daily.time[i])?,
            temperature_min: daily.temperature_2m_min[i],
            temperature_max: daily.temperature_2m_max[i],
            weather_code: daily.weather_code[i],
            precipitation_probability: daily.precipitation_probability_max[i],
            uv_index_max: daily.uv_index_max[i],
            sunrise: parse_time(&daily.sunrise[i])?,
            sunset: parse_time(&daily.sunset[i])?,
        });
    }

    Ok(forecasts)
}

/// Parse a datetime string in ISO 8601 format (e.g., "2026-08-30T05:30") to NaiveDateTime
fn parse_datetime(datetime_str: &str) -> Result<NaiveDateTime, WeatherError> {
    NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%dT%H:%M")
        .map_err(|_| WeatherError::InvalidTimeFormat(datetime_str.to_string()))
}

/// Parse a date string in ISO 8601 format (e.g., "2026-08-30") to NaiveDate
fn parse_date(date_str: &str) -> Result<NaiveDate, WeatherError> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| WeatherError::InvalidTimeFormat(date_str.to_string()))
}

/// Parse a time string in ISO 8601 format (e.g., "2026-08-30T05:30") to NaiveTime
fn parse_time(time_str: &str) -> Result<NaiveTime, WeatherError> {
    // Extract the time portion after 'T'
    let time_part = time_str
        .split('T')
        .nth(1)
        .ok_or_else(|| WeatherError::InvalidTimeFormat(time_str.to_string()))?;

    NaiveTime::parse_from_str(time_part, "%H:%M")
        .map_err(|_| WeatherError::InvalidTimeFormat(time_str.to_string()))
}

/// Map WMO weather code to WeatherCondition enum
///
/// Weather codes from WMO (World Meteorological Organization):
/// - 0: Clear sky
/// - 1-3: Partly cloudy
/// - 45, 48: Fog
/// - 51-55: Drizzle
/// - 56-57: Freezing drizzle
/// - 61-65: Rain
/// - 66-67: Freezing rain
/// - 71-77: Snow
/// - 80-82: Rain showers
/// - 85-86: Snow showers
/// - 95-99: Thunderstorm
pub fn weather_code_to_condition(code: u8) -> WeatherCondition {
    match code {
        0 => WeatherCondition::Clear,
        1..=3 => WeatherCondition::PartlyCloudy,
        45 | 48 => WeatherCondition::Fog,
        51..=55 | 61..=65 | 80..=82 => WeatherCondition::Rain,
        56..=57 | 66..=67 => WeatherCondition::Showers,
        71..=77 | 85..=86 => WeatherCondition::Snow,
        95..=99 => WeatherCondition::Thunderstorm,
        _ => WeatherCondition::Cloudy, // Default for unknown codes
    }
}

/// Open-Meteo API response structure
#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    current: CurrentWeather,
    hourly: HourlyWeather,
    daily: DailyWeather,
}

/// Current weather data from Open-Meteo
#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    apparent_temperature: f64,
    weather_code: u8,
    wind_speed_10m: f64,
    wind_direction_10m: f64,
}

/// Hourly weather data from Open-Meteo
#[derive(Debug, Deserialize)]
struct HourlyWeather {
    time: Vec<String>,
    temperature_2m: Vec<f64>,
    weather_code: Vec<u8>,
    precipitation_probability: Vec<u8>,
    wind_speed_10m: Vec<f64>,
}

/// Daily weather data from Open-Meteo
#[derive(Debug, Deserialize)]
struct DailyWeather {
    time: Vec<String>,
    temperature_2m_min: Vec<f64>,
    temperature_2m_max: Vec<f64>,
    weather_code: Vec<u8>,
    precipitation_probability_max: Vec<u8>,
    uv_index_max: Vec<f64>,
    sunrise: Vec<String>,
    sunset: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Sample valid Open-Meteo API response
    const VALID_RESPONSE: &str = r#"{
        "latitude": 49.28,
        "longitude": -123.12,
        "generationtime_ms": 0.123,
        "utc_offset_seconds": -25200,
        "timezone": "America/Vancouver",
        "timezone_abbreviation": "PDT",
        "elevation": 5.0,
        "current": {
            "time": "2026-08-30T12:00",
            "interval": 900,
            "temperature_2m": 18.5,
            "relative_humidity_2m": 65.0,
            "apparent_temperature": 17.2,
            "weather_code": 2,
            "wind_speed_10m": 12.3,
            "wind_direction_10m": 270.0
        },
        "hourly": {
            "time": ["2026-08-30T12:00", "2026-08-30T13:00", "2026-08-30T14:00"],
            "temperature_2m": [18.5, 19.1, 19.6],
            "weather_code": [2, 3, 61],
            "precipitation_probability": [5, 10, 55],
            "wind_speed_10m": [12.3, 13.0, 14.2]
        },
        "daily": {
            "time": ["2026-08-30", "2026-08-31"],
            "temperature_2m_min": [13.0, 12.4],
            "temperature_2m_max": [21.2, 20.1],
            "weather_code": [2, 61],
            "precipitation_probability_max": [20, 70],
            "uv_index_max": [5.5, 4.0],
            "sunrise": ["2026-08-30T06:24", "2026-08-31T06:25"],
            "sunset": ["2026-08-30T20:03", "2026-08-31T20:01"]
        }
    }"#;

    #[test]
    fn test_parse_valid_response() {
        let response: OpenMeteoResponse = serde_json::from_str(VALID_RESPONSE).unwrap();
        let weather = parse_response(response).expect("Should parse valid response");

        assert!((weather.current.temperature - 18.5).abs() < 0.01);
        assert!((weather.current.feels_like - 17.2).abs() < 0.01);
        assert_eq!(weather.current.humidity, 65);
        assert_eq!(weather.current.condition, WeatherCondition::PartlyCloudy);

        assert_eq!(weather.hourly.len(), 3);
        assert_eq!(weather.hourly[2].weather_code, 61);
        assert_eq!(weather.hourly[2].precipitation_probability, 55);

        assert_eq!(weather.daily.len(), 2);
        assert_eq!(
            weather.daily[0].date,
            NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
        );
        assert_eq!(
            weather.daily[0].sunrise,
            NaiveTime::from_hms_opt(6, 24, 0).unwrap()
        );
        assert_eq!(weather.daily[1].precipitation_probability, 70);
    }

    #[test]
    fn test_parse_rejects_inconsistent_hourly_lengths() {
        let mut response: OpenMeteoResponse = serde_json::from_str(VALID_RESPONSE).unwrap();
        response.hourly.temperature_2m.pop();

        let result = parse_response(response);
        assert!(matches!(result, Err(WeatherError::MissingField(_))));
    }

    #[test]
    fn test_parse_rejects_inconsistent_daily_lengths() {
        let mut response: OpenMeteoResponse = serde_json::from_str(VALID_RESPONSE).unwrap();
        response.daily.sunrise.pop();

        let result = parse_response(response);
        assert!(matches!(result, Err(WeatherError::MissingField(_))));
    }

    #[test]
    fn test_parse_datetime_valid() {
        let dt = parse_datetime("2026-08-30T05:30").unwrap();
        assert_eq!(
            dt,
            NaiveDate::from_ymd_opt(2026, 8, 30)
                .unwrap()
                .and_hms_opt(5, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_time_rejects_missing_time_part() {
        let result = parse_time("2026-08-30");
        assert!(matches!(result, Err(WeatherError::InvalidTimeFormat(_))));
    }

    #[test]
    fn test_weather_code_mapping() {
        assert_eq!(weather_code_to_condition(0), WeatherCondition::Clear);
        assert_eq!(weather_code_to_condition(2), WeatherCondition::PartlyCloudy);
        assert_eq!(weather_code_to_condition(45), WeatherCondition::Fog);
        assert_eq!(weather_code_to_condition(63), WeatherCondition::Rain);
        assert_eq!(weather_code_to_condition(66), WeatherCondition::Showers);
        assert_eq!(weather_code_to_condition(73), WeatherCondition::Snow);
        assert_eq!(weather_code_to_condition(95), WeatherCondition::Thunderstorm);
        assert_eq!(weather_code_to_condition(40), WeatherCondition::Cloudy);
    }

    #[tokio::test]
    async fn test_fetch_forecast_from_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(VALID_RESPONSE, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let client = WeatherClient::new()
            .unwrap()
            .with_base_url(format!("{}/v1/forecast", server.uri()));

        let weather = client.fetch_forecast(49.28, -123.12).await.unwrap();
        assert_eq!(weather.hourly.len(), 3);
        assert_eq!(weather.daily.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_forecast_surfaces_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = WeatherClient::new()
            .unwrap()
            .with_base_url(format!("{}/v1/forecast", server.uri()));

        let result = client.fetch_forecast(49.28, -123.12).await;
        assert!(matches!(result, Err(WeatherError::RequestFailed(_))));
    }
}
