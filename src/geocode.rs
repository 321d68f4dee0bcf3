//! Reverse geocoding: convert coordinates to human-readable place names.
//! Uses Nominatim (OpenStreetMap) - free, no API key required.
//!
//! Lookups are memoized in a process-lifetime, in-memory map keyed by rounded
//! coordinates. This cache is intentionally simpler than the main
//! [`crate::cache::CacheManager`]: no persistence, no TTL, no eviction. Place
//! names do not go stale and the working set is tiny, so folding them into the
//! main cache would impose policy they do not need.

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cache::{coordinate_key, namespace};

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "skycast/0.1.0 (https://github.com/skycast)";

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state_district: Option<String>,
    state: Option<String>,
    county: Option<String>,
    country: Option<String>,
}

/// Client for reverse geocoding coordinates into place names
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    client: Client,
    base_url: String,
    /// Memoized lookups, shared between clones, alive for the process lifetime
    memo: Arc<Mutex<HashMap<String, String>>>,
}

impl GeocodeClient {
    /// Creates a new GeocodeClient with the default Nominatim endpoint
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: NOMINATIM_URL.to_string(),
            memo: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Creates a new GeocodeClient with a custom base URL (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Reverse geocode coordinates to a place name (e.g. "Vancouver, British Columbia").
    ///
    /// Returns `None` on failure or timeout; the caller can fall back to
    /// showing raw coordinates. Results are memoized per rounded coordinate
    /// pair, so repeated lookups for nearby points cost one request.
    pub async fn reverse_geocode(&self, lat: f64, lon: f64) -> Option<String> {
        let memo_key = coordinate_key(namespace::LOCATION, lat, lon);
        if let Some(name) = self.memo.lock().unwrap().get(&memo_key).cloned() {
            return Some(name);
        }

        let name = self.lookup(lat, lon).await?;
        self.memo.lock().unwrap().insert(memo_key, name.clone());
        Some(name)
    }

    async fn lookup(&self, lat: f64, lon: f64) -> Option<String> {
        let url = format!(
            "{}?lat={}&lon={}&format=json&addressdetails=1&layer=address&zoom=10",
            self.base_url, lat, lon
        );

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Reverse geocode request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Reverse geocode returned status {}", response.status());
            return None;
        }

        let body: NominatimResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("Reverse geocode parse error: {}", e);
                return None;
            }
        };

        let addr = body.address?;

        // Capture state/country before the place chain consumes them
        let state = addr.state.clone();
        let country = addr.country.clone();

        // Prefer city > town > village > municipality for the primary place name
        let place = addr
            .city
            .or(addr.town)
            .or(addr.village)
            .or(addr.municipality)
            .or(addr.state_district)
            .or(addr.county)
            .or(addr.state)
            .or(addr.country)?;

        // Add state/country for disambiguation when different from place
        let suffix = state
            .as_ref()
            .filter(|s| !s.is_empty() && s.as_str() != place)
            .map(String::as_str)
            .or_else(|| {
                country
                    .as_ref()
                    .filter(|c| !c.is_empty() && c.as_str() != place)
                    .map(String::as_str)
            });

        let result = match suffix {
            Some(s) => format!("{}, {}", place, s),
            None => place,
        };

        tracing::debug!("Reverse geocoded to: {}", result);
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VANCOUVER_RESPONSE: &str = r#"{
        "display_name": "Vancouver, British Columbia, Canada",
        "address": {
            "city": "Vancouver",
            "state": "British Columbia",
            "country": "Canada"
        }
    }"#;

    fn client_for(server: &MockServer) -> GeocodeClient {
        GeocodeClient::new()
            .expect("Client should build")
            .with_base_url(format!("{}/reverse", server.uri()))
    }

    #[tokio::test]
    async fn test_reverse_geocode_builds_place_with_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(VANCOUVER_RESPONSE, "application/json"),
            )
            .mount(&server)
            .await;

        let name = client_for(&server).reverse_geocode(49.28, -123.12).await;
        assert_eq!(name.as_deref(), Some("Vancouver, British Columbia"));
    }

    #[tokio::test]
    async fn test_repeated_lookups_are_memoized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(VANCOUVER_RESPONSE, "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let first = client.reverse_geocode(49.28123, -123.12001).await;
        // Rounds to the same memo key, so the mock sees only one request
        let second = client.reverse_geocode(49.2810, -123.1203).await;

        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[tokio::test]
    async fn test_falls_back_through_address_chain() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"address": {"village": "Tofino", "country": "Canada"}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let name = client_for(&server).reverse_geocode(49.15, -125.90).await;
        assert_eq!(name.as_deref(), Some("Tofino, Canada"));
    }

    #[tokio::test]
    async fn test_error_status_returns_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let name = client_for(&server).reverse_geocode(49.28, -123.12).await;
        assert!(name.is_none());
    }

    #[tokio::test]
    async fn test_missing_address_returns_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
            .mount(&server)
            .await;

        let name = client_for(&server).reverse_geocode(0.0, 0.0).await;
        assert!(name.is_none());
    }
}
