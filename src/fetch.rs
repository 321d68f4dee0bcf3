//! Weather fetch orchestration
//!
//! Decides, per request, whether to trust the cache, bypass it (forced
//! refresh), or fall back to stale cache data when the network call fails.
//! Cache keys are derived from coordinates rounded to 2 decimal places so
//! near-duplicate locations share one slot.

use chrono::Duration;

use crate::cache::{coordinate_key, namespace, CacheManager};
use crate::data::{WeatherClient, WeatherData, WeatherError};

/// How long a cached forecast is considered fresh, in minutes
const WEATHER_TTL_MINUTES: i64 = 30;

/// TTL applied to weather cache entries on the normal read path.
pub fn weather_ttl() -> Duration {
    Duration::minutes(WEATHER_TTL_MINUTES)
}

/// Fetches weather through the two-tier cache.
///
/// Constructed explicitly and handed to whoever needs weather data; the
/// composition root owns the cache lifecycle and calls
/// [`CacheManager::preload`] once at startup.
#[derive(Debug, Clone)]
pub struct WeatherService {
    client: WeatherClient,
    cache: CacheManager,
}

impl WeatherService {
    /// Creates a new WeatherService over the given API client and cache
    pub fn new(client: WeatherClient, cache: CacheManager) -> Self {
        Self { client, cache }
    }

    /// Fetches weather data for the given coordinates.
    ///
    /// Unless `force_refresh` is set, a cache entry younger than the weather
    /// TTL is returned without touching the network. On a miss (or forced
    /// refresh) the API is queried with a bounded timeout; a successful
    /// result is written through the cache. If the network call fails, any
    /// cached entry for the key, fresh or stale, is served instead; the
    /// original network error propagates only when no entry exists at all.
    ///
    /// The network call is never retried within one invocation; recovery is
    /// the stale fallback or a later user-triggered refresh.
    ///
    /// # Errors
    /// Returns the underlying [`WeatherError`] when the fetch fails and no
    /// cached data is available for the location.
    pub async fn fetch_weather(
        &self,
        lat: f64,
        lon: f64,
        force_refresh: bool,
    ) -> Result<WeatherData, WeatherError> {
        let key = coordinate_key(namespace::WEATHER, lat, lon);

        if !force_refresh {
            if let Some(cached) = self.cache.get_if_valid::<WeatherData>(&key, weather_ttl()).await
            {
                tracing::debug!(%key, "serving weather from cache");
                return Ok(cached);
            }
        }

        match self.client.fetch_forecast(lat, lon).await {
            Ok(weather) => {
                tracing::debug!(%key, "fetched fresh weather from API");
                let _persist = self.cache.set(&key, &weather);
                Ok(weather)
            }
            Err(err) => match self.cache.get::<WeatherData>(&key).await {
                Some(stale) => {
                    tracing::warn!(%key, error = %err, "network fetch failed, serving stale cache entry");
                    Ok(stale)
                }
                None => {
                    tracing::warn!(%key, error = %err, "network fetch failed with no cached fallback");
                    Err(err)
                }
            },
        }
    }
}
