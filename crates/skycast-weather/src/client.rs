//! HTTP client for the weather API.
//!
//! All endpoints live under a single configurable base URL. Response
//! payload shapes are owned by the backend; parsing here is deliberately
//! lenient - missing series arrays become empty vectors, not errors.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use skycast_core::error::{FetchError, ReqwestErrorExt};
use skycast_core::resilient::{send_with_retry, RetryPolicy};

use crate::types::{DailyPoint, Forecast, HourlyPoint, WeatherSnapshot};

const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "skycast/0.1";

/// Minimum query length before a city search hits the network.
const MIN_SEARCH_LEN: usize = 3;

/// A city search candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct CityMatch {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Preset cities offered when a search yields nothing.
pub fn popular_cities() -> Vec<CityMatch> {
    [
        ("New York", "USA", 40.71, -74.01),
        ("London", "UK", 51.51, -0.13),
        ("Tokyo", "Japan", 35.69, 139.69),
        ("Sydney", "Australia", -33.87, 151.21),
    ]
    .into_iter()
    .map(|(name, country, latitude, longitude)| CityMatch {
        id: None,
        name: name.to_string(),
        country: Some(country.to_string()),
        latitude,
        longitude,
    })
    .collect()
}

/// A reverse-geocode candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceMatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub admin1: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultsEnvelope<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    city: String,
    temperature: Option<f64>,
    humidity: Option<f64>,
    rainfall: Option<f64>,
    wind_speed: Option<f64>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    code: i32,
    #[serde(default)]
    hourly: HourlyBlock,
    #[serde(default)]
    daily: DailyBlock,
    #[serde(default)]
    timestamp: String,
}

/// Open-Meteo style parallel arrays.
#[derive(Debug, Default, Deserialize)]
struct HourlyBlock {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<f64>,
    #[serde(default)]
    rain: Vec<f64>,
    #[serde(default)]
    weather_code: Vec<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct DailyBlock {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_max: Vec<f64>,
    #[serde(default)]
    temperature_2m_min: Vec<f64>,
    #[serde(default)]
    weather_code: Vec<i32>,
    #[serde(default)]
    precipitation_sum: Vec<f64>,
    #[serde(default)]
    precipitation_probability_max: Vec<f64>,
    #[serde(default)]
    windspeed_10m_max: Vec<f64>,
    #[serde(default)]
    sunrise: Vec<String>,
    #[serde(default)]
    sunset: Vec<String>,
    #[serde(default)]
    uv_index_max: Vec<f64>,
}

/// Weather API client
#[derive(Debug, Clone)]
pub struct WeatherApi {
    base_url: Url,
    client: Arc<Client>,
    policy: RetryPolicy,
}

impl WeatherApi {
    /// Create a new client against the given base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_policy(base_url, RetryPolicy::default())
    }

    /// Create a client with a custom retry policy (used by tests and
    /// read-only diagnostic callers).
    pub fn with_policy(base_url: &str, policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API base URL")?;

        Ok(Self {
            base_url,
            client: Arc::new(client),
            policy,
        })
    }

    /// Replace the retry policy, e.g. for callers that degrade on failure
    /// instead of retrying.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path)
            .map_err(|e| FetchError::InvalidResponse(format!("invalid endpoint {path}: {e}")))
    }

    /// Fetch current weather plus embedded hourly/daily series.
    pub async fn current(
        &self,
        latitude: f64,
        longitude: f64,
        city: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(WeatherSnapshot, Forecast), FetchError> {
        tracing::debug!("Fetching current weather for {latitude}, {longitude}");

        let mut url = self.endpoint("api/current/")?;
        url.query_pairs_mut()
            .append_pair("lat", &latitude.to_string())
            .append_pair("lon", &longitude.to_string());
        if let Some(city) = city {
            url.query_pairs_mut().append_pair("city", city);
        }

        let response = send_with_retry(&self.policy, cancel, || {
            self.client.get(url.clone()).send()
        })
        .await?;

        let body: CurrentResponse = response
            .json()
            .await
            .map_err(|e| e.into_fetch_error())?;

        Ok(convert_current(body))
    }

    /// Search for cities by name. Queries shorter than three characters
    /// return no results without touching the network.
    pub async fn search_city(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CityMatch>, FetchError> {
        if name.chars().count() < MIN_SEARCH_LEN {
            return Ok(Vec::new());
        }

        let mut url = self.endpoint("api/search-city/")?;
        url.query_pairs_mut().append_pair("name", name);

        let response = send_with_retry(&self.policy, cancel, || {
            self.client.get(url.clone()).send()
        })
        .await?;

        let body: ResultsEnvelope<CityMatch> = response
            .json()
            .await
            .map_err(|e| e.into_fetch_error())?;

        tracing::debug!("City search '{}' returned {} results", name, body.results.len());
        Ok(body.results)
    }

    /// Reverse geocode coordinates to place candidates.
    pub async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
        cancel: &CancellationToken,
    ) -> Result<Option<PlaceMatch>, FetchError> {
        let mut url = self.endpoint("api/reverse-geocode/")?;
        url.query_pairs_mut()
            .append_pair("latitude", &latitude.to_string())
            .append_pair("longitude", &longitude.to_string());

        let response = send_with_retry(&self.policy, cancel, || {
            self.client.get(url.clone()).send()
        })
        .await?;

        let body: ResultsEnvelope<PlaceMatch> = response
            .json()
            .await
            .map_err(|e| e.into_fetch_error())?;

        Ok(body.results.into_iter().next())
    }
}

fn convert_current(body: CurrentResponse) -> (WeatherSnapshot, Forecast) {
    let snapshot = WeatherSnapshot {
        temperature: body.temperature.unwrap_or(0.0),
        humidity: body.humidity.unwrap_or(0.0),
        rainfall: body.rainfall.unwrap_or(0.0),
        wind_speed: body.wind_speed.unwrap_or(0.0),
        condition_code: body.code,
        description: body.description,
        city: body.city,
        timestamp: parse_timestamp(&body.timestamp),
    };

    let hourly = body
        .hourly
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, t)| {
            Some(HourlyPoint {
                time: parse_naive_datetime(t)?,
                temperature: body.hourly.temperature_2m.get(i).copied().unwrap_or(0.0),
                rainfall: body.hourly.rain.get(i).copied().unwrap_or(0.0),
                condition_code: body.hourly.weather_code.get(i).copied().unwrap_or(0),
            })
        })
        .collect();

    let daily = body
        .daily
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, t)| {
            Some(DailyPoint {
                date: t.parse::<NaiveDate>().ok()?,
                temperature_max: body.daily.temperature_2m_max.get(i).copied().unwrap_or(0.0),
                temperature_min: body.daily.temperature_2m_min.get(i).copied().unwrap_or(0.0),
                condition_code: body.daily.weather_code.get(i).copied().unwrap_or(0),
                rainfall: body.daily.precipitation_sum.get(i).copied().unwrap_or(0.0),
                precipitation_probability: body
                    .daily
                    .precipitation_probability_max
                    .get(i)
                    .copied()
                    .unwrap_or(0.0),
                wind_speed_max: body.daily.windspeed_10m_max.get(i).copied().unwrap_or(0.0),
                sunrise: body.daily.sunrise.get(i).and_then(|s| parse_naive_datetime(s)),
                sunset: body.daily.sunset.get(i).and_then(|s| parse_naive_datetime(s)),
                uv_index_max: body.daily.uv_index_max.get(i).copied(),
            })
        })
        .collect();

    (snapshot, Forecast { hourly, daily })
}

/// Parse Open-Meteo style local timestamps ("2024-01-05T14:00", with or
/// without seconds).
fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// The backend stamps responses with a naive ISO timestamp. Treat it as
/// UTC; if it does not parse, fall back to the receive time.
fn parse_timestamp(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(naive) = s.parse::<NaiveDateTime>() {
        return naive.and_utc();
    }
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popular_cities_have_coordinates() {
        let cities = popular_cities();
        assert_eq!(cities.len(), 4);
        assert!(cities.iter().any(|c| c.name == "Tokyo"));
        assert!(cities
            .iter()
            .all(|c| (-90.0..=90.0).contains(&c.latitude)));
    }

    #[test]
    fn test_parse_naive_datetime_minute_precision() {
        let dt = parse_naive_datetime("2024-01-05T14:00").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-01-05 14:00");
    }

    #[test]
    fn test_parse_naive_datetime_with_seconds() {
        assert!(parse_naive_datetime("2024-01-05T14:00:30").is_some());
    }

    #[test]
    fn test_parse_naive_datetime_garbage() {
        assert!(parse_naive_datetime("yesterday").is_none());
    }

    #[test]
    fn test_parse_timestamp_iso_with_fraction() {
        let ts = parse_timestamp("2024-01-05T14:23:11.123456");
        assert_eq!(ts.format("%Y-%m-%d").to_string(), "2024-01-05");
    }

    #[test]
    fn test_convert_current_zips_series() {
        let body: CurrentResponse = serde_json::from_value(serde_json::json!({
            "city": "Coimbatore",
            "temperature": 28.5,
            "humidity": 70.0,
            "rainfall": 0.4,
            "wind_speed": 12.0,
            "description": "Cloudy",
            "code": 2,
            "hourly": {
                "time": ["2024-01-05T00:00", "2024-01-05T01:00"],
                "temperature_2m": [24.0, 23.5],
                "rain": [0.0, 0.2],
                "weather_code": [1, 2]
            },
            "daily": {
                "time": ["2024-01-05", "2024-01-06"],
                "temperature_2m_max": [31.0, 30.0],
                "temperature_2m_min": [22.0, 21.0],
                "weather_code": [2, 61]
            },
            "timestamp": "2024-01-05T06:00:00"
        }))
        .unwrap();

        let (snapshot, forecast) = convert_current(body);
        assert_eq!(snapshot.city, "Coimbatore");
        assert_eq!(snapshot.condition_code, 2);
        assert_eq!(forecast.hourly.len(), 2);
        assert_eq!(forecast.daily.len(), 2);
        assert_eq!(forecast.hourly[1].rainfall, 0.2);
        assert_eq!(forecast.daily[1].condition_code, 61);
    }

    #[test]
    fn test_convert_current_tolerates_missing_series() {
        let body: CurrentResponse = serde_json::from_value(serde_json::json!({
            "city": "Local",
            "temperature": 25.0,
            "humidity": 65.0,
            "rainfall": 0.0,
            "wind_speed": 12.0,
            "description": "API Unavailable",
            "code": 0,
            "hourly": {},
            "daily": {},
            "timestamp": "2024-01-05T06:00:00"
        }))
        .unwrap();

        let (snapshot, forecast) = convert_current(body);
        assert_eq!(snapshot.temperature, 25.0);
        assert!(forecast.hourly.is_empty());
        assert!(forecast.daily.is_empty());
    }
}
