//! Reverse geocoding: convert coordinates to human-readable place names.
//!
//! Results are cached by rounded-coordinate key so nearby repeated
//! requests (a user pressing the locate button twice) do not trigger
//! redundant lookups. Failures degrade to a coordinate-formatted label -
//! the view never shows a generic placeholder for a real position.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::client::{PlaceMatch, WeatherApi};
use crate::types::LocationQuery;

/// Cached names live this long before a fresh lookup is made.
const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Bounded cache size; oldest entries are evicted on overflow.
const CACHE_CAPACITY: usize = 64;

/// Geocode calls get a shorter deadline than position acquisition -
/// a slow lookup should not hold up the weather fetch.
const GEOCODE_TIMEOUT_SECS: u64 = 5;

/// Coordinates rounded to 3 decimals (~110 m) form the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    lat_milli: i64,
    lon_milli: i64,
}

impl CacheKey {
    fn from_coords(latitude: f64, longitude: f64) -> Self {
        Self {
            lat_milli: (latitude * 1000.0).round() as i64,
            lon_milli: (longitude * 1000.0).round() as i64,
        }
    }
}

struct CacheEntry {
    name: String,
    inserted: Instant,
}

#[derive(Default)]
struct CacheInner {
    map: HashMap<CacheKey, CacheEntry>,
    order: VecDeque<CacheKey>,
}

/// TTL + capacity bounded cache of resolved place names.
pub struct GeocodeCache {
    inner: Mutex<CacheInner>,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn get(&self, latitude: f64, longitude: f64) -> Option<String> {
        let key = CacheKey::from_coords(latitude, longitude);
        let mut inner = self.inner.lock();

        let expired = match inner.map.get(&key) {
            Some(entry) if entry.inserted.elapsed() < CACHE_TTL => {
                return Some(entry.name.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.map.remove(&key);
            inner.order.retain(|k| *k != key);
        }
        None
    }

    pub fn insert(&self, latitude: f64, longitude: f64, name: String) {
        let key = CacheKey::from_coords(latitude, longitude);
        let mut inner = self.inner.lock();

        if inner.map.insert(
            key,
            CacheEntry {
                name,
                inserted: Instant::now(),
            },
        )
        .is_none()
        {
            inner.order.push_back(key);
        }

        while inner.order.len() > CACHE_CAPACITY {
            if let Some(oldest) = inner.order.pop_front() {
                inner.map.remove(&oldest);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().map.len()
    }
}

impl Default for GeocodeCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves display labels for coordinates, caching successes.
pub struct Geocoder {
    api: WeatherApi,
    cache: GeocodeCache,
}

impl Geocoder {
    pub fn new(api: WeatherApi) -> Self {
        Self {
            // A failed lookup degrades to a coordinate label immediately;
            // retrying here would hold up the weather fetch.
            api: api.with_retry_policy(skycast_core::resilient::RetryPolicy::none()),
            cache: GeocodeCache::new(),
        }
    }

    /// Resolve a human-readable label for coordinates.
    ///
    /// Falls back to a `lat, lon` label on timeout or failure; only
    /// successful lookups are cached so later attempts can recover.
    pub async fn display_name(&self, latitude: f64, longitude: f64) -> String {
        if let Some(hit) = self.cache.get(latitude, longitude) {
            tracing::debug!("Geocode cache hit for {latitude}, {longitude}");
            return hit;
        }

        let cancel = CancellationToken::new();
        let lookup = self.api.reverse_geocode(latitude, longitude, &cancel);

        let place = match tokio::time::timeout(
            Duration::from_secs(GEOCODE_TIMEOUT_SECS),
            lookup,
        )
        .await
        {
            Ok(Ok(Some(place))) => place,
            Ok(Ok(None)) => {
                tracing::debug!("Reverse geocode returned no results");
                return LocationQuery::coordinate_label(latitude, longitude);
            }
            Ok(Err(e)) => {
                tracing::debug!("Reverse geocode failed: {e}");
                return LocationQuery::coordinate_label(latitude, longitude);
            }
            Err(_) => {
                tracing::debug!("Reverse geocode timed out");
                return LocationQuery::coordinate_label(latitude, longitude);
            }
        };

        match format_place(&place) {
            Some(label) => {
                tracing::info!("Reverse geocoded to: {label}");
                self.cache.insert(latitude, longitude, label.clone());
                label
            }
            None => LocationQuery::coordinate_label(latitude, longitude),
        }
    }
}

/// Build "Place, Region" from a geocode candidate, skipping the suffix
/// when it is empty or repeats the place name.
fn format_place(place: &PlaceMatch) -> Option<String> {
    let name = place.name.as_deref().filter(|n| !n.is_empty())?;

    let suffix = place
        .admin1
        .as_deref()
        .filter(|s| !s.is_empty() && *s != name)
        .or_else(|| {
            place
                .country_code
                .as_deref()
                .filter(|c| !c.is_empty() && *c != name)
        });

    Some(match suffix {
        Some(s) => format!("{}, {}", name, s),
        None => name.to_string(),
    })
}
