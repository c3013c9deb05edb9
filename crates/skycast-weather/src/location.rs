//! Display-location resolution.
//!
//! Resolution order: explicit URL/query coordinates, then the geolocation
//! source, then the configured fallback location. Geolocation failures
//! never block the view - they degrade to the fallback.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use skycast_core::error::LocationError;

use crate::geocode::Geocoder;
use crate::types::{LocationQuery, LocationSource};

/// Deadline for acquiring a position fix.
pub const POSITION_TIMEOUT_SECS: u64 = 8;

/// A fix this recent is reused instead of re-acquiring.
pub const POSITION_CACHE_SECS: u64 = 30;

/// A geographic position fix.
#[derive(Debug, Clone, Copy)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
}

/// Source of position fixes (system location service, test stub, ...).
///
/// Implementations should prefer high-accuracy sources; the resolver
/// bounds the wait and caches recent fixes.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self) -> Result<Position, LocationError>;
}

/// Explicit coordinates, e.g. from URL query parameters or a search pick.
#[derive(Debug, Clone)]
pub struct ExplicitCoords {
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
}

/// Resolves the active display location.
pub struct LocationResolver {
    locator: Option<Arc<dyn Geolocator>>,
    geocoder: Arc<Geocoder>,
    fallback: LocationQuery,
    last_fix: Mutex<Option<(Position, Instant)>>,
}

impl LocationResolver {
    pub fn new(
        locator: Option<Arc<dyn Geolocator>>,
        geocoder: Arc<Geocoder>,
        fallback: LocationQuery,
    ) -> Self {
        Self {
            locator,
            geocoder,
            fallback,
            last_fix: Mutex::new(None),
        }
    }

    /// Resolve the display location.
    ///
    /// Explicit coordinates win over geolocation; geolocation wins over
    /// the fallback. Always returns a usable query.
    pub async fn resolve(&self, explicit: Option<ExplicitCoords>) -> LocationQuery {
        if let Some(coords) = explicit {
            let display_name = match coords.city {
                Some(city) if !city.is_empty() => city,
                _ => {
                    self.geocoder
                        .display_name(coords.latitude, coords.longitude)
                        .await
                }
            };
            return LocationQuery {
                latitude: coords.latitude,
                longitude: coords.longitude,
                display_name,
                source: LocationSource::UrlParams,
            };
        }

        if let Some(position) = self.acquire_position().await {
            let display_name = self
                .geocoder
                .display_name(position.latitude, position.longitude)
                .await;
            return LocationQuery {
                latitude: position.latitude,
                longitude: position.longitude,
                display_name,
                source: LocationSource::Geolocation,
            };
        }

        tracing::info!("Using fallback location: {}", self.fallback.display_name);
        self.fallback.clone()
    }

    /// Build a query from a search selection.
    pub fn from_search(city_name: &str, latitude: f64, longitude: f64) -> LocationQuery {
        LocationQuery {
            latitude,
            longitude,
            display_name: city_name.to_string(),
            source: LocationSource::Search,
        }
    }

    /// Acquire a position, reusing a recent fix when available.
    async fn acquire_position(&self) -> Option<Position> {
        let locator = self.locator.as_ref()?;

        if let Some((fix, at)) = *self.last_fix.lock() {
            if at.elapsed() < Duration::from_secs(POSITION_CACHE_SECS) {
                tracing::debug!("Reusing cached position fix");
                return Some(fix);
            }
        }

        let acquired = tokio::time::timeout(
            Duration::from_secs(POSITION_TIMEOUT_SECS),
            locator.current_position(),
        )
        .await;

        match acquired {
            Ok(Ok(position)) => {
                tracing::info!(
                    "Got position: {}, {}",
                    position.latitude,
                    position.longitude
                );
                *self.last_fix.lock() = Some((position, Instant::now()));
                Some(position)
            }
            Ok(Err(e)) => {
                tracing::warn!("Geolocation failed: {} - {}", e, e.user_message());
                None
            }
            Err(_) => {
                tracing::warn!("Geolocation timed out");
                None
            }
        }
    }
}
