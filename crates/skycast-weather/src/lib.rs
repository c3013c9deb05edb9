//! Weather data layer for Skycast
//!
//! Fetches current/hourly/daily weather from the remote API, resolves
//! display locations (explicit coordinates, geolocation, search, fallback)
//! and derives display themes from WMO condition codes.

pub mod client;
pub mod coordinator;
pub mod geocode;
pub mod location;
pub mod theme;
pub mod types;

pub use client::{popular_cities, CityMatch, PlaceMatch, WeatherApi};
pub use coordinator::{slice_to_date, DaySummary, FetchCoordinator, FetchState, WeatherView};
pub use geocode::{GeocodeCache, Geocoder};
pub use location::{ExplicitCoords, Geolocator, LocationResolver, Position};
pub use theme::{select_theme, Theme};
pub use types::*;
