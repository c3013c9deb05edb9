//! Location/weather fetch coordination.
//!
//! Owns the single active [`LocationQuery`]. A new query supersedes the
//! previous one: its in-flight fetch is cancelled and any late response
//! is discarded, so a stale payload can never overwrite a newer one.
//! The coordinator is the single writer; readers get cloned views.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use skycast_core::error::FetchError;
use skycast_core::events::{EventBus, NotificationLevel};

use crate::client::WeatherApi;
use crate::location::LocationResolver;
use crate::theme::{select_theme, Theme};
use crate::types::{DailyPoint, Forecast, LocationQuery, WeatherSnapshot};

/// Locate-button activations inside this window collapse into one request.
pub const DEBOUNCE_WINDOW_MS: u64 = 800;

/// Connection state surfaced to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Ready,
    /// Retries exhausted; shown as a persistent banner until a fetch succeeds.
    Unreachable,
}

/// Everything the presentation layer needs after a successful fetch.
#[derive(Debug, Clone)]
pub struct WeatherView {
    pub query: LocationQuery,
    pub snapshot: WeatherSnapshot,
    pub forecast: Forecast,
    pub theme: Theme,
    /// Present when the view was resliced to a requested date.
    pub summary: Option<DaySummary>,
}

/// Summary fields recomputed from the daily record matching a requested date.
#[derive(Debug, Clone)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub avg_temperature: f64,
    pub rainfall: f64,
    pub wind_speed: f64,
}

impl DaySummary {
    pub fn from_daily(point: &DailyPoint) -> Self {
        Self {
            date: point.date,
            avg_temperature: point.mean_temperature(),
            rainfall: point.rainfall,
            wind_speed: point.wind_speed_max,
        }
    }
}

/// Reslice a forecast so the requested date is at index 0.
///
/// The hourly series becomes the 24 entries starting at the first hourly
/// timestamp on the target date; the daily series is re-indexed so
/// position 0 is the matched record. A date outside the fetched range is
/// an error, never a silently wrong slice.
pub fn slice_to_date(
    forecast: &Forecast,
    target: NaiveDate,
) -> Result<(Forecast, DaySummary), FetchError> {
    let day_idx = forecast
        .daily
        .iter()
        .position(|d| d.date == target)
        .ok_or(FetchError::DateOutOfRange(target))?;

    let summary = DaySummary::from_daily(&forecast.daily[day_idx]);

    let hourly = match forecast.hourly.iter().position(|h| h.time.date() == target) {
        Some(start) => forecast
            .hourly
            .iter()
            .skip(start)
            .take(24)
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    let daily = forecast.daily[day_idx..].to_vec();

    Ok((Forecast { hourly, daily }, summary))
}

/// Rough day/night flag for theme selection: sunrise/sunset from the
/// first daily record when present, otherwise a 06:00-18:00 window.
fn is_daytime(timestamp: &DateTime<Utc>, daily: &[DailyPoint]) -> bool {
    let time = timestamp.naive_utc().time();

    if let Some(first) = daily.first() {
        if let (Some(sunrise), Some(sunset)) = (first.sunrise, first.sunset) {
            return time >= sunrise.time() && time < sunset.time();
        }
    }

    (6..18).contains(&time.hour())
}

#[derive(Default)]
struct SingleFlightState {
    in_flight: bool,
    last_trigger: Option<Instant>,
}

/// Coalesces concurrent identical triggers into one in-flight call.
#[derive(Default)]
struct SingleFlight {
    inner: Mutex<SingleFlightState>,
}

impl SingleFlight {
    /// Returns false when a request is already in flight or the previous
    /// trigger was inside the debounce window.
    fn try_begin(&self, window: Duration) -> bool {
        let mut state = self.inner.lock();

        if state.in_flight {
            return false;
        }
        if let Some(at) = state.last_trigger {
            if at.elapsed() < window {
                return false;
            }
        }

        state.in_flight = true;
        state.last_trigger = Some(Instant::now());
        true
    }

    fn finish(&self) {
        self.inner.lock().in_flight = false;
    }
}

#[derive(Default)]
struct CoordinatorState {
    generation: u64,
    active: Option<LocationQuery>,
    cancel: Option<CancellationToken>,
    fetch_state: FetchState,
    view: Option<Arc<WeatherView>>,
}

/// Single-writer owner of the active location and its weather view.
pub struct FetchCoordinator {
    api: WeatherApi,
    events: EventBus,
    state: RwLock<CoordinatorState>,
    locate_guard: SingleFlight,
}

impl FetchCoordinator {
    pub fn new(api: WeatherApi, events: EventBus) -> Self {
        Self {
            api,
            events,
            state: RwLock::new(CoordinatorState::default()),
            locate_guard: SingleFlight::default(),
        }
    }

    /// Make `query` the active location.
    ///
    /// Supersedes the previous query: its cancellation token fires and its
    /// generation becomes stale, so any late response is discarded.
    pub fn activate(&self, query: LocationQuery) -> CancellationToken {
        let mut st = self.state.write();

        if let Some(prev) = st.cancel.take() {
            prev.cancel();
        }

        st.generation += 1;
        tracing::info!(
            "Active location: {} ({}, {})",
            query.display_name,
            query.latitude,
            query.longitude
        );
        st.active = Some(query);
        st.fetch_state = FetchState::Loading;

        let token = CancellationToken::new();
        st.cancel = Some(token.clone());
        token
    }

    /// Fetch weather for the active query, optionally resliced to a date.
    ///
    /// The result is applied only if the query is still the active one
    /// when the response arrives.
    pub async fn fetch(
        &self,
        target_date: Option<NaiveDate>,
    ) -> Result<Arc<WeatherView>, FetchError> {
        let (generation, token, query) = {
            let st = self.state.read();
            let query = st.active.clone().ok_or_else(|| {
                FetchError::InvalidResponse("no active location query".to_string())
            })?;
            let token = st.cancel.clone().ok_or(FetchError::Cancelled)?;
            (st.generation, token, query)
        };

        let fetched = self
            .api
            .current(
                query.latitude,
                query.longitude,
                Some(&query.display_name),
                &token,
            )
            .await
            .and_then(|(snapshot, forecast)| match target_date {
                Some(date) => {
                    let (sliced, summary) = slice_to_date(&forecast, date)?;
                    Ok((snapshot, sliced, Some(summary)))
                }
                None => Ok((snapshot, forecast, None)),
            });

        match fetched {
            Ok((snapshot, forecast, summary)) => {
                let theme = select_theme(
                    Some(snapshot.condition_code),
                    is_daytime(&snapshot.timestamp, &forecast.daily),
                );
                let view = Arc::new(WeatherView {
                    query,
                    snapshot,
                    forecast,
                    theme,
                    summary,
                });

                let mut st = self.state.write();
                if st.generation != generation {
                    tracing::debug!("Discarding weather response for superseded query");
                    return Err(FetchError::Cancelled);
                }

                st.view = Some(view.clone());
                st.fetch_state = FetchState::Ready;
                Ok(view)
            }
            Err(e) => {
                let mut st = self.state.write();
                if st.generation == generation && !matches!(e, FetchError::Cancelled) {
                    if e.is_retryable() {
                        // The resilient layer already spent its retries.
                        st.fetch_state = FetchState::Unreachable;
                        self.events
                            .publish(NotificationLevel::Error, e.user_message());
                    } else {
                        st.fetch_state = if st.view.is_some() {
                            FetchState::Ready
                        } else {
                            FetchState::Idle
                        };
                        let level = match e {
                            FetchError::DateOutOfRange(_) => NotificationLevel::Warning,
                            _ => NotificationLevel::Error,
                        };
                        self.events.publish(level, e.user_message());
                    }
                }
                Err(e)
            }
        }
    }

    /// Debounced locate trigger: resolve the device location and fetch
    /// weather for it. Returns `None` when the trigger was suppressed by
    /// the debounce window or an already in-flight request.
    pub async fn locate_and_fetch(
        &self,
        resolver: &LocationResolver,
        target_date: Option<NaiveDate>,
    ) -> Option<Result<Arc<WeatherView>, FetchError>> {
        if !self
            .locate_guard
            .try_begin(Duration::from_millis(DEBOUNCE_WINDOW_MS))
        {
            tracing::debug!("Locate trigger suppressed");
            return None;
        }

        let query = resolver.resolve(None).await;
        self.activate(query);
        let result = self.fetch(target_date).await;
        self.locate_guard.finish();
        Some(result)
    }

    pub fn fetch_state(&self) -> FetchState {
        self.state.read().fetch_state
    }

    pub fn view(&self) -> Option<Arc<WeatherView>> {
        self.state.read().view.clone()
    }

    pub fn active_query(&self) -> Option<LocationQuery> {
        self.state.read().active.clone()
    }

    /// Cancel any in-flight fetch, e.g. when the view unmounts.
    pub fn cancel_all(&self) {
        let mut st = self.state.write();
        if let Some(token) = st.cancel.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HourlyPoint;
    use chrono::NaiveDateTime;

    fn hour(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").unwrap()
    }

    fn hourly_point(s: &str, temperature: f64) -> HourlyPoint {
        HourlyPoint {
            time: hour(s),
            temperature,
            rainfall: 0.0,
            condition_code: 1,
        }
    }

    fn daily_point(date: &str, min: f64, max: f64) -> DailyPoint {
        DailyPoint {
            date: date.parse().unwrap(),
            temperature_max: max,
            temperature_min: min,
            condition_code: 2,
            rainfall: 3.5,
            precipitation_probability: 40.0,
            wind_speed_max: 14.0,
            sunrise: None,
            sunset: None,
            uv_index_max: None,
        }
    }

    fn sample_forecast() -> Forecast {
        // Three days of hourly data, 24 entries each
        let mut hourly = Vec::new();
        for day in 3..=5 {
            for h in 0..24 {
                hourly.push(hourly_point(
                    &format!("2024-01-{:02}T{:02}:00", day, h),
                    20.0 + h as f64 * 0.1,
                ));
            }
        }

        let daily = vec![
            daily_point("2024-01-03", 18.0, 28.0),
            daily_point("2024-01-04", 19.0, 29.0),
            daily_point("2024-01-05", 20.0, 30.0),
            daily_point("2024-01-06", 21.0, 31.0),
        ];

        Forecast { hourly, daily }
    }

    #[test]
    fn slice_matches_requested_date() {
        let forecast = sample_forecast();
        let target: NaiveDate = "2024-01-05".parse().unwrap();

        let (sliced, summary) = slice_to_date(&forecast, target).unwrap();

        // Daily re-indexed so position 0 is the requested date
        assert_eq!(sliced.daily[0].date, target);
        assert_eq!(sliced.daily.len(), 2);

        // Hourly: the 24 entries starting at the first hour of the date
        assert_eq!(sliced.hourly.len(), 24);
        assert_eq!(sliced.hourly[0].time, hour("2024-01-05T00:00"));
        assert_eq!(sliced.hourly[23].time, hour("2024-01-05T23:00"));

        // Summary comes from the matched daily record
        assert_eq!(summary.date, target);
        assert!((summary.avg_temperature - 25.0).abs() < f64::EPSILON);
        assert!((summary.rainfall - 3.5).abs() < f64::EPSILON);
        assert!((summary.wind_speed - 14.0).abs() < f64::EPSILON);
    }

    #[test]
    fn slice_out_of_range_is_an_error() {
        let forecast = sample_forecast();
        let target: NaiveDate = "2024-02-01".parse().unwrap();

        let result = slice_to_date(&forecast, target);
        assert!(matches!(result, Err(FetchError::DateOutOfRange(d)) if d == target));
    }

    #[test]
    fn slice_caps_hourly_at_24_entries() {
        let forecast = sample_forecast();
        let target: NaiveDate = "2024-01-03".parse().unwrap();

        let (sliced, _) = slice_to_date(&forecast, target).unwrap();
        assert_eq!(sliced.hourly.len(), 24);
        assert!(sliced.hourly.iter().all(|h| h.time.date() == target));
    }

    #[test]
    fn slice_without_matching_hourly_data_is_empty_not_wrong() {
        let forecast = Forecast {
            hourly: vec![hourly_point("2024-01-03T00:00", 20.0)],
            daily: vec![daily_point("2024-01-05", 20.0, 30.0)],
        };
        let target: NaiveDate = "2024-01-05".parse().unwrap();

        let (sliced, _) = slice_to_date(&forecast, target).unwrap();
        assert!(sliced.hourly.is_empty());
    }

    #[test]
    fn single_flight_suppresses_concurrent_triggers() {
        let guard = SingleFlight::default();
        let window = Duration::from_millis(500);

        assert!(guard.try_begin(window));
        // Still in flight
        assert!(!guard.try_begin(window));

        guard.finish();
        // No longer in flight, but inside the debounce window
        assert!(!guard.try_begin(window));
    }

    #[test]
    fn single_flight_allows_after_window() {
        let guard = SingleFlight::default();

        assert!(guard.try_begin(Duration::ZERO));
        guard.finish();
        assert!(guard.try_begin(Duration::ZERO));
    }

    #[test]
    fn daytime_window_without_sun_data() {
        let noon: DateTime<Utc> = "2024-01-05T12:00:00Z".parse().unwrap();
        let midnight: DateTime<Utc> = "2024-01-05T00:30:00Z".parse().unwrap();
        assert!(is_daytime(&noon, &[]));
        assert!(!is_daytime(&midnight, &[]));
    }

    #[test]
    fn daytime_uses_sunrise_sunset_when_present() {
        let mut point = daily_point("2024-01-05", 18.0, 28.0);
        point.sunrise = Some(hour("2024-01-05T06:30"));
        point.sunset = Some(hour("2024-01-05T18:15"));
        let daily = vec![point];

        let morning: DateTime<Utc> = "2024-01-05T06:00:00Z".parse().unwrap();
        let noon: DateTime<Utc> = "2024-01-05T12:00:00Z".parse().unwrap();
        assert!(!is_daytime(&morning, &daily));
        assert!(is_daytime(&noon, &daily));
    }
}
