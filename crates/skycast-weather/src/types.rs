use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weather condition categories mapped from WMO codes
/// See: https://open-meteo.com/en/docs#weathervariables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WmoCondition {
    #[default]
    Clear,
    Cloudy,
    Fog,
    Rain,
    Snow,
    Showers,
    Thunderstorm,
}

impl WmoCondition {
    /// Convert a WMO weather code to a condition category.
    /// Unknown codes fall through to Clear.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=3 => Self::Cloudy,
            45..=48 => Self::Fog,
            51..=67 => Self::Rain,
            71..=77 => Self::Snow,
            80..=82 => Self::Showers,
            c if c >= 95 => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Rain => "Rainy",
            Self::Snow => "Snow",
            Self::Showers => "Showers",
            Self::Thunderstorm => "Stormy",
        }
    }

    /// Get icon name for the presentation layer
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clear => "sun",
            Self::Cloudy => "cloud",
            Self::Fog => "cloud_fog",
            Self::Rain => "cloud_rain",
            Self::Snow => "cloud_snow",
            Self::Showers => "cloud_drizzle",
            Self::Thunderstorm => "cloud_lightning",
        }
    }
}

/// UV exposure bands derived from the daily max UV index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

impl UvLevel {
    pub fn from_index(uv: f64) -> Self {
        if uv > 10.0 {
            Self::Extreme
        } else if uv > 7.0 {
            Self::VeryHigh
        } else if uv > 5.0 {
            Self::High
        } else if uv > 2.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::VeryHigh => "Very High",
            Self::Extreme => "Extreme",
        }
    }
}

/// Where the active location query came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Geolocation,
    Search,
    Default,
    UrlParams,
}

/// The single active display location.
///
/// Exactly one query is active at a time; a new one supersedes the
/// previous query and any fetch still in flight for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
    pub source: LocationSource,
}

impl LocationQuery {
    /// Label used when no human-readable place name could be resolved.
    /// Never a generic placeholder - the user sees where they actually are.
    pub fn coordinate_label(latitude: f64, longitude: f64) -> String {
        format!("{:.4}, {:.4}", latitude, longitude)
    }
}

/// Current weather conditions for the active location.
/// Immutable once created; replaced wholesale on each successful fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
    pub wind_speed: f64,
    pub condition_code: i32,
    pub description: String,
    pub city: String,
    pub timestamp: DateTime<Utc>,
}

impl WeatherSnapshot {
    pub fn condition(&self) -> WmoCondition {
        WmoCondition::from_code(self.condition_code)
    }
}

/// One hourly forecast entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub time: NaiveDateTime,
    pub temperature: f64,
    pub rainfall: f64,
    pub condition_code: i32,
}

/// One daily forecast entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub temperature_max: f64,
    pub temperature_min: f64,
    pub condition_code: i32,
    pub rainfall: f64,
    pub precipitation_probability: f64,
    pub wind_speed_max: f64,
    pub sunrise: Option<NaiveDateTime>,
    pub sunset: Option<NaiveDateTime>,
    pub uv_index_max: Option<f64>,
}

impl DailyPoint {
    /// Midpoint of the daily temperature range.
    pub fn mean_temperature(&self) -> f64 {
        (self.temperature_max + self.temperature_min) / 2.0
    }
}

/// Hourly and daily series for the active location.
///
/// Order-significant, index-keyed: hourly holds up to 24 entries and
/// daily up to 7 once sliced for display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Forecast {
    pub hourly: Vec<HourlyPoint>,
    pub daily: Vec<DailyPoint>,
}

/// One-line summary of the daily series for the presentation layer.
pub fn weekly_outlook(daily: &[DailyPoint]) -> String {
    if daily.is_empty() {
        return "No forecast data available.".to_string();
    }

    let min = daily
        .iter()
        .map(|d| d.temperature_min)
        .fold(f64::INFINITY, f64::min);
    let max = daily
        .iter()
        .map(|d| d.temperature_max)
        .fold(f64::NEG_INFINITY, f64::max);

    let stormy = daily
        .iter()
        .any(|d| d.condition_code == 95 || d.condition_code == 63);

    let tail = if stormy {
        "Rain or storms possible."
    } else {
        "Generally mild conditions ahead."
    };

    format!(
        "Expect temperatures between {}\u{b0} and {}\u{b0}. {}",
        min.round(),
        max.round(),
        tail
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wmo_code_clear() {
        assert_eq!(WmoCondition::from_code(0), WmoCondition::Clear);
    }

    #[test]
    fn test_wmo_code_cloudy() {
        assert_eq!(WmoCondition::from_code(1), WmoCondition::Cloudy);
        assert_eq!(WmoCondition::from_code(2), WmoCondition::Cloudy);
        assert_eq!(WmoCondition::from_code(3), WmoCondition::Cloudy);
    }

    #[test]
    fn test_wmo_code_fog() {
        assert_eq!(WmoCondition::from_code(45), WmoCondition::Fog);
        assert_eq!(WmoCondition::from_code(48), WmoCondition::Fog);
    }

    #[test]
    fn test_wmo_code_rain() {
        assert_eq!(WmoCondition::from_code(51), WmoCondition::Rain);
        assert_eq!(WmoCondition::from_code(61), WmoCondition::Rain);
        assert_eq!(WmoCondition::from_code(67), WmoCondition::Rain);
    }

    #[test]
    fn test_wmo_code_snow() {
        assert_eq!(WmoCondition::from_code(71), WmoCondition::Snow);
        assert_eq!(WmoCondition::from_code(75), WmoCondition::Snow);
        assert_eq!(WmoCondition::from_code(77), WmoCondition::Snow);
    }

    #[test]
    fn test_wmo_code_showers() {
        assert_eq!(WmoCondition::from_code(80), WmoCondition::Showers);
        assert_eq!(WmoCondition::from_code(82), WmoCondition::Showers);
    }

    #[test]
    fn test_wmo_code_thunderstorm() {
        assert_eq!(WmoCondition::from_code(95), WmoCondition::Thunderstorm);
        assert_eq!(WmoCondition::from_code(96), WmoCondition::Thunderstorm);
        assert_eq!(WmoCondition::from_code(99), WmoCondition::Thunderstorm);
    }

    #[test]
    fn test_wmo_code_unknown_defaults_to_clear() {
        assert_eq!(WmoCondition::from_code(42), WmoCondition::Clear);
        assert_eq!(WmoCondition::from_code(-1), WmoCondition::Clear);
    }

    #[test]
    fn test_uv_levels() {
        assert_eq!(UvLevel::from_index(0.0), UvLevel::Low);
        assert_eq!(UvLevel::from_index(2.0), UvLevel::Low);
        assert_eq!(UvLevel::from_index(3.0), UvLevel::Moderate);
        assert_eq!(UvLevel::from_index(6.0), UvLevel::High);
        assert_eq!(UvLevel::from_index(8.0), UvLevel::VeryHigh);
        assert_eq!(UvLevel::from_index(11.0), UvLevel::Extreme);
    }

    #[test]
    fn test_coordinate_label_formatting() {
        assert_eq!(
            LocationQuery::coordinate_label(11.0168, 76.9558),
            "11.0168, 76.9558"
        );
    }

    fn day(date: &str, min: f64, max: f64, code: i32) -> DailyPoint {
        DailyPoint {
            date: date.parse().unwrap(),
            temperature_max: max,
            temperature_min: min,
            condition_code: code,
            rainfall: 0.0,
            precipitation_probability: 0.0,
            wind_speed_max: 0.0,
            sunrise: None,
            sunset: None,
            uv_index_max: None,
        }
    }

    #[test]
    fn test_weekly_outlook_mild() {
        let daily = vec![day("2024-01-05", 18.0, 28.0, 1), day("2024-01-06", 17.0, 29.0, 2)];
        let outlook = weekly_outlook(&daily);
        assert!(outlook.contains("17"));
        assert!(outlook.contains("29"));
        assert!(outlook.contains("mild"));
    }

    #[test]
    fn test_weekly_outlook_stormy() {
        let daily = vec![day("2024-01-05", 18.0, 28.0, 95)];
        assert!(weekly_outlook(&daily).contains("storms"));
    }

    #[test]
    fn test_mean_temperature() {
        let d = day("2024-01-05", 10.0, 20.0, 0);
        assert!((d.mean_temperature() - 15.0).abs() < f64::EPSILON);
    }
}
