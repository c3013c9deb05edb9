//! Text report assembly.
//!
//! Formats already-fetched weather and prediction data into a plain-text
//! report. No new data is fetched here.

use std::path::Path;

use anyhow::{Context, Result};

use skycast_predict::PredictionResult;
use skycast_weather::{Forecast, LocationQuery, WeatherSnapshot};

/// Hourly rows included in the report (keeps it to one page).
const HOURLY_ROWS: usize = 12;

pub fn render_report(
    query: &LocationQuery,
    snapshot: &WeatherSnapshot,
    forecast: &Forecast,
    prediction: Option<&PredictionResult>,
) -> String {
    let mut out = String::new();

    out.push_str("WEATHER FORECAST REPORT\n");
    out.push_str("=======================\n\n");
    out.push_str(&format!("Location: {}\n", query.display_name.to_uppercase()));
    out.push_str(&format!(
        "Date: {}\n\n",
        snapshot.timestamp.format("%Y-%m-%d %H:%M UTC")
    ));

    out.push_str("CURRENT CONDITIONS\n");
    out.push_str("------------------\n");
    out.push_str(&format!("Temperature : {:.1} C\n", snapshot.temperature));
    out.push_str(&format!("Condition   : {}\n", snapshot.description));
    out.push_str(&format!("Wind Speed  : {:.1} km/h\n", snapshot.wind_speed));
    out.push_str(&format!("Rainfall    : {:.1} mm\n", snapshot.rainfall));
    out.push_str(&format!("Humidity    : {:.0} %\n\n", snapshot.humidity));

    if !forecast.hourly.is_empty() {
        out.push_str("HOURLY FORECAST (NEXT 24 HOURS)\n");
        out.push_str("-------------------------------\n");
        out.push_str("Time           Temp     Rain     Code\n");
        for point in forecast.hourly.iter().take(HOURLY_ROWS) {
            out.push_str(&format!(
                "{}    {:>5.1} C  {:>5.1} mm  {:>4}\n",
                point.time.format("%d/%m %H:%M"),
                point.temperature,
                point.rainfall,
                point.condition_code
            ));
        }
        out.push('\n');
    }

    if let Some(prediction) = prediction {
        out.push_str("PREDICTION\n");
        out.push_str("----------\n");
        out.push_str(&format!(
            "Temperature : {:.1} C\n",
            prediction.predicted_temperature
        ));
        out.push_str(&format!(
            "Rainfall    : {:.1} mm\n",
            prediction.predicted_rainfall
        ));
        out.push_str(&format!("Condition   : {}\n", prediction.classification));
        if prediction.degraded {
            out.push_str(&format!(
                "Source      : {} (demo estimate - predictor unreachable)\n",
                prediction.method
            ));
        }
        if !prediction.alerts.is_empty() {
            out.push_str(&format!("ALERTS      : {}\n", prediction.alerts.join(", ")));
        }
        out.push_str(&format!("\nADVISORY\n--------\n{}\n", prediction.advisory));
    }

    out.push_str("\nGenerated by Skycast. Use this report for planning purposes only.\n");
    out
}

pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
