//! Display-ready prediction derivation.
//!
//! Maps raw predictor responses to a [`PredictionResult`], fills in the
//! fields the backend omits, and synthesizes a clearly-marked demo
//! estimate when the predictor cannot be reached.

use rand::Rng;
use tokio_util::sync::CancellationToken;

use skycast_core::config::ModelKind;
use skycast_core::error::FetchError;
use skycast_core::events::{EventBus, NotificationLevel};

use crate::client::{PredictorClient, PredictorInputs, PredictorResponse};

/// Advisory messages, one per ladder rung.
const ADVISORY_HEAVY_RAIN: &str = "Heavy rain expected. Avoid travel if possible.";
const ADVISORY_MODERATE_RAIN: &str = "Moderate rain expected. Carry an umbrella.";
const ADVISORY_LIGHT_RAIN: &str = "Light rain possible. Keep a raincoat handy.";
const ADVISORY_EXTREME_HEAT: &str = "Extreme heat expected. Limit time outdoors.";
const ADVISORY_HEAT: &str = "Hot conditions. Stay hydrated.";
const ADVISORY_COLD: &str = "Chilly conditions. Wear warm clothes.";
const ADVISORY_FREEZING: &str = "Freezing conditions. Watch for ice.";
const ADVISORY_MILD: &str = "Mild conditions. Enjoy your day!";

/// Offline fallback bounds: temperature jitters by at most this much.
const FALLBACK_TEMP_JITTER: f64 = 2.0;

/// Advisory text from the fixed threshold ladder, first match wins.
///
/// The rainfall ladder pre-empts the temperature ladder only when
/// predicted rainfall is above zero; a dry forecast is judged on
/// temperature alone.
pub fn advisory_text(predicted_rainfall: f64, predicted_temperature: f64) -> &'static str {
    if predicted_rainfall > 0.0 {
        if predicted_rainfall > 10.0 {
            return ADVISORY_HEAVY_RAIN;
        }
        if predicted_rainfall > 5.0 {
            return ADVISORY_MODERATE_RAIN;
        }
        return ADVISORY_LIGHT_RAIN;
    }

    if predicted_temperature > 35.0 {
        ADVISORY_EXTREME_HEAT
    } else if predicted_temperature > 30.0 {
        ADVISORY_HEAT
    } else if (0.0..10.0).contains(&predicted_temperature) {
        ADVISORY_COLD
    } else if predicted_temperature < 0.0 {
        ADVISORY_FREEZING
    } else {
        ADVISORY_MILD
    }
}

/// A single lifestyle tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tip {
    pub icon: &'static str,
    pub text: &'static str,
}

/// Condition/temperature/wind based tips for the advisory panel.
pub fn lifestyle_tips(classification: &str, temperature: f64, wind_speed: f64) -> Vec<Tip> {
    let mut tips = Vec::new();

    match classification {
        "Rainy" => {
            tips.push(Tip {
                icon: "umbrella",
                text: "Carry an umbrella. High chance of rain.",
            });
            tips.push(Tip {
                icon: "car",
                text: "Drive carefully, roads might be slippery.",
            });
        }
        "Sunny" => {
            tips.push(Tip {
                icon: "sunglasses",
                text: "Great day for outdoor activities!",
            });
            tips.push(Tip {
                icon: "sunscreen",
                text: "Use sunscreen if going out for long.",
            });
        }
        "Cloudy" => {
            tips.push(Tip {
                icon: "cloud",
                text: "Good weather for a walk, but keep a jacket.",
            });
        }
        _ => {}
    }

    if temperature > 30.0 {
        tips.push(Tip {
            icon: "water",
            text: "Stay hydrated, it's hot outside.",
        });
    } else if temperature < 10.0 {
        tips.push(Tip {
            icon: "scarf",
            text: "Wear warm clothes, it's chilly.",
        });
    }

    if wind_speed > 20.0 {
        tips.push(Tip {
            icon: "wind",
            text: "Strong winds! Secure loose objects.",
        });
        tips.push(Tip {
            icon: "bicycle",
            text: "Avoid cycling against the wind.",
        });
    }

    if tips.is_empty() {
        tips.push(Tip {
            icon: "thumbs_up",
            text: "Conditions look normal. Enjoy your day!",
        });
    }

    tips
}

/// Rain/no-rain label used when the backend omits a classification.
pub fn classify_rainfall(predicted_rainfall: f64) -> &'static str {
    if predicted_rainfall > 0.0 {
        "Rainy"
    } else {
        "Sunny"
    }
}

/// Local stand-in for the classifier endpoint, mirroring its own fallback.
pub fn heuristic_condition(temperature: f64, rainfall: f64) -> &'static str {
    if rainfall > 5.0 {
        "Rainy"
    } else if temperature > 30.0 {
        "Hot"
    } else {
        "Mild"
    }
}

/// Alert thresholds mirroring the backend's.
pub fn synthesize_alerts(predicted_temperature: f64, predicted_rainfall: f64) -> Vec<String> {
    let mut alerts = Vec::new();
    if predicted_temperature > 35.0 {
        alerts.push("High Temperature Warning".to_string());
    }
    if predicted_rainfall > 10.0 {
        alerts.push("Heavy Rainfall Warning".to_string());
    }
    alerts
}

/// Display-ready prediction. Recomputed whenever the snapshot inputs
/// change; never persisted.
#[derive(Debug, Clone)]
pub struct PredictionResult {
    pub predicted_temperature: f64,
    pub predicted_rainfall: f64,
    pub classification: String,
    pub alerts: Vec<String>,
    pub advisory: &'static str,
    pub tips: Vec<Tip>,
    /// True when this result is a synthesized demo estimate rather than
    /// a real model output. Must be shown as such.
    pub degraded: bool,
    /// Which model (or fallback) produced this result.
    pub method: String,
    /// Per-model breakdown from the ensemble endpoint, kept for display.
    pub breakdown: Option<serde_json::Value>,
}

impl PredictionResult {
    /// Map a backend response, filling in omitted fields.
    pub fn from_response(inputs: &PredictorInputs, response: PredictorResponse) -> Self {
        let classification = response
            .classification
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| classify_rainfall(response.predicted_rainfall).to_string());

        let alerts = if response.alerts.is_empty() {
            synthesize_alerts(response.predicted_temperature, response.predicted_rainfall)
        } else {
            response.alerts
        };

        // A backend that fell back to heuristics says so in its status.
        let degraded = response
            .status
            .as_deref()
            .map(|s| s.contains("fallback") || s.contains("error"))
            .unwrap_or(false);

        Self {
            predicted_temperature: response.predicted_temperature,
            predicted_rainfall: response.predicted_rainfall,
            advisory: advisory_text(response.predicted_rainfall, response.predicted_temperature),
            tips: lifestyle_tips(
                &classification,
                response.predicted_temperature,
                inputs.wind_speed,
            ),
            classification,
            alerts,
            degraded,
            method: response.method.unwrap_or_else(|| "model".to_string()),
            breakdown: response.breakdown,
        }
    }

    /// Synthesized estimate for when the predictor is unreachable.
    /// Clearly marked as degraded - never presented as authoritative.
    pub fn demo_fallback(inputs: &PredictorInputs) -> Self {
        let mut rng = rand::thread_rng();
        let predicted_temperature =
            inputs.temperature + rng.gen_range(-FALLBACK_TEMP_JITTER..=FALLBACK_TEMP_JITTER);
        let predicted_rainfall = (inputs.rainfall + rng.gen_range(-1.0..=2.0)).max(0.0);

        let classification = classify_rainfall(predicted_rainfall).to_string();

        Self {
            predicted_temperature,
            predicted_rainfall,
            advisory: advisory_text(predicted_rainfall, predicted_temperature),
            alerts: synthesize_alerts(predicted_temperature, predicted_rainfall),
            tips: lifestyle_tips(&classification, predicted_temperature, inputs.wind_speed),
            classification,
            degraded: true,
            method: "offline demo".to_string(),
            breakdown: None,
        }
    }
}

/// Runs predictions and degrades gracefully when the backend is down.
pub struct PredictionViewModel {
    client: PredictorClient,
    kind: ModelKind,
    events: EventBus,
}

impl PredictionViewModel {
    pub fn new(client: PredictorClient, kind: ModelKind, events: EventBus) -> Self {
        Self {
            client,
            kind,
            events,
        }
    }

    /// Predict from snapshot inputs. Always returns a usable result;
    /// failures produce a degraded demo estimate and a notification.
    pub async fn predict(
        &self,
        inputs: &PredictorInputs,
        cancel: &CancellationToken,
    ) -> PredictionResult {
        match self.client.predict(self.kind, inputs, cancel).await {
            Ok(response) => PredictionResult::from_response(inputs, response),
            Err(FetchError::Cancelled) => {
                // Superseded; the caller is about to throw this away, but
                // hand back something consistent rather than panicking.
                PredictionResult::demo_fallback(inputs)
            }
            Err(e) => {
                tracing::warn!("Predictor unavailable: {e}");
                self.events.publish(
                    NotificationLevel::Warning,
                    "Predictor unreachable - showing demo estimate",
                );
                PredictionResult::demo_fallback(inputs)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(temperature: f64, rainfall: f64, wind_speed: f64) -> PredictorInputs {
        PredictorInputs {
            temperature,
            humidity: 60.0,
            rainfall,
            wind_speed,
        }
    }

    #[test]
    fn rainfall_ladder_first_match_wins() {
        assert_eq!(advisory_text(12.0, 20.0), ADVISORY_HEAVY_RAIN);
        assert_eq!(advisory_text(7.0, 20.0), ADVISORY_MODERATE_RAIN);
        assert_eq!(advisory_text(0.5, 20.0), ADVISORY_LIGHT_RAIN);
    }

    #[test]
    fn rainfall_ladder_preempts_temperature_only_when_wet() {
        // Any rain wins over even extreme heat
        assert_eq!(advisory_text(0.5, 40.0), ADVISORY_LIGHT_RAIN);
        // Zero rainfall falls through to the temperature ladder
        assert_eq!(advisory_text(0.0, 36.0), ADVISORY_EXTREME_HEAT);
    }

    #[test]
    fn temperature_ladder() {
        assert_eq!(advisory_text(0.0, 36.0), ADVISORY_EXTREME_HEAT);
        assert_eq!(advisory_text(0.0, 32.0), ADVISORY_HEAT);
        assert_eq!(advisory_text(0.0, 5.0), ADVISORY_COLD);
        assert_eq!(advisory_text(0.0, -3.0), ADVISORY_FREEZING);
        assert_eq!(advisory_text(0.0, 22.0), ADVISORY_MILD);
    }

    #[test]
    fn classification_defaults_from_rainfall() {
        assert_eq!(classify_rainfall(1.2), "Rainy");
        assert_eq!(classify_rainfall(0.0), "Sunny");
    }

    #[test]
    fn heuristic_condition_thresholds() {
        assert_eq!(heuristic_condition(25.0, 6.0), "Rainy");
        assert_eq!(heuristic_condition(32.0, 0.0), "Hot");
        assert_eq!(heuristic_condition(22.0, 0.0), "Mild");
    }

    #[test]
    fn alerts_use_backend_thresholds() {
        assert_eq!(
            synthesize_alerts(36.0, 0.0),
            vec!["High Temperature Warning".to_string()]
        );
        assert_eq!(
            synthesize_alerts(25.0, 11.0),
            vec!["Heavy Rainfall Warning".to_string()]
        );
        assert_eq!(synthesize_alerts(36.0, 11.0).len(), 2);
        assert!(synthesize_alerts(25.0, 0.0).is_empty());
    }

    #[test]
    fn tips_for_rainy_conditions() {
        let tips = lifestyle_tips("Rainy", 25.0, 10.0);
        assert_eq!(tips.len(), 2);
        assert!(tips.iter().any(|t| t.icon == "umbrella"));
    }

    #[test]
    fn tips_stack_across_categories() {
        let tips = lifestyle_tips("Sunny", 32.0, 25.0);
        // sunny (2) + heat (1) + wind (2)
        assert_eq!(tips.len(), 5);
    }

    #[test]
    fn tips_default_to_normal() {
        let tips = lifestyle_tips("Mild", 20.0, 5.0);
        assert_eq!(tips.len(), 1);
        assert_eq!(tips[0].icon, "thumbs_up");
    }

    #[test]
    fn response_mapping_fills_omitted_classification() {
        let response: PredictorResponse = serde_json::from_value(serde_json::json!({
            "predicted_temperature": 26.0,
            "predicted_rainfall": 4.2
        }))
        .unwrap();

        let result = PredictionResult::from_response(&inputs(25.0, 0.0, 10.0), response);
        assert_eq!(result.classification, "Rainy");
        assert!(!result.degraded);
        assert_eq!(result.advisory, ADVISORY_LIGHT_RAIN);
    }

    #[test]
    fn response_mapping_keeps_backend_classification() {
        let response: PredictorResponse = serde_json::from_value(serde_json::json!({
            "predicted_temperature": 26.0,
            "predicted_rainfall": 0.0,
            "classification": "Partly Cloudy",
            "alerts": ["Custom Alert"]
        }))
        .unwrap();

        let result = PredictionResult::from_response(&inputs(25.0, 0.0, 10.0), response);
        assert_eq!(result.classification, "Partly Cloudy");
        assert_eq!(result.alerts, vec!["Custom Alert".to_string()]);
    }

    #[test]
    fn backend_fallback_status_marks_degraded() {
        let response: PredictorResponse = serde_json::from_value(serde_json::json!({
            "predicted_temperature": 26.0,
            "predicted_rainfall": 0.0,
            "method": "Heuristic (Models Loading)",
            "status": "fallback"
        }))
        .unwrap();

        let result = PredictionResult::from_response(&inputs(25.0, 0.0, 10.0), response);
        assert!(result.degraded);
        assert_eq!(result.method, "Heuristic (Models Loading)");
    }

    #[test]
    fn demo_fallback_is_bounded_and_marked() {
        let input = inputs(25.0, 0.5, 10.0);

        for _ in 0..100 {
            let result = PredictionResult::demo_fallback(&input);
            assert!(result.degraded);
            assert_eq!(result.method, "offline demo");
            assert!((result.predicted_temperature - input.temperature).abs() <= 2.0);
            assert!(result.predicted_rainfall >= 0.0);
            assert!(result.predicted_rainfall <= input.rainfall + 2.0);
        }
    }
}
