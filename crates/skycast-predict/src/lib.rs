//! Prediction view-model for Skycast
//!
//! Calls the remote ML predictor with current weather attributes and
//! derives display-ready fields: classification, advisory text, alerts
//! and lifestyle tips. Predictor failures degrade to a clearly-marked
//! demo estimate, never silently-authoritative data.

pub mod client;
pub mod diagnostics;
pub mod view_model;

pub use client::{PredictorClient, PredictorInputs, PredictorResponse};
pub use diagnostics::{BackendStatus, DiagnosticsClient, ModelMetrics};
pub use view_model::{
    advisory_text, heuristic_condition, lifestyle_tips, PredictionResult, PredictionViewModel,
    Tip,
};
