pub mod config;
pub mod error;
pub mod events;
pub mod resilient;

pub use config::{ApiConfig, Config, ModelKind, WeatherConfig};
pub use error::{AppError, ConfigError, FetchError, LocationError};
pub use events::{EventBus, Notification, NotificationLevel};
pub use resilient::{RetryDecision, RetryPolicy};

use anyhow::Result;

/// Initialize the core application
pub fn init() -> Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Skycast core initialized");
    Ok(())
}
