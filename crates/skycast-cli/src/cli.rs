use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use skycast_core::config::{Config, ModelKind};
use skycast_core::events::{EventBus, Notification};
use skycast_predict::{
    heuristic_condition, DiagnosticsClient, PredictionResult, PredictionViewModel,
    PredictorClient, PredictorInputs,
};
use skycast_weather::{
    popular_cities, weekly_outlook, ExplicitCoords, FetchCoordinator, Geocoder, LocationQuery,
    LocationResolver, LocationSource, UvLevel, WeatherApi, WeatherView,
};

use crate::report;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "skycast",
    version,
    about = "Weather dashboard and prediction advisory client"
)]
pub struct Cli {
    /// Override the API base URL (also settable via SKYCAST_API_URL).
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show current weather, forecast and prediction for a location.
    Show {
        #[arg(long)]
        lat: Option<f64>,

        #[arg(long)]
        lon: Option<f64>,

        /// Place name shown for explicit coordinates (skips reverse geocoding).
        #[arg(long)]
        city: Option<String>,

        /// Shift the view to a date inside the daily forecast (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Search for a city by name.
    Search {
        /// City name, at least three characters.
        name: String,
    },

    /// Run a prediction from explicit inputs.
    Predict {
        #[arg(long, default_value_t = 25.0)]
        temperature: f64,

        #[arg(long, default_value_t = 60.0)]
        humidity: f64,

        #[arg(long, default_value_t = 0.0)]
        rainfall: f64,

        #[arg(long = "wind-speed", default_value_t = 10.0)]
        wind_speed: f64,

        /// Model to use: standard, lstm or ensemble.
        #[arg(long, default_value = "standard")]
        model: String,
    },

    /// Show backend diagnostics (metrics and model status).
    Status,

    /// Fetch weather plus prediction and write a text report.
    Report {
        #[arg(long)]
        lat: Option<f64>,

        #[arg(long)]
        lon: Option<f64>,

        #[arg(long)]
        city: Option<String>,

        /// Output file path.
        #[arg(short, long, default_value = "weather_report.txt")]
        output: PathBuf,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let (config, _) = Config::load_validated()?;
        let base_url = self
            .api_url
            .clone()
            .unwrap_or_else(|| config.api.base_url.clone());

        let events = EventBus::default();
        let mut notifications = events.subscribe();

        let result = match self.command {
            Command::Show {
                lat,
                lon,
                city,
                date,
            } => {
                show(&base_url, &config, &events, explicit(lat, lon, city), date).await
            }
            Command::Search { name } => search(&base_url, &name).await,
            Command::Predict {
                temperature,
                humidity,
                rainfall,
                wind_speed,
                model,
            } => {
                let inputs = PredictorInputs {
                    temperature,
                    humidity,
                    rainfall,
                    wind_speed,
                };
                let kind = ModelKind::try_from(model.as_str())?;
                predict(&base_url, &events, kind, inputs).await
            }
            Command::Status => status(&base_url).await,
            Command::Report {
                lat,
                lon,
                city,
                output,
            } => write_report(&base_url, &config, &events, explicit(lat, lon, city), &output).await,
        };

        // Surface anything the services wanted the user to see.
        while let Ok(Notification { level, message }) = notifications.try_recv() {
            eprintln!("[{}] {}", level.label(), message);
        }

        result
    }
}

fn explicit(lat: Option<f64>, lon: Option<f64>, city: Option<String>) -> Option<ExplicitCoords> {
    match (lat, lon) {
        (Some(latitude), Some(longitude)) => Some(ExplicitCoords {
            latitude,
            longitude,
            city,
        }),
        _ => None,
    }
}

fn fallback_query(config: &Config) -> LocationQuery {
    LocationQuery {
        latitude: config.weather.default_latitude,
        longitude: config.weather.default_longitude,
        display_name: config.weather.default_city.clone(),
        source: LocationSource::Default,
    }
}

async fn fetch_view(
    base_url: &str,
    config: &Config,
    events: &EventBus,
    coords: Option<ExplicitCoords>,
    date: Option<NaiveDate>,
) -> Result<Arc<WeatherView>> {
    let api = WeatherApi::new(base_url)?;
    let geocoder = Arc::new(Geocoder::new(api.clone()));
    let resolver = LocationResolver::new(None, geocoder, fallback_query(config));

    let query = resolver.resolve(coords).await;

    let coordinator = FetchCoordinator::new(api, events.clone());
    coordinator.activate(query);
    let view = coordinator.fetch(date).await?;
    Ok(view)
}

async fn show(
    base_url: &str,
    config: &Config,
    events: &EventBus,
    coords: Option<ExplicitCoords>,
    date: Option<NaiveDate>,
) -> Result<()> {
    let view = fetch_view(base_url, config, events, coords, date).await?;
    print_view(&view);

    // Feed the snapshot into the predictor
    let inputs = PredictorInputs {
        temperature: view.snapshot.temperature,
        humidity: view.snapshot.humidity,
        rainfall: view.snapshot.rainfall,
        wind_speed: view.snapshot.wind_speed,
    };
    let client = PredictorClient::new(base_url)?;
    let view_model = PredictionViewModel::new(client, config.api.model, events.clone());
    let prediction = view_model.predict(&inputs, &CancellationToken::new()).await;
    print_prediction(&prediction);

    Ok(())
}

async fn search(base_url: &str, name: &str) -> Result<()> {
    let api = WeatherApi::new(base_url)?;
    let results = api.search_city(name, &CancellationToken::new()).await?;

    if results.is_empty() {
        println!("No cities found for '{name}'. Try one of these:");
        for city in popular_cities() {
            print_city(&city);
        }
        return Ok(());
    }

    for city in &results {
        print_city(city);
    }
    println!("\nUse: skycast show --lat <lat> --lon <lon> --city <name>");

    Ok(())
}

fn print_city(city: &skycast_weather::CityMatch) {
    let country = city.country.as_deref().unwrap_or("-");
    println!(
        "{:<24} {:<16} lat {:>9.4}  lon {:>9.4}",
        city.name, country, city.latitude, city.longitude
    );
}

async fn predict(
    base_url: &str,
    events: &EventBus,
    kind: ModelKind,
    inputs: PredictorInputs,
) -> Result<()> {
    let client = PredictorClient::new(base_url)?;
    let classifier = client.clone();
    let view_model = PredictionViewModel::new(client, kind, events.clone());

    let cancel = CancellationToken::new();
    let prediction = view_model.predict(&inputs, &cancel).await;
    print_prediction(&prediction);

    let condition = match classifier.classify(&inputs, &cancel).await {
        Ok(label) => label,
        Err(_) => heuristic_condition(inputs.temperature, inputs.rainfall).to_string(),
    };
    println!("  Classifier: {condition}");

    Ok(())
}

async fn status(base_url: &str) -> Result<()> {
    let client = DiagnosticsClient::new(base_url)?;
    let cancel = CancellationToken::new();

    let status = client
        .status(&cancel)
        .await
        .context("Backend status unavailable")?;

    println!(
        "Backend: {}",
        if status.is_online() { "online" } else { "offline" }
    );
    if !status.models_in_dir.is_empty() {
        println!("Models: {}", status.models_in_dir.join(", "));
    }
    if let Some(err) = &status.cache_error {
        println!("Model cache error: {err}");
    }
    if let Some(lstm) = status.lstm_loaded {
        println!("LSTM loaded: {lstm}");
    }

    match client.metrics(&cancel).await {
        Ok(metrics) => {
            if let Some(acc) = metrics.temperature_accuracy {
                println!("Temperature accuracy: {acc:.1}%");
            }
            if let Some(acc) = metrics.rainfall_accuracy {
                println!("Rainfall accuracy: {acc:.1}%");
            }
            for (model, features) in &metrics.feature_importance {
                println!("{model} feature importance:");
                for (feature, weight) in features {
                    println!("  {feature:<16} {weight:.3}");
                }
            }
        }
        Err(e) => println!("Metrics unavailable: {}", e.user_message()),
    }

    Ok(())
}

async fn write_report(
    base_url: &str,
    config: &Config,
    events: &EventBus,
    coords: Option<ExplicitCoords>,
    output: &std::path::Path,
) -> Result<()> {
    let view = fetch_view(base_url, config, events, coords, None).await?;

    let inputs = PredictorInputs {
        temperature: view.snapshot.temperature,
        humidity: view.snapshot.humidity,
        rainfall: view.snapshot.rainfall,
        wind_speed: view.snapshot.wind_speed,
    };
    let client = PredictorClient::new(base_url)?;
    let view_model = PredictionViewModel::new(client, config.api.model, events.clone());
    let prediction = view_model.predict(&inputs, &CancellationToken::new()).await;

    let contents = report::render_report(
        &view.query,
        &view.snapshot,
        &view.forecast,
        Some(&prediction),
    );
    report::write_report(output, &contents)?;

    println!("Report written to {}", output.display());
    Ok(())
}

fn print_view(view: &WeatherView) {
    let snapshot = &view.snapshot;
    println!("Weather for {}", view.query.display_name);
    println!(
        "  {}  {:.1}\u{b0}C  [{}]",
        snapshot.description,
        snapshot.temperature,
        snapshot.condition().icon_name()
    );
    println!(
        "  Humidity {:.0}%   Rainfall {:.1} mm   Wind {:.1} km/h",
        snapshot.humidity, snapshot.rainfall, snapshot.wind_speed
    );

    if let Some(summary) = &view.summary {
        println!(
            "\nSummary for {}: avg {:.1}\u{b0}C, rain {:.1} mm, wind {:.1} km/h",
            summary.date, summary.avg_temperature, summary.rainfall, summary.wind_speed
        );
    }

    if !view.forecast.daily.is_empty() {
        println!("\nDaily forecast:");
        for day in &view.forecast.daily {
            let uv = day
                .uv_index_max
                .map(|uv| format!("  UV {}", UvLevel::from_index(uv).label()))
                .unwrap_or_default();
            println!(
                "  {}  {:>5.1}\u{b0} / {:>5.1}\u{b0}  rain {:>3.0}%  wind {:>4.1} km/h{}",
                day.date,
                day.temperature_min,
                day.temperature_max,
                day.precipitation_probability,
                day.wind_speed_max,
                uv
            );
        }
        println!("  {}", weekly_outlook(&view.forecast.daily));
    }
}

fn print_prediction(prediction: &PredictionResult) {
    println!("\nPrediction ({})", prediction.method);
    if prediction.degraded {
        println!("  NOTE: demo estimate - the predictor could not be reached.");
    }
    println!(
        "  {}  {:.1}\u{b0}C  {:.1} mm",
        prediction.classification, prediction.predicted_temperature, prediction.predicted_rainfall
    );
    println!("  Advisory: {}", prediction.advisory);
    for alert in &prediction.alerts {
        println!("  ALERT: {alert}");
    }
    for tip in &prediction.tips {
        println!("  - {}", tip.text);
    }
    if let Some(breakdown) = &prediction.breakdown {
        if let Some(models) = breakdown.as_object() {
            println!("  Ensemble breakdown:");
            for (model, values) in models {
                println!("    {model}: {values}");
            }
        }
    }
}
