use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::map::{CameraPose, LatLngAltitude, StrokeStyle};

pub const CONFIG_PATH_ENV: &str = "GEOVOICE_CONFIG";
pub const SETTLE_MARGIN_ENV: &str = "GEOVOICE_SETTLE_MARGIN_MS";
pub const ORBIT_RATE_ENV: &str = "GEOVOICE_ORBIT_RATE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandLayerConfig {
    pub camera: CameraConfig,
    pub dispatch: DispatchConfig,
    pub capture: CaptureConfig,
    pub conversation: ConversationConfig,
}

impl CommandLayerConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("failed to parse command layer config")
    }

    /// Loads `GEOVOICE_CONFIG` when set, then applies the env overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {path}"))?;
                Self::from_json_str(&raw)?
            }
            _ => Self::default(),
        };

        if let Ok(value) = std::env::var(SETTLE_MARGIN_ENV) {
            match value.parse::<u64>() {
                Ok(ms) => config.camera.settle_margin = Duration::from_millis(ms),
                Err(err) => warn!(
                    target: "config",
                    %err,
                    value = %value,
                    "ignoring invalid settle margin override"
                ),
            }
        }

        if let Ok(value) = std::env::var(ORBIT_RATE_ENV) {
            match value.parse::<f64>() {
                Ok(rate) if rate.is_finite() => config.camera.orbit_degrees_per_second = rate,
                _ => warn!(target: "config", value = %value, "ignoring invalid orbit rate override"),
            }
        }

        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub orbit_degrees_per_second: f64,
    /// Cadence of the orbit loop, standing in for the host's frame callback.
    pub frame_interval: Duration,
    /// Camera range above which the view counts as "in space".
    pub space_range_threshold: f64,
    pub globe_range: f64,
    pub enter_space_duration: Duration,
    pub leave_space_duration: Duration,
    /// Extra wait after the globe flight before checking whether to orbit.
    /// Best-effort: the map engine gives no completion signal.
    pub settle_margin: Duration,
    /// Used when leaving space without a saved pose.
    pub home_pose: CameraPose,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            orbit_degrees_per_second: 2.0,
            frame_interval: Duration::from_millis(16),
            space_range_threshold: 20_000_000.0,
            globe_range: 25_000_000.0,
            enter_space_duration: Duration::from_millis(3_000),
            leave_space_duration: Duration::from_millis(2_000),
            settle_margin: Duration::from_millis(250),
            home_pose: CameraPose {
                center: LatLngAltitude::new(0.0, 0.0, 0.0),
                heading: 0.0,
                tilt: 0.0,
                range: 10_000_000.0,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub location_altitude: f64,
    pub location_tilt: f64,
    pub location_range: f64,
    pub location_flight: Duration,
    pub label_max_chars: usize,
    pub route_altitude_offset: f64,
    pub route_range_scale: f64,
    pub route_min_range: f64,
    pub route_tilt: f64,
    pub route_flight: Duration,
    pub route_stroke: StrokeStyle,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            location_altitude: 1_000.0,
            location_tilt: 45.0,
            location_range: 4_000.0,
            location_flight: Duration::from_millis(2_500),
            label_max_chars: 30,
            route_altitude_offset: 5.0,
            route_range_scale: 1.7,
            route_min_range: 2_000.0,
            route_tilt: 45.0,
            route_flight: Duration::from_millis(2_000),
            route_stroke: StrokeStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub language: String,
    pub interim_results: bool,
    pub buffer_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            interim_results: true,
            buffer_capacity: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub suggested_prompts: Vec<String>,
    pub event_capacity: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            suggested_prompts: vec![
                "Fly me to the Eiffel Tower".to_string(),
                "Show me directions from London to Paris".to_string(),
                "Take me to Mount Fuji".to_string(),
                "How do I drive from San Francisco to Los Angeles?".to_string(),
                "Show me the Grand Canyon".to_string(),
            ],
            event_capacity: 64,
        }
    }
}
