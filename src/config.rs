use log::{info, warn};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SCAN_SECONDS: u64 = 15;
// Tilt firmware reports whole degrees Fahrenheit
const DEFAULT_TEMPERATURE_SCALE: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct WakeConfig {
    pub scan_duration: Duration,
    pub image_path: PathBuf,
    pub output_dir: PathBuf,
    pub temperature_scale: f64,
}

impl WakeConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let image_path = lookup("TILTPLATE_IMAGE")
            .map(PathBuf::from)
            .ok_or("TILTPLATE_IMAGE environment variable not set")?;

        let scan_seconds = match lookup("TILTPLATE_SCAN_SECONDS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|e| format!("Invalid TILTPLATE_SCAN_SECONDS '{}': {}", value, e))?,
            None => DEFAULT_SCAN_SECONDS,
        };
        if scan_seconds == 0 {
            warn!("TILTPLATE_SCAN_SECONDS is 0, no hydrometer data will be collected");
        }

        let temperature_scale = match lookup("TILTPLATE_TEMPERATURE_SCALE") {
            Some(value) => {
                let scale = value.trim().parse::<f64>().map_err(|e| {
                    format!("Invalid TILTPLATE_TEMPERATURE_SCALE '{}': {}", value, e)
                })?;
                if !(scale.is_finite() && scale > 0.0) {
                    return Err(format!(
                        "TILTPLATE_TEMPERATURE_SCALE must be positive, got {}",
                        scale
                    )
                    .into());
                }
                scale
            }
            None => DEFAULT_TEMPERATURE_SCALE,
        };

        let output_dir = lookup("TILTPLATE_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        info!(
            "Config: image={}, output={}, scan={}s, temperature scale={}",
            image_path.display(),
            output_dir.display(),
            scan_seconds,
            temperature_scale
        );

        Ok(WakeConfig {
            scan_duration: Duration::from_secs(scan_seconds),
            image_path,
            output_dir,
            temperature_scale,
        })
    }
}
