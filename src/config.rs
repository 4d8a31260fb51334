use std::time::Duration;

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use dc_motor::MotorConfig;
use serde::Deserialize;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const CONFIG_PATH_VAR: &str = "DC_MOTOR_CONFIG";
const ENV_PREFIX: &str = "DC_MOTOR";

/// Everything the bench needs to run.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub motor: MotorConfig,
    pub bench: BenchSettings,
    #[serde(default)]
    pub commands: Vec<ScriptStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BenchSettings {
    pub control_period_ms: u64,
    pub telemetry_period_ms: u64,
    pub encoder_period_us: u64,
    /// Encoder edges per second for each volt on the simulated bridge.
    pub ticks_per_volt_second: f32,
    #[serde(default)]
    pub start_position: f32,
    pub position_horizon_ms: u64,
    pub watchdog_timeout_ms: u64,
    pub run_ms: u64,
}

impl BenchSettings {
    pub fn control_period(&self) -> Duration {
        Duration::from_millis(self.control_period_ms)
    }

    pub fn telemetry_period(&self) -> Duration {
        Duration::from_millis(self.telemetry_period_ms)
    }

    pub fn encoder_period(&self) -> Duration {
        Duration::from_micros(self.encoder_period_us)
    }

    pub fn position_horizon(&self) -> Duration {
        Duration::from_millis(self.position_horizon_ms)
    }

    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    pub fn run_time(&self) -> Duration {
        Duration::from_millis(self.run_ms)
    }
}

/// A scripted command, applied once `at_ms` has elapsed since start.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScriptStep {
    pub at_ms: u64,
    pub action: Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Hold a signed speed (deg/s).
    Speed(f32),
    /// Head for a position (deg), re-evaluated every control tick.
    Position(f32),
    /// Apply an acceleration (deg/s²) every control tick.
    Acceleration(f32),
    /// Stop and clear the estimator.
    Reset,
}

/// Loads settings from `DC_MOTOR_CONFIG` (or `config/default.toml`) with
/// `DC_MOTOR__SECTION__KEY` environment overrides.
pub fn load_settings() -> anyhow::Result<Settings> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    info!("Attempting to load configuration from {}", path);

    let settings = Config::builder()
        .add_source(File::new(&path, FileFormat::Toml).required(true))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true))
        .build();

    let settings = match settings {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e).with_context(|| format!("reading {}", path));
        }
    };

    let settings = parse(settings).with_context(|| format!("parsing {}", path))?;
    info!(
        commands = settings.commands.len(),
        "Successfully loaded configuration: {:?}", settings.motor
    );
    Ok(settings)
}

fn parse(config: Config) -> anyhow::Result<Settings> {
    let mut settings: Settings = config.try_deserialize()?;
    settings.motor.validate()?;
    let bench = &settings.bench;
    let periods = [
        ("control_period_ms", bench.control_period_ms),
        ("telemetry_period_ms", bench.telemetry_period_ms),
        ("encoder_period_us", bench.encoder_period_us),
        ("position_horizon_ms", bench.position_horizon_ms),
        ("watchdog_timeout_ms", bench.watchdog_timeout_ms),
    ];
    if let Some((name, _)) = periods.iter().find(|(_, value)| *value == 0) {
        anyhow::bail!("bench.{} must be positive", name);
    }
    settings.commands.sort_by_key(|step| step.at_ms);
    Ok(settings)
}
