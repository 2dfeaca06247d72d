use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, Environment, File, FileFormat};
use aurus_dead_reckoning::Pose;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
/// Names an extra TOML file layered over the default one.
const CONFIG_PATH_ENV: &str = "AURUS_ODOM_CONFIG";
const ENV_PREFIX: &str = "AURUS_ODOM";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] ::config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OdomConfig {
    pub topics: TopicNames,
    pub frames: Frames,
    #[serde(default)]
    pub publisher: PublisherSettings,
    pub bus: BusSettings,
    pub monitor: MonitorSettings,
    /// Pose applied through the override handler before any input is read.
    #[serde(default)]
    pub initial_pose: Option<Pose>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TopicNames {
    pub velocity: String,
    pub resync: String,
    pub initial_pose: String,
    pub odom: String,
    pub tf: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Frames {
    /// Fixed frame the pose is expressed in.
    pub odom: String,
    /// Moving frame attached to the platform.
    pub base: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PublisherSettings {
    /// `None` publishes as fast as the thread can spin.
    #[serde(default)]
    pub rate_hz: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BusSettings {
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MonitorSettings {
    /// Minimum spacing between odometry log lines; 0 disables the monitor.
    pub interval_ms: u64,
}

impl Default for OdomConfig {
    fn default() -> Self {
        OdomConfig {
            topics: TopicNames {
                velocity: "/navigation_velocity_smoother/raw_cmd_vel".into(),
                resync: "/move_base_simple/goal".into(),
                initial_pose: "/initialpose".into(),
                odom: "odom".into(),
                tf: "/tf".into(),
            },
            frames: Frames {
                odom: "odom".into(),
                base: "base_footprint".into(),
            },
            publisher: PublisherSettings::default(),
            bus: BusSettings { capacity: 16 },
            monitor: MonitorSettings { interval_ms: 1_000 },
            initial_pose: None,
        }
    }
}

impl OdomConfig {
    /// Defaults, then `config/default.toml`, then the file named by
    /// `AURUS_ODOM_CONFIG`, then `AURUS_ODOM_<SECTION>__<KEY>` variables.
    pub fn load() -> Result<Self, ConfigError> {
        info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

        let mut builder = Self::defaults()?
            .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(false));
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            info!(%path, "Layering configuration file");
            builder = builder.add_source(File::new(&path, FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        match Self::finish(builder) {
            Ok(config) => {
                info!("Successfully loaded configuration: {:?}", config);
                Ok(config)
            }
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                Err(e)
            }
        }
    }

    /// Defaults overlaid with an in-memory TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::finish(Self::defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let topics = [
            ("topics.velocity", &self.topics.velocity),
            ("topics.resync", &self.topics.resync),
            ("topics.initial_pose", &self.topics.initial_pose),
            ("topics.odom", &self.topics.odom),
            ("topics.tf", &self.topics.tf),
            ("frames.odom", &self.frames.odom),
            ("frames.base", &self.frames.base),
        ];
        if let Some((key, _)) = topics.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("{key} must not be empty")));
        }
        if self.frames.odom == self.frames.base {
            return Err(ConfigError::Invalid(format!(
                "frames.odom and frames.base must differ (both `{}`)",
                self.frames.odom
            )));
        }
        if let Some(rate) = self.publisher.rate_hz {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "publisher.rate_hz must be a positive number, got {rate}"
                )));
            }
        }
        if self.bus.capacity == 0 {
            return Err(ConfigError::Invalid("bus.capacity must be positive".into()));
        }
        Ok(())
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let d = OdomConfig::default();
        Ok(Config::builder()
            .set_default("topics.velocity", d.topics.velocity)?
            .set_default("topics.resync", d.topics.resync)?
            .set_default("topics.initial_pose", d.topics.initial_pose)?
            .set_default("topics.odom", d.topics.odom)?
            .set_default("topics.tf", d.topics.tf)?
            .set_default("frames.odom", d.frames.odom)?
            .set_default("frames.base", d.frames.base)?
            .set_default("bus.capacity", d.bus.capacity as u64)?
            .set_default("monitor.interval_ms", d.monitor.interval_ms)?)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: OdomConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
