//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use cosmos_planet::LodSettings;
use cosmos_terrain::TerrainSettings;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// The planet to generate.
    pub planet: PlanetConfig,
    /// Chunk tree level-of-detail settings.
    pub lod: LodSettings,
    /// Worker pool settings.
    pub forge: ForgeConfig,
    /// Scripted flight of the headless driver.
    pub flight: FlightConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Planet configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanetConfig {
    pub name: String,
    pub seed: u64,
    /// Planet radius in meters.
    pub radius_m: f64,
    /// Derive the terrain settings from the seed and ignore `terrain`.
    pub procedural_terrain: bool,
    pub terrain: TerrainSettings,
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            name: "Ares".to_string(),
            seed: 1337,
            radius_m: 1_000_000.0,
            procedural_terrain: false,
            terrain: TerrainSettings::default(),
        }
    }
}

impl PlanetConfig {
    /// The terrain settings the planet will actually use.
    #[must_use]
    pub fn effective_terrain(&self) -> TerrainSettings {
        if self.procedural_terrain {
            TerrainSettings::procedural(self.seed, self.radius_m)
        } else {
            self.terrain
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForgeConfig {
    /// Number of worker threads (0 = one per core, minus the main thread).
    pub workers: usize,
}

/// Scripted descent of the headless driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlightConfig {
    /// Number of frames to simulate.
    pub frames: u32,
    /// Simulated frame time in seconds.
    pub frame_dt: f64,
    /// Starting altitude above the base radius in meters.
    pub start_altitude_m: f64,
    /// Descent speed in meters per second.
    pub descent_speed_m_s: f64,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            frames: 600,
            frame_dt: 1.0 / 60.0,
            start_altitude_m: 200_000.0,
            descent_speed_m_s: 20_000.0,
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Directory for JSON log files in debug builds. Defaults to `logs/`
    /// under the config directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

/// `<platform config dir>/cosmos-journeyer`, or `./config` if the platform
/// has none.
#[must_use]
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("cosmos-journeyer"))
        .unwrap_or_else(|| PathBuf::from("config"))
}

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let mut config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.lod = config.lod.validated();
            config.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let mut new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        new_config.lod = new_config.lod.validated();
        new_config.validate()?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Reject settings no planet or flight can be built from.
    ///
    /// LOD settings are not checked here; they are clamped by
    /// [`LodSettings::validated`] instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let planet = &self.planet;
        if !(planet.radius_m.is_finite() && planet.radius_m > 0.0) {
            return Err(invalid("planet.radius_m", "must be a positive number of meters"));
        }
        let terrain = &planet.terrain;
        if !(terrain.crater_max_radius.is_finite() && terrain.crater_max_radius >= 0.0) {
            return Err(invalid("planet.terrain.crater_max_radius", "must not be negative"));
        }
        if !(0.0..=1.0).contains(&terrain.continents_fragmentation) {
            return Err(invalid("planet.terrain.continents_fragmentation", "must be in [0, 1]"));
        }
        let flight = &self.flight;
        if !(flight.frame_dt.is_finite() && flight.frame_dt > 0.0) {
            return Err(invalid("flight.frame_dt", "must be a positive number of seconds"));
        }
        if !(flight.start_altitude_m.is_finite() && flight.descent_speed_m_s.is_finite()) {
            return Err(invalid("flight", "altitude and speed must be finite"));
        }
        Ok(())
    }

    /// Whether a change from `self` to `other` requires regenerating the
    /// planet surface.
    #[must_use]
    pub fn terrain_changed(&self, other: &Config) -> bool {
        self.planet != other.planet || self.lod != other.lod
    }
}
