//! Runtime configuration.
//!
//! Settings loaded from an INI file. Every value has a safe default, so a
//! missing file or a missing key just keeps the default.
//!
//! # Configuration File Format
//!
//! ```ini
//! [scene]
//! depth_epsilon = 0.000001
//! contract_checks = true
//!
//! [simulation]
//! frames = 600
//! delta = 0.016666668
//! entities = 48
//! seed = 7
//! time_scale = 1
//! ```

use std::path::PathBuf;

use configparser::ini::Ini;
use log::{info, warn};

use crate::error::{CoreError, CoreResult};

/// Default safe values for startup
pub const DEFAULT_DEPTH_EPSILON: f64 = 0.000001;
pub const DEFAULT_CONTRACT_CHECKS: bool = cfg!(debug_assertions);
pub const DEFAULT_FRAMES: u32 = 600;
pub const DEFAULT_DELTA: f32 = 1.0 / 60.0;
pub const DEFAULT_ENTITIES: u32 = 48;
pub const DEFAULT_SEED: u64 = 7;
pub const DEFAULT_TIME_SCALE: f32 = 1.0;
pub const DEFAULT_CONFIG_PATH: &str = "./cinder2d.ini";

/// Scene-facing subset of the configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneConfig {
    /// Offset between entities that share a declared depth.
    pub depth_epsilon: f64,
    /// Whether usage contract violations (such as querying an untracked
    /// type) are reported as errors. When off they quietly yield nothing.
    pub contract_checks: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            depth_epsilon: DEFAULT_DEPTH_EPSILON,
            contract_checks: DEFAULT_CONTRACT_CHECKS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub depth_epsilon: f64,
    pub contract_checks: bool,
    /// Frames the headless sandbox runs.
    pub frames: u32,
    /// Fixed frame delta in seconds.
    pub delta: f32,
    /// Enemies spawned by the sandbox.
    pub entities: u32,
    pub seed: u64,
    pub time_scale: f32,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GameConfig {
    pub fn new() -> Self {
        Self {
            depth_epsilon: DEFAULT_DEPTH_EPSILON,
            contract_checks: DEFAULT_CONTRACT_CHECKS,
            frames: DEFAULT_FRAMES,
            delta: DEFAULT_DELTA,
            entities: DEFAULT_ENTITIES,
            seed: DEFAULT_SEED,
            time_scale: DEFAULT_TIME_SCALE,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    pub fn scene_config(&self) -> SceneConfig {
        SceneConfig {
            depth_epsilon: self.depth_epsilon,
            contract_checks: self.contract_checks,
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current values.
    pub fn load_from_file(&mut self) -> CoreResult<()> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| CoreError::Config(format!("failed to load config file: {e}")))?;
        self.apply(&config);

        info!(
            "Loaded config: epsilon={}, checks={}, frames={}, delta={}, entities={}, seed={}",
            self.depth_epsilon,
            self.contract_checks,
            self.frames,
            self.delta,
            self.entities,
            self.seed
        );
        Ok(())
    }

    /// Load configuration from INI text.
    pub fn load_from_str(&mut self, text: &str) -> CoreResult<()> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| CoreError::Config(format!("failed to parse config: {e}")))?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        // [scene] section
        if let Some(epsilon) = config.getfloat("scene", "depth_epsilon").ok().flatten() {
            // Offsets within a depth must strictly increase.
            if epsilon > 0.0 {
                self.depth_epsilon = epsilon;
            } else {
                warn!("ignoring non-positive depth_epsilon {epsilon}");
            }
        }
        if let Some(checks) = config.getbool("scene", "contract_checks").ok().flatten() {
            self.contract_checks = checks;
        }

        // [simulation] section
        if let Some(frames) = config.getuint("simulation", "frames").ok().flatten() {
            match u32::try_from(frames) {
                Ok(frames) => self.frames = frames,
                Err(_) => warn!("ignoring out-of-range frames {frames}"),
            }
        }
        if let Some(delta) = config.getfloat("simulation", "delta").ok().flatten() {
            self.delta = delta as f32;
        }
        if let Some(entities) = config.getuint("simulation", "entities").ok().flatten() {
            match u32::try_from(entities) {
                Ok(entities) => self.entities = entities,
                Err(_) => warn!("ignoring out-of-range entities {entities}"),
            }
        }
        if let Some(seed) = config.getuint("simulation", "seed").ok().flatten() {
            self.seed = seed;
        }
        if let Some(scale) = config.getfloat("simulation", "time_scale").ok().flatten() {
            self.time_scale = scale as f32;
        }
    }

    /// Save configuration to the INI file, creating it if needed.
    pub fn save_to_file(&self) -> CoreResult<()> {
        let mut config = Ini::new();

        // [scene] section
        config.set("scene", "depth_epsilon", Some(self.depth_epsilon.to_string()));
        config.set("scene", "contract_checks", Some(self.contract_checks.to_string()));

        // [simulation] section
        config.set("simulation", "frames", Some(self.frames.to_string()));
        config.set("simulation", "delta", Some(self.delta.to_string()));
        config.set("simulation", "entities", Some(self.entities.to_string()));
        config.set("simulation", "seed", Some(self.seed.to_string()));
        config.set("simulation", "time_scale", Some(self.time_scale.to_string()));

        config
            .write(&self.config_path)
            .map_err(|e| CoreError::Config(format!("failed to save config file: {e}")))?;

        info!("Saved config to {:?}", self.config_path);
        Ok(())
    }
}
