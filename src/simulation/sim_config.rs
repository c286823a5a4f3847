//! Operator-facing simulation parameters.
//!
//! Startup values come from `box_swarm.ron` and the environment; every value
//! that reaches the controller passes through [`SimulationConfig::clamped`].

use crate::rendering::CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Box count granularity.
pub const COUNT_STEP: usize = 100;
pub const MIN_COUNT: usize = 100;
pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 60;

const CONFIG_FILE: &str = "box_swarm.ron";
const COUNT_ENV: &str = "BOX_SWARM_BOXES";
const FPS_ENV: &str = "BOX_SWARM_FPS";

/// Operator-facing simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of boxes (multiple of 100 in [100, CAPACITY])
    pub count: usize,
    /// Simulation ticks per second (1..=60)
    pub fps: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            count: 1000,
            fps: 30,
        }
    }
}

impl SimulationConfig {
    pub fn new(count: usize, fps: u32) -> Self {
        Self { count, fps }
    }

    /// Snap `count` to the nearest step inside [MIN_COUNT, CAPACITY] and
    /// clamp `fps` to [MIN_FPS, MAX_FPS].
    pub fn clamped(self) -> Self {
        let stepped = (self.count.min(CAPACITY) + COUNT_STEP / 2) / COUNT_STEP * COUNT_STEP;
        let clamped = Self {
            count: stepped.clamp(MIN_COUNT, CAPACITY),
            fps: self.fps.clamp(MIN_FPS, MAX_FPS),
        };
        if clamped != self {
            log::warn!(
                "Simulation parameters out of range (count={}, fps={}); using count={}, fps={}",
                self.count,
                self.fps,
                clamped.count,
                clamped.fps
            );
        }
        clamped
    }

    pub fn with_count_delta(self, delta: isize) -> Self {
        Self {
            count: self.count.saturating_add_signed(delta),
            ..self
        }
        .clamped()
    }

    pub fn with_fps_delta(self, delta: i32) -> Self {
        Self {
            fps: self.fps.saturating_add_signed(delta),
            ..self
        }
        .clamped()
    }

    /// Load startup parameters: `box_swarm.ron` if present, then the
    /// `BOX_SWARM_BOXES` / `BOX_SWARM_FPS` environment overrides.
    pub fn load() -> Self {
        let path = Path::new(CONFIG_FILE);
        let mut config = if path.exists() {
            match Self::load_from_file(path) {
                Ok(config) => {
                    log::info!("Loaded simulation config from {:?}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Failed to load simulation config: {}. Using defaults.", e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        if let Some(count) = env_override(COUNT_ENV) {
            config.count = count;
        }
        if let Some(fps) = env_override(FPS_ENV) {
            config.fps = fps;
        }

        config.clamped()
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }

    pub fn from_ron(contents: &str) -> Result<Self, ConfigLoadError> {
        Ok(ron::from_str(contents)?)
    }
}

fn env_override<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a number", key, value);
            None
        }
    }
}

/// Error type for simulation config loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.count, 1000);
        assert_eq!(config.fps, 30);
        assert_eq!(config.clamped(), config);
    }

    #[test]
    fn test_clamp_bounds() {
        assert_eq!(SimulationConfig::new(0, 0).clamped(), SimulationConfig::new(100, 1));
        assert_eq!(
            SimulationConfig::new(CAPACITY * 2, 500).clamped(),
            SimulationConfig::new(CAPACITY, 60)
        );
        assert_eq!(SimulationConfig::new(449, 30).clamped().count, 400);
        assert_eq!(SimulationConfig::new(450, 30).clamped().count, 500);
        assert_eq!(
            SimulationConfig::new(usize::MAX, u32::MAX).clamped(),
            SimulationConfig::new(CAPACITY, 60)
        );
    }

    #[test]
    fn test_deltas_stay_in_range() {
        let config = SimulationConfig::new(100, 1);
        assert_eq!(config.with_count_delta(-100).count, 100);
        assert_eq!(config.with_fps_delta(-1).fps, 1);
        assert_eq!(config.with_count_delta(100).count, 200);
        assert_eq!(SimulationConfig::new(500, 60).with_fps_delta(1).fps, 60);
    }

    #[test]
    fn test_parse_ron() {
        let config = SimulationConfig::from_ron("(count: 2000, fps: 12)").unwrap();
        assert_eq!(config, SimulationConfig::new(2000, 12));

        let partial = SimulationConfig::from_ron("(fps: 5)").unwrap();
        assert_eq!(partial, SimulationConfig::new(1000, 5));

        assert!(matches!(
            SimulationConfig::from_ron("(count: \"many\")"),
            Err(ConfigLoadError::Ron(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_clamped_is_valid(count in any::<usize>(), fps in any::<u32>()) {
            let config = SimulationConfig::new(count, fps).clamped();
            prop_assert!(config.count >= MIN_COUNT && config.count <= CAPACITY);
            prop_assert_eq!(config.count % COUNT_STEP, 0);
            prop_assert!(config.fps >= MIN_FPS && config.fps <= MAX_FPS);
            prop_assert_eq!(config.clamped(), config);
        }
    }
}
