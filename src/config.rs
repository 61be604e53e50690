use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, Result};
use crate::synth::DeliveryStrategy;
use crate::timing::DEFAULT_SPREAD_RATIO;

/// Engine settings, loadable from a JSON file.
///
/// ```json
/// {
///   "strategy": "key_sequence",
///   "spread_ratio": 0.5,
///   "seed": 7,
///   "state_file": "cadence-state.json"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub strategy: DeliveryStrategy,
    /// Jitter standard deviation as a fraction of the mean interval.
    pub spread_ratio: f64,
    /// Fixed RNG seed for reproducible timing.
    pub seed: Option<u64>,
    /// Where session snapshots are written.
    pub state_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: DeliveryStrategy::default(),
            spread_ratio: DEFAULT_SPREAD_RATIO,
            seed: None,
            state_file: None,
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| CadenceError::config_load(path.display().to_string(), e.to_string()))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| CadenceError::config_load(path.display().to_string(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.spread_ratio.is_finite() || self.spread_ratio < 0.0 {
            return Err(CadenceError::config_validation(format!(
                "spread_ratio must be a finite value >= 0, got {}",
                self.spread_ratio
            )));
        }
        Ok(())
    }
}

/// Convert a duration in minutes to whole milliseconds.
pub fn minutes_to_ms(minutes: f64) -> Result<u64> {
    if !minutes.is_finite() || minutes < 0.0 {
        return Err(CadenceError::invalid_request(format!(
            "duration must be a finite number of minutes >= 0, got {minutes}"
        )));
    }
    Ok((minutes * 60_000.0).round() as u64)
}
