//! Analyzer thresholds. Every field has a default, so a config file only needs
//! the values it wants to change.

use crate::error::{LapMetricsError, Result};
use crate::pace::{PracticeWeights, DEFAULT_CLEAN_AIR_GAP_S, DEFAULT_TRAFFIC_GAP_S};
use crate::strategy::DEFAULT_WINDOW_LAPS;
use crate::testing::DEFAULT_MIN_LONG_RUN_LAPS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Gap to the car ahead above which a lap counts as clean air (s).
    pub clean_air_gap_s: f64,
    /// Gap to the car ahead below which a lap counts as in traffic (s).
    pub traffic_gap_s: f64,
    /// Laps either side of a stop compared by the undercut/overcut evaluators.
    pub strategy_window_laps: u32,
    /// Shortest stint that counts as a long run in testing.
    pub min_long_run_laps: usize,
    pub practice_weights: PracticeWeights,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            clean_air_gap_s: DEFAULT_CLEAN_AIR_GAP_S,
            traffic_gap_s: DEFAULT_TRAFFIC_GAP_S,
            strategy_window_laps: DEFAULT_WINDOW_LAPS,
            min_long_run_laps: DEFAULT_MIN_LONG_RUN_LAPS,
            practice_weights: PracticeWeights::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Read a JSON config file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let config: AnalyticsConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(LapMetricsError::InvalidConfig(format!("{name} must be a positive number, got {v}")))
            }
        };
        positive("clean_air_gap_s", self.clean_air_gap_s)?;
        positive("traffic_gap_s", self.traffic_gap_s)?;

        if self.strategy_window_laps == 0 {
            return Err(LapMetricsError::InvalidConfig("strategy_window_laps must be at least 1".into()));
        }
        if self.min_long_run_laps == 0 {
            return Err(LapMetricsError::InvalidConfig("min_long_run_laps must be at least 1".into()));
        }

        let w = self.practice_weights;
        if !(w.pace.is_finite() && w.pace >= 0.0 && w.consistency.is_finite() && w.consistency >= 0.0) {
            return Err(LapMetricsError::InvalidConfig(format!(
                "practice_weights must be non-negative, got pace={} consistency={}",
                w.pace, w.consistency
            )));
        }
        Ok(())
    }
}
