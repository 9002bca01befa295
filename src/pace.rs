//! Pace estimators: clean-air baseline, traffic loss, field-relative pace score
//! and the practice performance index built on top of them.

use crate::record::{DriverLaps, LapRecord};
use crate::stats::{mean, median, round_to};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_CLEAN_AIR_GAP_S: f64 = 2.0;
pub const DEFAULT_TRAFFIC_GAP_S: f64 = 1.0;

const MIN_CLEAN_AIR_LAPS: usize = 3;
const MIN_TRAFFIC_LAPS: usize = 2;

/// Green-flag lap times whose gap to the car ahead satisfies `gap_ok`.
fn green_times_by_gap<'a, I, F>(laps: I, gap_ok: F) -> Vec<f64>
where
    I: IntoIterator<Item = &'a LapRecord>,
    F: Fn(f64) -> bool,
{
    laps.into_iter()
        .filter(|lap| lap.is_green() && lap.gap_ahead_s.is_some_and(&gap_ok))
        .filter_map(LapRecord::valid_lap_time)
        .collect()
}

/// Median lap time of laps run more than `gap_threshold_s` behind the next car.
/// Needs three such laps; otherwise no baseline is asserted.
pub fn clean_air_baseline<'a, I>(laps: I, gap_threshold_s: f64) -> Option<f64>
where
    I: IntoIterator<Item = &'a LapRecord>,
{
    let clean = green_times_by_gap(laps, |gap| gap > gap_threshold_s);
    if clean.len() < MIN_CLEAN_AIR_LAPS {
        return None;
    }
    median(&clean).map(|m| round_to(m, 1))
}

/// Average time lost per lap when running within `gap_threshold_s` of the car ahead.
///
/// `None` when there is no baseline or fewer than two traffic laps. Laps at or under
/// the baseline are ignored; if every traffic lap is, the loss is 0.0.
pub fn traffic_loss<'a, I>(laps: I, baseline_ms: Option<f64>, gap_threshold_s: f64) -> Option<f64>
where
    I: IntoIterator<Item = &'a LapRecord>,
{
    let baseline = baseline_ms?;
    let traffic = green_times_by_gap(laps, |gap| gap < gap_threshold_s);
    if traffic.len() < MIN_TRAFFIC_LAPS {
        return None;
    }
    let excess: Vec<f64> = traffic
        .into_iter()
        .filter(|t| *t > baseline)
        .map(|t| t - baseline)
        .collect();
    Some(mean(&excess).map_or(0.0, |m| round_to(m, 1)))
}

/// Min-max pace score over driver medians: fastest 100, slowest 0.
/// SC/VSC/red flag laps do not count; drivers left with no valid lap are not scored.
pub fn pace_scores(laps_by_driver: &DriverLaps<'_>) -> BTreeMap<String, f64> {
    let medians: Vec<(&str, f64)> = laps_by_driver
        .iter()
        .filter_map(|(driver, laps)| {
            let times: Vec<f64> = laps
                .iter()
                .filter(|lap| !lap.is_neutralised())
                .filter_map(|lap| lap.valid_lap_time())
                .collect();
            median(&times).map(|m| (*driver, m))
        })
        .collect();

    let best = medians.iter().map(|(_, m)| *m).fold(f64::INFINITY, f64::min);
    let worst = medians.iter().map(|(_, m)| *m).fold(f64::NEG_INFINITY, f64::max);
    let spread = if worst > best { worst - best } else { 1.0 };

    medians
        .into_iter()
        .map(|(driver, m)| (driver.to_string(), round_to(100.0 * (1.0 - (m - best) / spread), 1)))
        .collect()
}

/// Relative weight of pace and consistency in the practice performance index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeWeights {
    pub pace: f64,
    pub consistency: f64,
}

impl Default for PracticeWeights {
    fn default() -> Self {
        Self {
            pace: 0.6,
            consistency: 0.4,
        }
    }
}

/// Weighted blend of a 0-100 pace score and a 0-100 consistency score, clamped to 0-100.
pub fn practice_performance_index(pace_score: f64, consistency_score: f64, weights: PracticeWeights) -> f64 {
    let ppi = weights.pace * pace_score + weights.consistency * consistency_score;
    round_to(ppi.clamp(0.0, 100.0), 1)
}
