//! Pre-season testing analytics: long-run clustering, performance bands and
//! the per-driver stability index.

use crate::record::{group_laps, Compound, DriverLaps, LapRecord, StintKey};
use crate::stats::{median, round_to, sample_std_dev};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const DEFAULT_MIN_LONG_RUN_LAPS: usize = 8;

/// One long run: a stint of at least the minimum length on one compound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRunCluster {
    pub driver_id: String,
    pub stint: u32,
    pub compound: Compound,
    pub lap_count: usize,
    pub median_ms: f64,
    pub std_ms: f64,
    pub lap_start: Option<u32>,
    pub lap_end: Option<u32>,
}

/// Runs of `min_run_length` or more timed laps, ordered by driver, stint and compound.
pub fn cluster_long_runs(laps: &[LapRecord], min_run_length: usize) -> Vec<LongRunCluster> {
    let groups = group_laps(laps, |lap| {
        lap.valid_lap_time()?;
        Some(StintKey {
            driver_id: lap.driver_id.as_str(),
            stint: lap.stint?,
            compound: lap.compound,
        })
    });

    groups
        .into_iter()
        .filter_map(|(key, run)| {
            if run.len() < min_run_length {
                tracing::debug!(driver = key.driver_id, stint = key.stint, laps = run.len(), "run too short for long-run analysis");
                return None;
            }
            let times: Vec<f64> = run.iter().filter_map(|lap| lap.valid_lap_time()).collect();
            let lap_numbers = run.iter().filter_map(|lap| lap.lap_number);
            Some(LongRunCluster {
                driver_id: key.driver_id.to_string(),
                stint: key.stint,
                compound: key.compound,
                lap_count: times.len(),
                median_ms: round_to(median(&times)?, 1),
                std_ms: sample_std_dev(&times).map_or(0.0, |s| round_to(s, 1)),
                lap_start: lap_numbers.clone().min(),
                lap_end: lap_numbers.max(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Band {
    Top,
    Midfield,
    Tail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandEntry {
    pub driver_id: String,
    pub best_long_run_ms: f64,
    pub band: Band,
    pub rank: usize,
}

/// Split drivers into Top, Midfield and Tail by their best long-run median.
///
/// Each band gets `max(1, n / 3)` drivers in rank order; the remainder falls into Tail.
pub fn performance_bands(clusters: &[LongRunCluster]) -> Vec<BandEntry> {
    let mut best: BTreeMap<&str, f64> = BTreeMap::new();
    for cluster in clusters {
        best.entry(cluster.driver_id.as_str())
            .and_modify(|m| *m = m.min(cluster.median_ms))
            .or_insert(cluster.median_ms);
    }

    let mut ranked: Vec<(&str, f64)> = best.into_iter().collect();
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    let band_size = (ranked.len() / 3).max(1);

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (driver, best_ms))| BandEntry {
            driver_id: driver.to_string(),
            best_long_run_ms: round_to(best_ms, 1),
            band: if i < band_size {
                Band::Top
            } else if i < 2 * band_size {
                Band::Midfield
            } else {
                Band::Tail
            },
            rank: i + 1,
        })
        .collect()
}

/// Spread of every valid lap a driver set in the test. Lower is more stable.
pub fn stability_index(laps_by_driver: &DriverLaps<'_>) -> BTreeMap<String, f64> {
    laps_by_driver
        .iter()
        .filter_map(|(driver, laps)| {
            let times: Vec<f64> = laps.iter().filter_map(|lap| lap.valid_lap_time()).collect();
            let index = match times.len() {
                0 => return None,
                1 => 0.0,
                _ => round_to(sample_std_dev(&times)?, 1),
            };
            Some((driver.to_string(), index))
        })
        .collect()
}
