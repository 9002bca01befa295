//! Qualifying analytics: teammate delta, track evolution, peak performance
//! window and sector dominance.
//!
//! None of these exclude laps run under yellow or red track status: a
//! qualifying lap either stands on the timing screen or it does not.

use crate::record::{LapRecord, Sector};
use crate::stats::round_to;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Width of one track evolution bucket, in seconds of session clock.
pub const EVOLUTION_BUCKET_S: f64 = 300.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeammateDelta {
    pub delta_ms: f64,
    pub delta_pct: f64,
    pub driver_faster: bool,
}

/// Gap from a driver's best lap to the teammate's. Negative means the driver was faster.
pub fn teammate_delta(driver_best_ms: f64, teammate_best_ms: f64) -> TeammateDelta {
    let delta_ms = driver_best_ms - teammate_best_ms;
    let delta_pct = if teammate_best_ms != 0.0 && teammate_best_ms.is_finite() {
        delta_ms / teammate_best_ms * 100.0
    } else {
        0.0
    };
    TeammateDelta {
        delta_ms: round_to(delta_ms, 1),
        delta_pct: round_to(delta_pct, 3),
        driver_faster: delta_ms < 0.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionPoint {
    /// Start of the bucket in session seconds.
    pub session_time_s: i64,
    pub best_lap_time_ms: f64,
}

/// Fastest lap completed in each five-minute slice of the session, in time order.
pub fn track_evolution(laps: &[LapRecord]) -> Vec<EvolutionPoint> {
    let mut buckets: BTreeMap<i64, f64> = BTreeMap::new();
    for lap in laps {
        let (Some(lap_time), Some(t)) = (lap.valid_lap_time(), lap.session_time_s.filter(|t| t.is_finite())) else {
            continue;
        };
        let bucket = ((t / EVOLUTION_BUCKET_S).floor() * EVOLUTION_BUCKET_S) as i64;
        buckets
            .entry(bucket)
            .and_modify(|best| *best = best.min(lap_time))
            .or_insert(lap_time);
    }
    buckets
        .into_iter()
        .map(|(session_time_s, best_lap_time_ms)| EvolutionPoint {
            session_time_s,
            best_lap_time_ms,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakWindow {
    pub window_start_s: i64,
    pub window_end_s: i64,
    pub best_lap_ms: f64,
}

/// Session-time span in which the fastest fifth of all laps were set.
pub fn peak_performance_window(laps: &[LapRecord]) -> Option<PeakWindow> {
    let timed: Vec<(f64, f64)> = laps
        .iter()
        .filter_map(|lap| Some((lap.valid_lap_time()?, lap.session_time_s.filter(|t| t.is_finite())?)))
        .collect();
    if timed.is_empty() {
        return None;
    }

    let mut sorted: Vec<f64> = timed.iter().map(|(lap_time, _)| *lap_time).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let top_count = (sorted.len() / 5).max(1);
    let threshold = sorted[top_count - 1];

    let peak_clock: Vec<f64> = timed
        .iter()
        .filter(|(lap_time, _)| *lap_time <= threshold)
        .map(|(_, clock)| *clock)
        .collect();
    let start = peak_clock.iter().copied().fold(f64::INFINITY, f64::min);
    let end = peak_clock.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(PeakWindow {
        window_start_s: start.round() as i64,
        window_end_s: end.round() as i64,
        best_lap_ms: round_to(sorted[0], 1),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorLeader {
    pub driver_id: String,
    pub time_ms: f64,
}

/// Fastest driver in each sector. Sectors nobody set a time in are left out.
pub fn sector_dominance(laps: &[LapRecord]) -> BTreeMap<Sector, SectorLeader> {
    let mut result = BTreeMap::new();
    for sector in Sector::ALL {
        let mut best_by_driver: BTreeMap<&str, f64> = BTreeMap::new();
        for lap in laps.iter().filter(|lap| !lap.driver_id.is_empty()) {
            let Some(time) = lap.sector_ms(sector).filter(|t| t.is_finite() && *t > 0.0) else {
                continue;
            };
            best_by_driver
                .entry(lap.driver_id.as_str())
                .and_modify(|best| *best = best.min(time))
                .or_insert(time);
        }

        let leader = best_by_driver
            .into_iter()
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        if let Some((driver, time)) = leader {
            result.insert(
                sector,
                SectorLeader {
                    driver_id: driver.to_string(),
                    time_ms: round_to(time, 1),
                },
            );
        }
    }
    result
}
