//! Consistency index: lap-time spread mapped onto a 0-100 score.

use crate::filter::representative_times;
use crate::record::{laps_by_driver, LapRecord};
use crate::stats::{round_to, sample_std_dev};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// A standard deviation at or above this many milliseconds scores zero.
pub const MAX_STD_MS: f64 = 3000.0;

const MIN_CLEAN_LAPS: usize = 3;

/// 100 for a perfectly repeatable driver, 0 for one scattering by 3 s or more.
/// Fewer than three clean laps is not evidence of consistency and scores 0.0.
pub fn consistency_index<'a, I>(laps: I) -> f64
where
    I: IntoIterator<Item = &'a LapRecord>,
{
    let clean = representative_times(laps);
    if clean.len() < MIN_CLEAN_LAPS {
        return 0.0;
    }
    let std = sample_std_dev(&clean).unwrap_or(0.0);
    round_to((100.0 * (1.0 - std / MAX_STD_MS)).max(0.0), 1)
}

/// Consistency score for every attributable driver in a mixed lap set.
pub fn consistency_per_driver(laps: &[LapRecord]) -> BTreeMap<String, f64> {
    let grouped: Vec<(&str, Vec<&LapRecord>)> = laps_by_driver(laps).into_iter().collect();
    grouped
        .into_par_iter()
        .map(|(driver, driver_laps)| (driver.to_string(), consistency_index(driver_laps)))
        .collect()
}
