//! Representative-lap selection used before any pace or consistency statistic.

use crate::record::LapRecord;
use crate::stats::{median, sample_std_dev};

/// Below this many clean laps there is no meaningful spread to reject outliers against.
const MIN_OUTLIER_SAMPLE: usize = 3;
const OUTLIER_STD_DEVS: f64 = 2.0;

/// Keep laps that are timed, not run under SC/VSC/red flag, and within two
/// standard deviations of the median lap time.
pub fn representative_laps<'a, I>(laps: I) -> Vec<&'a LapRecord>
where
    I: IntoIterator<Item = &'a LapRecord>,
{
    let timed: Vec<&LapRecord> = laps
        .into_iter()
        .filter(|lap| lap.valid_lap_time().is_some() && !lap.is_neutralised())
        .collect();

    if timed.len() < MIN_OUTLIER_SAMPLE {
        return timed;
    }

    let times: Vec<f64> = timed.iter().filter_map(|lap| lap.valid_lap_time()).collect();
    let (Some(mid), Some(std)) = (median(&times), sample_std_dev(&times)) else {
        return timed;
    };

    timed
        .into_iter()
        .filter(|lap| {
            lap.valid_lap_time()
                .is_some_and(|t| (t - mid).abs() <= OUTLIER_STD_DEVS * std)
        })
        .collect()
}

/// Lap times of [`representative_laps`].
pub fn representative_times<'a, I>(laps: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a LapRecord>,
{
    representative_laps(laps)
        .into_iter()
        .filter_map(LapRecord::valid_lap_time)
        .collect()
}
