//! Tyre degradation: a least-squares slope of lap time against lap number for
//! every stint, fitted with linfa.

use crate::record::{group_laps, Compound, LapRecord, StintKey};
use crate::stats::{median, round_to};
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

// Stints longer than this lose their outlap and inlap before fitting.
const TRIM_ABOVE_LAPS: usize = 3;
const MIN_FIT_POINTS: usize = 3;

/// Tyre degradation over one stint on one compound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StintDegradation {
    pub stint: u32,
    pub compound: Compound,
    /// ms lost per lap; positive means the tyre is going off. `None` when no line can be fitted.
    pub slope_ms_per_lap: Option<f64>,
    /// Laps in the stint before outlap/inlap trimming.
    pub lap_count: usize,
    /// Median of the trimmed laps.
    pub median_time_ms: f64,
}

/// Least-squares slope of `y` against `x`. Fewer than three points or a constant
/// `x` leave the slope undefined.
pub fn ols_slope(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() < MIN_FIT_POINTS || x.len() != y.len() {
        return None;
    }
    let mean_x = x.iter().sum::<f64>() / x.len() as f64;
    let spread: f64 = x.iter().map(|v| (v - mean_x) * (v - mean_x)).sum();
    if spread == 0.0 {
        return None;
    }

    let records = Array2::from_shape_vec((x.len(), 1), x.to_vec()).ok()?;
    let targets = Array1::from_vec(y.to_vec());
    let ds = Dataset::new(records, targets);

    let fitted = LinearRegression::new().fit(&ds).ok()?;
    fitted.params().get(0).copied().filter(|s| s.is_finite())
}

fn analyze_stint(key: &StintKey<'_>, laps: &[&LapRecord]) -> Option<StintDegradation> {
    let mut points: Vec<(u32, f64)> = laps
        .iter()
        .filter_map(|lap| Some((lap.lap_number?, lap.valid_lap_time()?)))
        .collect();
    points.sort_by_key(|(n, _)| *n);

    let lap_count = points.len();
    let representative = if lap_count > TRIM_ABOVE_LAPS {
        &points[1..lap_count - 1]
    } else {
        &points[..]
    };

    let x: Vec<f64> = representative.iter().map(|(n, _)| f64::from(*n)).collect();
    let y: Vec<f64> = representative.iter().map(|(_, t)| *t).collect();
    let median_time_ms = round_to(median(&y)?, 1);

    let slope = ols_slope(&x, &y).map(|s| round_to(s, 3));
    if slope.is_none() {
        tracing::debug!(
            driver = key.driver_id,
            stint = key.stint,
            compound = %key.compound,
            laps = lap_count,
            "degradation slope undefined"
        );
    }

    Some(StintDegradation {
        stint: key.stint,
        compound: key.compound,
        slope_ms_per_lap: slope,
        lap_count,
        median_time_ms,
    })
}

/// Degradation slope for every (driver, stint, compound) run in the session.
///
/// Untimed laps, laps without a lap number or stint, and laps run under
/// SC/VSC/red flag are left out. Stints come back ordered by stint number then compound.
pub fn degradation_slopes(laps: &[LapRecord]) -> BTreeMap<String, Vec<StintDegradation>> {
    let groups = group_laps(laps, |lap| {
        if lap.valid_lap_time().is_none() || lap.lap_number.is_none() || lap.is_neutralised() {
            return None;
        }
        Some(StintKey {
            driver_id: lap.driver_id.as_str(),
            stint: lap.stint?,
            compound: lap.compound,
        })
    });

    let analyzed: Vec<(&str, Option<StintDegradation>)> = groups
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(key, stint_laps)| (key.driver_id, analyze_stint(&key, &stint_laps)))
        .collect();

    let mut result: BTreeMap<String, Vec<StintDegradation>> = BTreeMap::new();
    for (driver, stint) in analyzed {
        if let Some(stint) = stint {
            result.entry(driver.to_string()).or_default().push(stint);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stint_laps(driver: &str, times: &[f64], stint: u32, compound: Compound) -> Vec<LapRecord> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| LapRecord {
                driver_id: driver.to_string(),
                lap_number: Some(i as u32 + 1),
                lap_time_ms: Some(*t),
                stint: Some(stint),
                compound,
                track_status: "1".to_string(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_positive_slope() {
        let times: Vec<f64> = (0..10).map(|i| 90_000.0 + i as f64 * 100.0).collect();
        let result = degradation_slopes(&stint_laps("VER", &times, 1, Compound::Soft));
        let stints = &result["VER"];
        assert_eq!(stints.len(), 1);
        let slope = stints[0].slope_ms_per_lap.expect("slope should be defined");
        assert!((slope - 100.0).abs() < 10.0, "slope was {slope}");
        assert_eq!(stints[0].lap_count, 10);
        // Trimmed laps 2..=9 -> median of 90100..=90800
        assert_eq!(stints[0].median_time_ms, 90_450.0);
    }

    #[test]
    fn test_stable_laps_near_zero_slope() {
        let result = degradation_slopes(&stint_laps("HAM", &[90_000.0; 8], 1, Compound::Medium));
        let slope = result["HAM"][0].slope_ms_per_lap.expect("slope should be defined");
        assert!(slope.abs() < 5.0);
    }

    #[test]
    fn test_short_stint_has_no_slope() {
        let result = degradation_slopes(&stint_laps("ALO", &[90_000.0, 90_100.0], 2, Compound::Hard));
        let stint = &result["ALO"][0];
        assert_eq!(stint.slope_ms_per_lap, None);
        assert_eq!(stint.lap_count, 2);
        assert_eq!(stint.median_time_ms, 90_050.0);
    }

    #[test]
    fn test_four_laps_trim_to_two_points() {
        // 4 laps trims to 2 points, which is below the fit minimum.
        let result = degradation_slopes(&stint_laps("PIA", &[90_000.0, 90_100.0, 90_200.0, 90_300.0], 1, Compound::Soft));
        assert_eq!(result["PIA"][0].slope_ms_per_lap, None);
        assert_eq!(result["PIA"][0].lap_count, 4);
    }

    #[test]
    fn test_three_laps_fit_untrimmed() {
        let result = degradation_slopes(&stint_laps("PIA", &[90_000.0, 90_050.0, 90_100.0], 1, Compound::Soft));
        let slope = result["PIA"][0].slope_ms_per_lap.expect("slope should be defined");
        assert!((slope - 50.0).abs() < 1.0);
    }

    #[test]
    fn test_neutralised_laps_excluded_and_groups_split() {
        let mut laps = stint_laps("RUS", &[90_000.0; 6], 1, Compound::Medium);
        laps[3].track_status = "4".to_string();
        laps[3].lap_time_ms = Some(130_000.0);
        laps.extend(stint_laps("RUS", &[91_000.0; 6], 2, Compound::Hard));

        let result = degradation_slopes(&laps);
        let stints = &result["RUS"];
        assert_eq!(stints.len(), 2);
        assert_eq!((stints[0].stint, stints[0].compound), (1, Compound::Medium));
        assert_eq!(stints[0].lap_count, 5);
        assert_eq!(stints[0].median_time_ms, 90_000.0);
        assert_eq!((stints[1].stint, stints[1].compound), (2, Compound::Hard));
    }

    #[test]
    fn test_laps_without_stint_are_ignored() {
        let mut laps = stint_laps("GAS", &[90_000.0; 5], 1, Compound::Soft);
        for lap in &mut laps {
            lap.stint = None;
        }
        assert!(degradation_slopes(&laps).is_empty());
    }

    #[test]
    fn test_ols_slope_degenerate_inputs() {
        assert_eq!(ols_slope(&[1.0, 2.0], &[1.0, 2.0]), None);
        assert_eq!(ols_slope(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]), None);
        let slope = ols_slope(&[1.0, 2.0, 3.0, 4.0], &[10.0, 12.0, 14.0, 16.0]).unwrap();
        assert!((slope - 2.0).abs() < 1e-6);
    }
}
