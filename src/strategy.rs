//! Pit strategy: undercut and overcut evaluation over lap-number windows, and
//! pit loss from provider stop durations.

use crate::record::{DriverLaps, LapRecord, PitStopRecord};
use crate::stats::{mean, median, round_to};
use serde::Serialize;

pub const DEFAULT_WINDOW_LAPS: u32 = 3;

// A cut gaining more than this many ms over the window counts as clearly effective.
const EFFECTIVE_MARGIN_MS: f64 = -200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CutRating {
    Effective,
    Marginal,
    Ineffective,
    Unknown,
}

impl CutRating {
    fn from_delta(delta_ms: f64) -> Self {
        if delta_ms < EFFECTIVE_MARGIN_MS {
            CutRating::Effective
        } else if delta_ms < 0.0 {
            CutRating::Marginal
        } else {
            CutRating::Ineffective
        }
    }
}

/// Outcome of an undercut or overcut. A negative delta means the driver gained time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutEvaluation {
    pub success: Option<bool>,
    pub delta_ms: Option<f64>,
    pub rating: CutRating,
}

impl CutEvaluation {
    fn unknown() -> Self {
        Self {
            success: None,
            delta_ms: None,
            rating: CutRating::Unknown,
        }
    }

    fn compare(driver_avg: Option<f64>, competitor_avg: Option<f64>) -> Self {
        let (Some(driver), Some(competitor)) = (driver_avg, competitor_avg) else {
            return Self::unknown();
        };
        let delta = driver - competitor;
        Self {
            success: Some(delta < 0.0),
            delta_ms: Some(round_to(delta, 1)),
            rating: CutRating::from_delta(delta),
        }
    }
}

/// Mean valid lap time over lap numbers `first..=last`. Empty range or no laps -> `None`.
fn mean_over_laps<'a, I>(laps: I, first: i64, last: i64) -> Option<f64>
where
    I: IntoIterator<Item = &'a LapRecord>,
{
    let times: Vec<f64> = laps
        .into_iter()
        .filter(|lap| lap.lap_number.is_some_and(|n| (first..=last).contains(&i64::from(n))))
        .filter_map(LapRecord::valid_lap_time)
        .collect();
    mean(&times)
}

/// Undercut: the driver's pace over the `window` laps before stopping against the
/// competitor's pace over `window` laps starting at the stop lap.
pub fn evaluate_undercut<'a, D, C>(driver_laps: D, competitor_laps: C, pit_lap: u32, window: u32) -> CutEvaluation
where
    D: IntoIterator<Item = &'a LapRecord>,
    C: IntoIterator<Item = &'a LapRecord>,
{
    let pit = i64::from(pit_lap);
    let w = i64::from(window);
    let driver_before = mean_over_laps(driver_laps, pit - w, pit - 1);
    let competitor_in_window = mean_over_laps(competitor_laps, pit, pit + w - 1);
    CutEvaluation::compare(driver_before, competitor_in_window)
}

/// Overcut: the driver staying out against the competitor who just pitted, both
/// measured from the competitor's stop lap through `window` laps after it.
pub fn evaluate_overcut<'a, D, C>(
    driver_laps: D,
    competitor_laps: C,
    competitor_pit_lap: u32,
    window: u32,
) -> CutEvaluation
where
    D: IntoIterator<Item = &'a LapRecord>,
    C: IntoIterator<Item = &'a LapRecord>,
{
    let pit = i64::from(competitor_pit_lap);
    let last = pit + i64::from(window);
    CutEvaluation::compare(
        mean_over_laps(driver_laps, pit, last),
        mean_over_laps(competitor_laps, pit, last),
    )
}

/// Two drivers whose stops fell within one strategy window of each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitBattle {
    /// Driver who stopped first.
    pub undercutter: String,
    pub pit_lap: u32,
    /// Driver who stayed out and stopped later.
    pub stayed_out: String,
    pub stayed_out_pit_lap: u32,
    pub undercut: CutEvaluation,
    pub overcut: CutEvaluation,
}

/// Every pair of stops by different drivers where the second stop came at most
/// `window` laps after the first. The earlier stopper is scored on the undercut,
/// the later one on the overcut, both around the earlier stop lap.
///
/// Stops without a lap number or driver are ignored. Battles come back ordered by
/// the earlier stop lap, then driver.
pub fn pit_battles(laps_by_driver: &DriverLaps<'_>, pit_stops: &[PitStopRecord], window: u32) -> Vec<PitBattle> {
    let mut stops: Vec<(u32, &str)> = pit_stops
        .iter()
        .filter(|stop| !stop.driver_id.is_empty())
        .filter_map(|stop| Some((stop.lap?, stop.driver_id.as_str())))
        .collect();
    stops.sort_unstable();
    stops.dedup();

    let no_laps: Vec<&LapRecord> = Vec::new();
    let laps_of = |driver: &str| laps_by_driver.get(driver).unwrap_or(&no_laps);

    let mut battles = Vec::new();
    for (i, &(first_lap, first)) in stops.iter().enumerate() {
        for &(later_lap, later) in &stops[i + 1..] {
            if later_lap > first_lap.saturating_add(window) {
                break;
            }
            if later == first || later_lap == first_lap {
                continue;
            }
            let (early, late) = (laps_of(first), laps_of(later));
            let undercut = evaluate_undercut(early.iter().copied(), late.iter().copied(), first_lap, window);
            let overcut = evaluate_overcut(late.iter().copied(), early.iter().copied(), first_lap, window);
            battles.push(PitBattle {
                undercutter: first.to_string(),
                pit_lap: first_lap,
                stayed_out: later.to_string(),
                stayed_out_pit_lap: later_lap,
                undercut,
                overcut,
            });
        }
    }
    tracing::debug!(stops = stops.len(), battles = battles.len(), window, "pit battles evaluated");
    battles
}

/// Parse a provider duration string in seconds. Both "23.456" and "23,456" are accepted.
pub fn parse_duration_s(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite())
}

/// Median pit stop duration in seconds. Stops whose duration does not parse are skipped.
pub fn pit_loss_median(pit_stops: &[PitStopRecord]) -> Option<f64> {
    let durations: Vec<f64> = pit_stops
        .iter()
        .filter_map(|stop| {
            let parsed = parse_duration_s(&stop.duration);
            if parsed.is_none() {
                tracing::debug!(driver = %stop.driver_id, duration = %stop.duration, "unparsable pit stop duration");
            }
            parsed
        })
        .collect();
    median(&durations).map(|m| round_to(m, 3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::laps_by_driver;

    fn laps(driver: &str, times: &[(u32, f64)]) -> Vec<LapRecord> {
        times
            .iter()
            .map(|(n, t)| LapRecord {
                driver_id: driver.to_string(),
                lap_number: Some(*n),
                lap_time_ms: Some(*t),
                ..Default::default()
            })
            .collect()
    }

    fn stop(duration: &str) -> PitStopRecord {
        PitStopRecord {
            driver_id: "VER".to_string(),
            duration: duration.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_undercut_windows() {
        // Driver laps 17..=19 are the window before a lap-20 stop; lap 16 and 20 must not count.
        let driver = laps("VER", &[(16, 1.0), (17, 90_000.0), (18, 90_000.0), (19, 90_000.0), (20, 1.0)]);
        // Competitor window is 20..=22; lap 23 must not count.
        let competitor = laps("HAM", &[(19, 1.0), (20, 90_500.0), (21, 90_500.0), (22, 90_500.0), (23, 1.0)]);

        let eval = evaluate_undercut(&driver, &competitor, 20, DEFAULT_WINDOW_LAPS);
        assert_eq!(eval.delta_ms, Some(-500.0));
        assert_eq!(eval.success, Some(true));
        assert_eq!(eval.rating, CutRating::Effective);
    }

    #[test]
    fn test_rating_bands() {
        assert_eq!(CutRating::from_delta(-200.1), CutRating::Effective);
        assert_eq!(CutRating::from_delta(-200.0), CutRating::Marginal);
        assert_eq!(CutRating::from_delta(-0.1), CutRating::Marginal);
        assert_eq!(CutRating::from_delta(0.0), CutRating::Ineffective);
        assert_eq!(CutRating::from_delta(150.0), CutRating::Ineffective);
    }

    #[test]
    fn test_undercut_missing_window_is_unknown() {
        let driver = laps("VER", &[(30, 90_000.0)]);
        let competitor = laps("HAM", &[(20, 90_000.0)]);
        let eval = evaluate_undercut(&driver, &competitor, 20, DEFAULT_WINDOW_LAPS);
        assert_eq!(eval, CutEvaluation::unknown());

        // A pit on lap 1 has no laps before it.
        let eval = evaluate_undercut(&driver, &competitor, 1, DEFAULT_WINDOW_LAPS);
        assert_eq!(eval.rating, CutRating::Unknown);
    }

    #[test]
    fn test_overcut_window_is_inclusive() {
        let driver = laps("LEC", &[(10, 90_100.0), (11, 90_100.0), (12, 90_100.0), (13, 90_100.0), (14, 1.0)]);
        let competitor = laps("SAI", &[(10, 110_000.0), (11, 90_000.0), (12, 90_000.0), (13, 90_000.0)]);
        let eval = evaluate_overcut(&driver, &competitor, 10, DEFAULT_WINDOW_LAPS);
        // Competitor mean over 10..=13 is 95000, driver 90100.
        assert_eq!(eval.delta_ms, Some(-4900.0));
        assert_eq!(eval.rating, CutRating::Effective);
    }

    #[test]
    fn test_overcut_missing_window_is_unknown() {
        let driver = laps("LEC", &[(5, 90_000.0), (14, 90_000.0)]);
        let competitor = laps("SAI", &[(10, 90_000.0), (11, 90_000.0)]);
        // Driver has no lap in 10..=13.
        let eval = evaluate_overcut(&driver, &competitor, 10, DEFAULT_WINDOW_LAPS);
        assert_eq!(eval, CutEvaluation::unknown());
        let none: Vec<LapRecord> = Vec::new();
        assert_eq!(evaluate_overcut(&driver, &none, 10, DEFAULT_WINDOW_LAPS).rating, CutRating::Unknown);
    }

    #[test]
    fn test_pit_battles_pair_stops_within_window() {
        let mut all = laps(
            "VER",
            &[(17, 90_000.0), (18, 90_000.0), (19, 90_000.0), (20, 110_000.0), (21, 89_000.0), (22, 89_000.0), (23, 89_000.0)],
        );
        all.extend(laps(
            "HAM",
            &[(17, 90_200.0), (18, 90_200.0), (19, 90_200.0), (20, 90_400.0), (21, 90_400.0), (22, 90_400.0), (23, 90_400.0)],
        ));
        let by_driver = laps_by_driver(&all);

        let pit = |driver: &str, lap: u32| PitStopRecord {
            driver_id: driver.to_string(),
            lap: Some(lap),
            duration: "23.0".to_string(),
            ..Default::default()
        };
        let stops = vec![pit("HAM", 22), pit("VER", 20), pit("LEC", 30), pit("NOR", 20)];

        let battles = pit_battles(&by_driver, &stops, DEFAULT_WINDOW_LAPS);
        // NOR stopped on the same lap as VER; LEC is out of reach of everyone.
        assert_eq!(battles.len(), 2);
        let ver = &battles[1];
        assert_eq!((ver.undercutter.as_str(), ver.stayed_out.as_str()), ("VER", "HAM"));
        assert_eq!((ver.pit_lap, ver.stayed_out_pit_lap), (20, 22));
        // VER 17..=19 averages 90000 against HAM 20..=22 at 90400.
        assert_eq!(ver.undercut.delta_ms, Some(-400.0));
        assert_eq!(ver.undercut.rating, CutRating::Effective);
        // HAM 20..=23 at 90400 against VER 20..=23 averaging 94250.
        assert_eq!(ver.overcut.delta_ms, Some(-3850.0));

        // NOR has no laps at all, so both sides are unknown.
        assert_eq!(battles[0].undercutter, "NOR");
        assert_eq!(battles[0].undercut.rating, CutRating::Unknown);

        // A one-lap window no longer reaches HAM's stop.
        assert!(pit_battles(&by_driver, &stops, 1).is_empty());
    }

    #[test]
    fn test_parse_duration_locale_variants() {
        assert_eq!(parse_duration_s("23.456"), Some(23.456));
        assert_eq!(parse_duration_s("23,456"), Some(23.456));
        assert_eq!(parse_duration_s(" 24.1 "), Some(24.1));
        assert_eq!(parse_duration_s(""), None);
        assert_eq!(parse_duration_s("1:02.300"), None);
        assert_eq!(parse_duration_s("NaN"), None);
    }

    #[test]
    fn test_pit_loss_median() {
        let result = pit_loss_median(&[stop("23.456"), stop("24.100")]).unwrap();
        assert!((result - 23.778).abs() < 0.01);

        let result = pit_loss_median(&[stop("22,5"), stop("garbage"), stop("23.5"), stop("24.0")]);
        assert_eq!(result, Some(23.5));

        assert_eq!(pit_loss_median(&[stop("n/a")]), None);
        assert_eq!(pit_loss_median(&[]), None);
    }
}
