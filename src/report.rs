//! Whole-session report: every analyzer run once over the session's laps and
//! gathered into one serializable structure.

use crate::config::AnalyticsConfig;
use crate::consistency::consistency_per_driver;
use crate::degradation::{degradation_slopes, StintDegradation};
use crate::pace::{clean_air_baseline, pace_scores, practice_performance_index, traffic_loss};
use crate::qualifying::{peak_performance_window, sector_dominance, track_evolution, EvolutionPoint, PeakWindow, SectorLeader};
use crate::record::{laps_by_driver, LapRecord, PitStopRecord, Sector};
use crate::strategy::{pit_battles, pit_loss_median, PitBattle};
use crate::testing::{cluster_long_runs, performance_bands, stability_index, BandEntry, LongRunCluster};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Practice,
    Qualifying,
    Sprint,
    Race,
    Testing,
}

impl FromStr for SessionKind {
    type Err = String;

    /// Accepts timing-screen codes (FP1, Q, SQ, S, R) as well as full names.
    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code.trim().to_ascii_uppercase().as_str() {
            "FP1" | "FP2" | "FP3" | "P" | "PRACTICE" => Ok(SessionKind::Practice),
            "Q" | "SQ" | "SS" | "QUALIFYING" => Ok(SessionKind::Qualifying),
            "S" | "SPRINT" => Ok(SessionKind::Sprint),
            "R" | "RACE" => Ok(SessionKind::Race),
            "T" | "TEST" | "TESTING" => Ok(SessionKind::Testing),
            other => Err(format!("unknown session code '{other}'")),
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionKind::Practice => "practice",
            SessionKind::Qualifying => "qualifying",
            SessionKind::Sprint => "sprint",
            SessionKind::Race => "race",
            SessionKind::Testing => "testing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestingSummary {
    pub long_runs: Vec<LongRunCluster>,
    pub performance_bands: Vec<BandEntry>,
    pub stability_index: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub session: SessionKind,
    pub lap_count: usize,
    pub driver_count: usize,
    pub consistency_per_driver: BTreeMap<String, f64>,
    pub degradation_slopes: BTreeMap<String, Vec<StintDegradation>>,
    pub clean_air_baseline_ms: Option<f64>,
    pub traffic_loss_ms: Option<f64>,
    pub pace_scores: BTreeMap<String, f64>,
    pub sector_dominance: BTreeMap<Sector, SectorLeader>,
    pub track_evolution: Vec<EvolutionPoint>,
    /// Outer `None` when no pit stops were supplied; inner `None` when none of them parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pit_loss_median_s: Option<Option<f64>>,
    /// Race and sprint only, when pit stops were supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pit_battles: Option<Vec<PitBattle>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practice_performance_index: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_performance_window: Option<PeakWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub testing: Option<TestingSummary>,
}

/// Run every analyzer that applies to `kind` over one session.
pub fn analyze_session(
    laps: &[LapRecord],
    pit_stops: &[PitStopRecord],
    kind: SessionKind,
    config: &AnalyticsConfig,
) -> SessionReport {
    let by_driver = laps_by_driver(laps);

    let consistency = consistency_per_driver(laps);
    let pace = pace_scores(&by_driver);
    let baseline = clean_air_baseline(laps, config.clean_air_gap_s);

    let ppi_by_driver: Option<BTreeMap<String, f64>> = (kind == SessionKind::Practice).then(|| {
        pace.iter()
            .map(|(driver, pace_score)| {
                let consistency_score = consistency.get(driver).copied().unwrap_or(0.0);
                let ppi = practice_performance_index(*pace_score, consistency_score, config.practice_weights);
                (driver.clone(), ppi)
            })
            .collect()
    });

    let peak_window = if kind == SessionKind::Qualifying {
        peak_performance_window(laps)
    } else {
        None
    };

    let testing = (kind == SessionKind::Testing).then(|| {
        let long_runs = cluster_long_runs(laps, config.min_long_run_laps);
        let bands = performance_bands(&long_runs);
        TestingSummary {
            long_runs,
            performance_bands: bands,
            stability_index: stability_index(&by_driver),
        }
    });

    let pit_loss_median_s = (!pit_stops.is_empty()).then(|| pit_loss_median(pit_stops));

    let racing = matches!(kind, SessionKind::Race | SessionKind::Sprint);
    let battles = (racing && !pit_stops.is_empty())
        .then(|| pit_battles(&by_driver, pit_stops, config.strategy_window_laps));

    let report = SessionReport {
        session: kind,
        lap_count: laps.len(),
        driver_count: by_driver.len(),
        consistency_per_driver: consistency,
        degradation_slopes: degradation_slopes(laps),
        clean_air_baseline_ms: baseline,
        traffic_loss_ms: traffic_loss(laps, baseline, config.traffic_gap_s),
        pace_scores: pace,
        sector_dominance: sector_dominance(laps),
        track_evolution: track_evolution(laps),
        pit_loss_median_s,
        pit_battles: battles,
        practice_performance_index: ppi_by_driver,
        peak_performance_window: peak_window,
        testing,
    };

    tracing::info!(
        session = %kind,
        laps = report.lap_count,
        drivers = report.driver_count,
        stints = report.degradation_slopes.values().map(Vec::len).sum::<usize>(),
        baseline_ms = ?report.clean_air_baseline_ms,
        "session analyzed"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_codes() {
        assert_eq!("FP2".parse::<SessionKind>(), Ok(SessionKind::Practice));
        assert_eq!("q".parse::<SessionKind>(), Ok(SessionKind::Qualifying));
        assert_eq!("SQ".parse::<SessionKind>(), Ok(SessionKind::Qualifying));
        assert_eq!("S".parse::<SessionKind>(), Ok(SessionKind::Sprint));
        assert_eq!("R".parse::<SessionKind>(), Ok(SessionKind::Race));
        assert_eq!("testing".parse::<SessionKind>(), Ok(SessionKind::Testing));
        assert!("FP9".parse::<SessionKind>().is_err());
    }

    #[test]
    fn test_empty_session_report() {
        let report = analyze_session(&[], &[], SessionKind::Race, &AnalyticsConfig::default());
        assert_eq!(report.lap_count, 0);
        assert!(report.consistency_per_driver.is_empty());
        assert!(report.degradation_slopes.is_empty());
        assert_eq!(report.clean_air_baseline_ms, None);
        assert_eq!(report.traffic_loss_ms, None);
        assert!(report.track_evolution.is_empty());
        assert!(report.testing.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["session"], "race");
        assert!(json["clean_air_baseline_ms"].is_null());
        assert!(json.get("testing").is_none());
        assert!(json.get("pit_loss_median_s").is_none());
        assert!(json.get("pit_battles").is_none());
    }

    fn pit(driver: &str, lap: u32, duration: &str) -> PitStopRecord {
        PitStopRecord {
            driver_id: driver.to_string(),
            lap: Some(lap),
            duration: duration.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_unparsable_pit_stops_report_null_loss() {
        let stops = vec![pit("VER", 20, "n/a"), pit("HAM", 21, "")];
        let report = analyze_session(&[], &stops, SessionKind::Race, &AnalyticsConfig::default());
        assert_eq!(report.pit_loss_median_s, Some(None));

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["pit_loss_median_s"].is_null());
        assert!(json.as_object().unwrap().contains_key("pit_loss_median_s"));
    }

    #[test]
    fn test_pit_battles_follow_configured_window() {
        let stops = vec![pit("VER", 20, "23.1"), pit("HAM", 24, "23.4")];

        let report = analyze_session(&[], &stops, SessionKind::Race, &AnalyticsConfig::default());
        assert_eq!(report.pit_battles, Some(Vec::new()));
        assert_eq!(report.pit_loss_median_s, Some(Some(23.25)));

        let mut config = AnalyticsConfig::default();
        config.strategy_window_laps = 5;
        let report = analyze_session(&[], &stops, SessionKind::Race, &config);
        let battles = report.pit_battles.unwrap();
        assert_eq!(battles.len(), 1);
        assert_eq!((battles[0].undercutter.as_str(), battles[0].stayed_out.as_str()), ("VER", "HAM"));

        // Cuts are only evaluated for racing sessions.
        let report = analyze_session(&[], &stops, SessionKind::Qualifying, &config);
        assert!(report.pit_battles.is_none());
    }
}
