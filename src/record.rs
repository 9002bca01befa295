//! Lap and pit-stop records as delivered by the upstream normaliser.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tyre compound tag. Anything the normaliser does not recognise lands in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Inter,
    Wet,
    #[default]
    Unknown,
}

impl From<String> for Compound {
    fn from(tag: String) -> Self {
        Compound::from(tag.as_str())
    }
}

impl From<&str> for Compound {
    fn from(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "SOFT" => Compound::Soft,
            "MEDIUM" => Compound::Medium,
            "HARD" => Compound::Hard,
            "INTER" | "INTERMEDIATE" => Compound::Inter,
            "WET" => Compound::Wet,
            _ => Compound::Unknown,
        }
    }
}

impl Compound {
    pub fn as_str(self) -> &'static str {
        match self {
            Compound::Soft => "SOFT",
            Compound::Medium => "MEDIUM",
            Compound::Hard => "HARD",
            Compound::Inter => "INTER",
            Compound::Wet => "WET",
            Compound::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timed lap for one driver.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LapRecord {
    #[serde(default)]
    pub driver_id: String,
    #[serde(default)]
    pub lap_number: Option<u32>,
    #[serde(default)]
    pub lap_time_ms: Option<f64>,
    #[serde(default)]
    pub sector1_ms: Option<f64>,
    #[serde(default)]
    pub sector2_ms: Option<f64>,
    #[serde(default)]
    pub sector3_ms: Option<f64>,
    #[serde(default)]
    pub compound: Compound,
    #[serde(default)]
    pub stint: Option<u32>,
    #[serde(default)]
    pub track_status: String,
    #[serde(default)]
    pub gap_ahead_s: Option<f64>,
    #[serde(default)]
    pub session_time_s: Option<f64>,
    #[serde(default)]
    pub is_personal_best: bool,
}

// Status digits for safety car, virtual safety car and red flag.
const NEUTRALISED_CODES: [char; 3] = ['4', '5', '6'];

impl LapRecord {
    /// The lap time if it can count towards a statistic: present, finite and positive.
    pub fn valid_lap_time(&self) -> Option<f64> {
        self.lap_time_ms.filter(|t| t.is_finite() && *t > 0.0)
    }

    /// True when the lap ran under SC, VSC or red flag. Codes may be concatenated ("14").
    pub fn is_neutralised(&self) -> bool {
        self.track_status.contains(&NEUTRALISED_CODES[..])
    }

    /// True only for an explicit all-clear status: empty or "1".
    pub fn is_green(&self) -> bool {
        matches!(self.track_status.trim(), "" | "1")
    }

    pub fn sector_ms(&self, sector: Sector) -> Option<f64> {
        match sector {
            Sector::Sector1 => self.sector1_ms,
            Sector::Sector2 => self.sector2_ms,
            Sector::Sector3 => self.sector3_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sector {
    Sector1,
    Sector2,
    Sector3,
}

impl Sector {
    pub const ALL: [Sector; 3] = [Sector::Sector1, Sector::Sector2, Sector::Sector3];
}

/// A pit stop as reported by the timing provider. `duration` is kept raw because
/// providers disagree on the decimal separator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PitStopRecord {
    #[serde(default)]
    pub driver_id: String,
    #[serde(default)]
    pub stop: Option<u32>,
    #[serde(default)]
    pub lap: Option<u32>,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub time: String,
}

/// Key identifying one run on one tyre set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StintKey<'a> {
    pub driver_id: &'a str,
    pub stint: u32,
    pub compound: Compound,
}

/// Partition laps by an arbitrary key. Laps for which `key` returns `None` are dropped.
/// Input order is preserved inside each group.
pub fn group_laps<'a, K, I, F>(laps: I, mut key: F) -> BTreeMap<K, Vec<&'a LapRecord>>
where
    K: Ord,
    I: IntoIterator<Item = &'a LapRecord>,
    F: FnMut(&'a LapRecord) -> Option<K>,
{
    let mut groups: BTreeMap<K, Vec<&'a LapRecord>> = BTreeMap::new();
    for lap in laps {
        if let Some(k) = key(lap) {
            groups.entry(k).or_default().push(lap);
        }
    }
    groups
}

pub type DriverLaps<'a> = BTreeMap<&'a str, Vec<&'a LapRecord>>;

/// Per-driver partition. Unattributed laps (empty driver id) are dropped.
pub fn laps_by_driver<'a, I>(laps: I) -> DriverLaps<'a>
where
    I: IntoIterator<Item = &'a LapRecord>,
{
    group_laps(laps, |lap| {
        let id = lap.driver_id.as_str();
        (!id.is_empty()).then_some(id)
    })
}
