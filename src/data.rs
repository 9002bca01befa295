//! CSV ingestion for lap and pit stop files. Bad rows are logged and skipped so
//! one corrupt line does not cost the whole session.

use crate::error::Result;
use crate::record::{Compound, LapRecord, PitStopRecord};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::io;
use std::path::Path;

// One CSV row. Column names follow the record fields; the aliases accept the
// capitalised headers FastF1 exports use. FastF1 writes lap and stint numbers as
// floats ("7.0"), so both are read as f64 and narrowed afterwards.
#[derive(Debug, Deserialize)]
struct LapRow {
    #[serde(alias = "Driver")] driver_id: Option<String>,
    #[serde(alias = "LapNumber")] lap_number: Option<f64>,
    lap_time_ms: Option<f64>,
    sector1_ms: Option<f64>,
    sector2_ms: Option<f64>,
    sector3_ms: Option<f64>,
    #[serde(alias = "Compound")] compound: Option<String>,
    #[serde(alias = "Stint")] stint: Option<f64>,
    #[serde(alias = "TrackStatus")] track_status: Option<String>,
    gap_ahead_s: Option<f64>,
    session_time_s: Option<f64>,
    #[serde(alias = "IsPersonalBest")] is_personal_best: Option<String>,
}

/// Whole, non-negative numbers that fit a `u32`; anything else is treated as missing.
fn whole_number(value: Option<f64>) -> Option<u32> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0 && *v <= f64::from(u32::MAX))
        .map(|v| v as u32)
}

impl From<LapRow> for LapRecord {
    fn from(row: LapRow) -> Self {
        LapRecord {
            driver_id: row.driver_id.unwrap_or_default().trim().to_string(),
            lap_number: whole_number(row.lap_number),
            lap_time_ms: row.lap_time_ms,
            sector1_ms: row.sector1_ms,
            sector2_ms: row.sector2_ms,
            sector3_ms: row.sector3_ms,
            compound: row.compound.as_deref().map(Compound::from).unwrap_or_default(),
            stint: whole_number(row.stint),
            track_status: row.track_status.unwrap_or_default().trim().to_string(),
            gap_ahead_s: row.gap_ahead_s,
            session_time_s: row.session_time_s,
            is_personal_best: row
                .is_personal_best
                .is_some_and(|flag| matches!(flag.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")),
        }
    }
}

/// Read laps from CSV with a header row. Rows that do not fit the lap shape are
/// skipped and logged; a missing file or broken header is an error.
pub fn read_laps<R: io::Read>(reader: R) -> Result<Vec<LapRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(reader);
    let mut laps = Vec::new();

    for (i, res) in reader.deserialize::<LapRow>().enumerate() {
        match res {
            Ok(row) => laps.push(LapRecord::from(row)),
            Err(e) if e.is_io_error() => return Err(e.into()),
            // +2: one for the header, one for 1-based line numbers
            Err(e) => tracing::warn!(line = i + 2, error = %e, "skipping malformed lap row"),
        }
    }
    Ok(laps)
}

pub fn load_laps<P: AsRef<Path>>(path: P) -> Result<Vec<LapRecord>> {
    let file = std::fs::File::open(path)?;
    read_laps(file)
}

pub fn read_pit_stops<R: io::Read>(reader: R) -> Result<Vec<PitStopRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(reader);
    let mut stops = Vec::new();

    for (i, res) in reader.deserialize::<PitStopRecord>().enumerate() {
        match res {
            Ok(stop) => stops.push(stop),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => tracing::warn!(line = i + 2, error = %e, "skipping malformed pit stop row"),
        }
    }
    Ok(stops)
}

pub fn load_pit_stops<P: AsRef<Path>>(path: P) -> Result<Vec<PitStopRecord>> {
    let file = std::fs::File::open(path)?;
    read_pit_stops(file)
}
