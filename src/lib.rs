//! # lapmetrics
//!
//! Performance metrics for motorsport sessions, derived from per-lap timing records.
//!
//! - Representative-lap filtering (safety car, invalid laps, outliers)
//! - Consistency index and field-relative pace scores
//! - Tyre degradation slopes per stint and compound
//! - Clean-air baseline and traffic loss
//! - Undercut/overcut evaluation, pit battles and pit loss
//! - Qualifying: teammate delta, track evolution, peak window, sector dominance
//! - Testing: long-run clustering, performance bands, stability index
//!
//! Every analyzer is a pure function over borrowed records. Missing or
//! insufficient data shows up as `None` or a neutral score, never as an error;
//! errors only come from reading files (see [`data`] and [`config`]).

#![forbid(unsafe_code)]

pub mod config;
pub mod consistency;
pub mod data;
pub mod degradation;
pub mod error;
pub mod filter;
pub mod pace;
pub mod qualifying;
pub mod record;
pub mod report;
pub mod stats;
pub mod strategy;
pub mod testing;

pub use config::AnalyticsConfig;
pub use error::{LapMetricsError, Result};
pub use record::{Compound, LapRecord, PitStopRecord};
pub use report::{analyze_session, SessionKind, SessionReport};
