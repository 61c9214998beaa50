//! # rigstat-core
//!
//! Benchmark bookkeeping and weighted hash-rate statistics for GPU mining rigs.
//!
//! `rigstat-core` turns the telemetry a miner reports every polling cycle into
//! per-device benchmark sessions. Each session keeps a deduplicated hash
//! history, a sensor log and an availability log, and after every batch a new
//! statistics snapshot is appended: weighted means, a sigma-labelled percentile
//! ladder, moving-window quartiles, dispersion and shape coefficients, and a
//! fixed-width histogram with outliers and modes.
//!
//! ## Quick Start
//!
//! ```
//! use rigstat_core::{DeviceIdentity, DeviceLogger, LatencyTriple, RawRecord, TelemetryBatch};
//!
//! let batch = TelemetryBatch {
//!     summary: vec![RawRecord::from_pairs([("ALGO", "lyra2v2"), ("NAME", "ccminer")])],
//!     hardware_info: vec![RawRecord::from_pairs([("GPU", "0"), ("BUS", "1")])],
//!     history: vec![RawRecord::from_pairs([("TS", "100"), ("KHS", "2500.5"), ("COUNT", "40")])],
//!     ..Default::default()
//! };
//!
//! let mut logger = DeviceLogger::new(DeviceIdentity { bus: 1, ..Default::default() });
//! let outcome = logger.update_at(&batch, LatencyTriple::from([12, 30, 1]), 1_000);
//! assert!(outcome.created_session);
//!
//! let snapshot = logger.current_session().and_then(|s| s.latest_snapshot()).unwrap();
//! assert_eq!(snapshot.median(), 2500.5);
//! ```
//!
//! ## Architecture
//!
//! Batch → [`LiveReport`] (strict parse) → session selection → ingestion →
//! statistics.
//!
//! A [`DeviceLogger`] owns all sessions of one GPU and resolves the session to
//! feed at the start of every update. A [`Rig`] holds one logger per device
//! and keeps that list in step with the hardware records it sees.

pub mod availability;
pub mod config;
pub mod ingest;
pub mod logger;
pub mod record;
pub mod rig;
pub mod schema;
pub mod selector;
pub mod session;
pub mod stats;

pub use availability::{AvailabilityLog, AvailabilityMark, running_time};
pub use config::EngineConfig;
pub use ingest::IngestReport;
pub use logger::{DeviceLogger, UpdateOutcome, unix_now};
pub use record::{DeviceIdentity, HashSample, SensorSample, SessionConfiguration};
pub use rig::{DeviceChanges, Rig};
pub use schema::{Field, LatencyTriple, LiveReport, RawRecord, TelemetryBatch};
pub use selector::select_session;
pub use session::BenchmarkSession;
pub use stats::{
    DeviationAggregate, DeviationBasis, HistogramBin, HistogramSummary, PercentileLadder,
    SigmaLevel, StatSnapshot,
};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
