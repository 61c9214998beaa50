//! Benchmark sessions.
//!
//! A session is one continuous run of an algorithm under one miner setup. It
//! owns its deduplicated hash history, the sensor log, the availability log
//! and an append-only list of statistics snapshots; the latest snapshot is
//! the current one.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::availability::{AvailabilityLog, running_time};
use crate::config::EngineConfig;
use crate::record::{HashSample, SensorSample, SessionConfiguration};
use crate::stats::{self, HistogramSummary, StatSnapshot};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One benchmark run of a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSession {
    pub(crate) id: String,
    pub(crate) created_at: i64,
    pub(crate) algorithm: String,
    pub(crate) configuration: SessionConfiguration,
    /// Earliest hash entry seen, lowered as older entries arrive.
    pub(crate) started_at: i64,
    /// Latest hash entry seen. Zero until the first entry is ingested.
    pub(crate) updated_at: i64,
    pub(crate) hash_samples: HashSet<HashSample>,
    pub(crate) sensor_log: Vec<SensorSample>,
    pub(crate) availability: AvailabilityLog,
    pub(crate) snapshots: Vec<StatSnapshot>,
    pub(crate) histogram: Option<HistogramSummary>,
}

impl BenchmarkSession {
    /// Start a session at `now` for `algorithm` running under `configuration`.
    pub fn new(now: i64, algorithm: &str, configuration: SessionConfiguration) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            algorithm: algorithm.to_string(),
            configuration,
            started_at: now,
            updated_at: 0,
            hash_samples: HashSet::new(),
            sensor_log: Vec::new(),
            availability: AvailabilityLog::new(),
            snapshots: Vec::new(),
            histogram: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn configuration(&self) -> &SessionConfiguration {
        &self.configuration
    }

    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    pub fn hash_samples(&self) -> &HashSet<HashSample> {
        &self.hash_samples
    }

    pub fn sensor_log(&self) -> &[SensorSample] {
        &self.sensor_log
    }

    pub fn availability(&self) -> &AvailabilityLog {
        &self.availability
    }

    pub fn snapshots(&self) -> &[StatSnapshot] {
        &self.snapshots
    }

    pub fn histogram(&self) -> Option<&HistogramSummary> {
        self.histogram.as_ref()
    }

    /// The current statistics, if any have been computed.
    pub fn latest_snapshot(&self) -> Option<&StatSnapshot> {
        self.snapshots.last()
    }

    /// Whether the last availability mark says the session is productive.
    /// A session with no marks yet counts as available.
    pub fn is_available(&self) -> bool {
        self.availability.last().is_none_or(|m| m.available)
    }

    /// Productive seconds between start and last update.
    pub fn running_time(&self) -> Option<u64> {
        running_time(self.started_at, self.updated_at, &self.availability)
    }

    /// Record an availability transition. See [`AvailabilityLog::record`].
    pub fn change_availability(&mut self, now: i64, available: bool, closed_by_request: bool) -> bool {
        self.availability.record(now, available, closed_by_request)
    }

    /// Recompute statistics over the whole hash history and append a snapshot.
    ///
    /// Returns false, leaving snapshots and histogram untouched, when the
    /// history carries no weight.
    pub fn recompute(&mut self, now: i64, config: &EngineConfig) -> bool {
        let samples: Vec<HashSample> = self.hash_samples.iter().copied().collect();
        let Some((mut snapshot, histogram)) = stats::compute(&samples, config) else {
            log::debug!("session {}: no weighted samples, snapshot skipped", self.id);
            return false;
        };

        snapshot.timestamp = now;
        let (temperature, pool_latency) = self.sensor_averages();
        snapshot.average_temperature = temperature;
        snapshot.average_pool_latency = pool_latency;

        if let Some(running) = self.running_time() {
            snapshot.running_time = running;
            if running > 0 {
                let mut rate = snapshot.total_hash_count as f64 / running as f64;
                if config.halves_counted_rate(&self.algorithm) {
                    rate /= 2.0;
                }
                snapshot.counted_hash_rate = rate;
            }
        }

        self.snapshots.push(snapshot);
        self.histogram = Some(histogram);
        true
    }

    /// Mean temperature and mean pool latency (rounded) of the sensor log.
    fn sensor_averages(&self) -> (f64, f64) {
        if self.sensor_log.is_empty() {
            return (0.0, 0.0);
        }
        let n = self.sensor_log.len() as f64;
        let temperature = self.sensor_log.iter().map(|s| s.temperature).sum::<f64>() / n;
        let latency = self
            .sensor_log
            .iter()
            .map(|s| f64::from(s.pool_latency))
            .sum::<f64>()
            / n;
        (temperature, latency.round())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
