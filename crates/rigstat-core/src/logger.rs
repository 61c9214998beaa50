//! Per-device benchmark logger.
//!
//! A [`DeviceLogger`] owns every benchmark session of one GPU. Each telemetry
//! batch is routed to the session whose algorithm and miner setup match the
//! live report; a setup change starts a new session. The active session is
//! resolved afresh on every update and only cached for readers.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::record::{DeviceIdentity, SessionConfiguration};
use crate::schema::{LatencyTriple, LiveReport, TelemetryBatch};
use crate::selector::select_session;
use crate::session::BenchmarkSession;

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// What one update did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Index of the session that received the batch.
    pub session: usize,
    pub created_session: bool,
    pub accepted_samples: usize,
    pub duplicate_samples: usize,
    pub snapshot_appended: bool,
}

/// All benchmark sessions of one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceLogger {
    identity: DeviceIdentity,
    sessions: Vec<BenchmarkSession>,
    active: Option<usize>,
    #[serde(default)]
    config: EngineConfig,
}

impl DeviceLogger {
    pub fn new(identity: DeviceIdentity) -> Self {
        Self::with_config(identity, EngineConfig::default())
    }

    pub fn with_config(identity: DeviceIdentity, config: EngineConfig) -> Self {
        Self {
            identity,
            sessions: Vec::new(),
            active: None,
            config,
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn sessions(&self) -> &[BenchmarkSession] {
        &self.sessions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    /// Index of the most recently selected session.
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// The most recently selected session.
    pub fn current_session(&self) -> Option<&BenchmarkSession> {
        self.active.and_then(|i| self.sessions.get(i))
    }

    // -----------------------------------------------------------------------
    // Update protocol
    // -----------------------------------------------------------------------

    /// Feed one telemetry batch, stamped with the current time.
    pub fn update(&mut self, batch: &TelemetryBatch, latency: LatencyTriple) -> UpdateOutcome {
        self.update_at(batch, latency, unix_now())
    }

    /// Feed one telemetry batch received at `now`.
    pub fn update_at(
        &mut self,
        batch: &TelemetryBatch,
        latency: LatencyTriple,
        now: i64,
    ) -> UpdateOutcome {
        let report = LiveReport::parse(batch, self.identity.bus);

        let matched = select_session(&self.sessions, &report.algorithm)
            .filter(|&i| self.sessions[i].configuration == report.configuration);
        let (index, created_session) = match matched {
            Some(index) => (index, false),
            None => (
                self.create_session(now, &report.algorithm, report.configuration.clone()),
                true,
            ),
        };

        let reopen = self.sessions[index]
            .availability
            .last()
            .filter(|mark| !mark.available)
            .map(|mark| mark.closed_by_request);
        if let Some(closed_by_request) = reopen {
            self.sessions[index].change_availability(now, true, closed_by_request);
        }

        if let Some(previous) = self.active.filter(|&p| p != index) {
            if let Some(session) = self.sessions.get_mut(previous) {
                session.change_availability(now, false, false);
            }
            log::info!(
                "{}: active session switched to {} ({})",
                self.identity,
                self.sessions[index].id,
                self.sessions[index].algorithm
            );
        }
        self.active = Some(index);

        let session = &mut self.sessions[index];
        session.ingest_sensor_sample(report.sensor_sample(now, latency));
        let ingested = session.ingest_hash_samples(&report.hash_samples);
        let snapshot_appended = session.recompute(now, &self.config);

        log::debug!(
            "{}: session {} took {} new / {} duplicate samples, snapshot {}",
            self.identity,
            session.id,
            ingested.accepted,
            ingested.duplicates,
            if snapshot_appended { "appended" } else { "skipped" }
        );

        UpdateOutcome {
            session: index,
            created_session,
            accepted_samples: ingested.accepted,
            duplicate_samples: ingested.duplicates,
            snapshot_appended,
        }
    }

    // -----------------------------------------------------------------------
    // Availability
    // -----------------------------------------------------------------------

    /// Record an availability transition now. See [`Self::change_availability_at`].
    pub fn change_availability(
        &mut self,
        available: bool,
        closed_by_request: bool,
        target: Option<usize>,
    ) -> bool {
        self.change_availability_at(available, closed_by_request, target, unix_now())
    }

    /// Record an availability transition at `now` on `target`, else the
    /// active session, else the most recently created one.
    ///
    /// Returns whether a mark was added. No-op when there is no session.
    pub fn change_availability_at(
        &mut self,
        available: bool,
        closed_by_request: bool,
        target: Option<usize>,
        now: i64,
    ) -> bool {
        let index = target
            .or(self.active)
            .or_else(|| self.sessions.len().checked_sub(1));
        match index.and_then(|i| self.sessions.get_mut(i)) {
            Some(session) => session.change_availability(now, available, closed_by_request),
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Start a fresh session with the active session's algorithm and setup.
    pub fn restart_current_benchmark(&mut self) -> Option<usize> {
        self.restart_current_benchmark_at(unix_now())
    }

    /// Start a fresh session at `now` cloning the active algorithm and setup.
    ///
    /// Returns the new session's index, or `None` without an active session.
    pub fn restart_current_benchmark_at(&mut self, now: i64) -> Option<usize> {
        let current = self.current_session()?;
        let algorithm = current.algorithm.clone();
        let configuration = current.configuration.clone();
        let index = self.create_session(now, &algorithm, configuration);
        self.active = Some(index);
        log::info!("{}: benchmark restarted for {algorithm}", self.identity);
        Some(index)
    }

    /// Re-resolve the active session for `algorithm` and cache it.
    pub fn find_current_benchmark(&mut self, algorithm: &str) -> Option<usize> {
        self.active = select_session(&self.sessions, algorithm);
        self.active
    }

    /// Append a session, marking every other session of the same algorithm
    /// as unavailable.
    fn create_session(
        &mut self,
        now: i64,
        algorithm: &str,
        configuration: SessionConfiguration,
    ) -> usize {
        for session in self.sessions.iter_mut().filter(|s| s.algorithm == algorithm) {
            session.change_availability(now, false, false);
        }

        let mut session = BenchmarkSession::new(now, algorithm, configuration);
        session.change_availability(now, true, false);
        log::info!(
            "{}: new {algorithm} session {} ({})",
            self.identity,
            session.id,
            session.configuration
        );
        self.sessions.push(session);
        self.sessions.len() - 1
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
