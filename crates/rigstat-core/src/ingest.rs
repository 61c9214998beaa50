//! Ingestion of parsed samples into a benchmark session.

use serde::{Deserialize, Serialize};

use crate::record::{HashSample, SensorSample};
use crate::session::BenchmarkSession;

/// Counts from one hash ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub duplicates: usize,
}

impl BenchmarkSession {
    /// Add hash entries to the history, dropping exact duplicates.
    ///
    /// Each new entry may lower the session start (and with it the first
    /// availability mark), advance the last update, and pull a by-request
    /// reopen mark back to the entry's timestamp.
    pub fn ingest_hash_samples(&mut self, samples: &[HashSample]) -> IngestReport {
        let mut report = IngestReport::default();
        for sample in samples {
            if !self.hash_samples.insert(*sample) {
                report.duplicates += 1;
                continue;
            }
            report.accepted += 1;

            let ts = sample.timestamp;
            if self.started_at == 0 || ts < self.started_at {
                self.started_at = ts;
                self.availability.backdate_start(ts);
            }
            if self.updated_at == 0 || ts > self.updated_at {
                self.updated_at = ts;
            }
            self.availability.backdate_reopen(ts);
        }
        report
    }

    /// Append a sensor reading. Readings have no identity and are never deduplicated.
    pub fn ingest_sensor_sample(&mut self, sample: SensorSample) {
        self.sensor_log.push(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SessionConfiguration;

    fn sample(ts: i64, rate: f64) -> HashSample {
        HashSample {
            timestamp: ts,
            hash_rate: rate,
            hash_count: 100,
            ..Default::default()
        }
    }

    fn session(now: i64) -> BenchmarkSession {
        BenchmarkSession::new(now, "lyra2v2", SessionConfiguration::default())
    }

    #[test]
    fn test_duplicates_are_discarded() {
        let mut s = session(1000);
        let first = s.ingest_hash_samples(&[sample(10, 1.0), sample(20, 2.0)]);
        assert_eq!(first, IngestReport { accepted: 2, duplicates: 0 });

        let (start, updated) = (s.started_at(), s.updated_at());
        let second = s.ingest_hash_samples(&[sample(10, 1.0), sample(20, 2.0)]);
        assert_eq!(second, IngestReport { accepted: 0, duplicates: 2 });
        assert_eq!(s.hash_samples().len(), 2);
        assert_eq!((s.started_at(), s.updated_at()), (start, updated));
    }

    #[test]
    fn test_start_and_update_track_extremes() {
        let mut s = session(1000);
        s.ingest_hash_samples(&[sample(500, 1.0)]);
        assert_eq!((s.started_at(), s.updated_at()), (500, 500));
        s.ingest_hash_samples(&[sample(400, 1.0), sample(700, 1.0), sample(600, 1.0)]);
        assert_eq!((s.started_at(), s.updated_at()), (400, 700));
    }

    #[test]
    fn test_start_backdate_moves_first_mark() {
        let mut s = session(1000);
        s.change_availability(1000, true, false);
        s.ingest_hash_samples(&[sample(900, 1.0)]);
        assert_eq!(s.availability().marks()[0].timestamp, 900);
    }

    #[test]
    fn test_reopen_backdated_by_older_entry() {
        let mut s = session(0);
        s.ingest_hash_samples(&[sample(100, 1.0)]);
        s.change_availability(100, true, false);
        s.change_availability(200, false, true);
        s.change_availability(400, true, false);

        s.ingest_hash_samples(&[sample(300, 1.0)]);
        let last = s.availability().last().unwrap();
        assert!(last.available);
        assert_eq!(last.timestamp, 300);
        assert!(s.availability().is_consistent());
    }

    #[test]
    fn test_duplicate_does_not_backdate() {
        let mut s = session(0);
        s.ingest_hash_samples(&[sample(300, 1.0)]);
        s.change_availability(300, true, false);
        s.change_availability(350, false, true);
        s.change_availability(400, true, false);

        s.ingest_hash_samples(&[sample(300, 1.0)]);
        assert_eq!(s.availability().last().unwrap().timestamp, 400);
    }

    #[test]
    fn test_sensor_samples_always_appended() {
        let mut s = session(0);
        let reading = SensorSample {
            timestamp: 5,
            temperature: 61.0,
            ..Default::default()
        };
        s.ingest_sensor_sample(reading);
        s.ingest_sensor_sample(reading);
        assert_eq!(s.sensor_log().len(), 2);
    }
}
