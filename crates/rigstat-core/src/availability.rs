//! Availability tracking for a benchmark session.
//!
//! A session alternates between productive and idle periods. Each transition
//! is an [`AvailabilityMark`]; the [`AvailabilityLog`] keeps them ordered by
//! time with strictly alternating `available` flags. The only in-place edits
//! allowed are patching the first mark (start backdating) and the last mark
//! (reopen backdating), both clamped so ordering is preserved.

use serde::{Deserialize, Serialize};

/// One up/down transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityMark {
    pub timestamp: i64,
    pub available: bool,
    /// Set when the transition came from the monitor closing or reopening
    /// rather than from the device going silent.
    pub closed_by_request: bool,
}

/// Ordered, alternating sequence of availability marks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailabilityLog {
    marks: Vec<AvailabilityMark>,
}

impl AvailabilityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marks(&self) -> &[AvailabilityMark] {
        &self.marks
    }

    pub fn last(&self) -> Option<&AvailabilityMark> {
        self.marks.last()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Record a transition at `timestamp`. Returns whether a mark was added.
    ///
    /// An empty log is seeded with an "available" mark whatever `available`
    /// says. Otherwise the mark is only added when the state actually flips
    /// and the instant differs from the last mark. A transition requested
    /// before the last mark is clamped to the last mark's instant, so it is a
    /// same-instant repeat and ignored. A new "available" mark inherits the
    /// close flag of the mark it follows.
    pub fn record(&mut self, timestamp: i64, available: bool, closed_by_request: bool) -> bool {
        let Some(last) = self.marks.last().copied() else {
            self.marks.push(AvailabilityMark {
                timestamp,
                available: true,
                closed_by_request,
            });
            return true;
        };

        let timestamp = timestamp.max(last.timestamp);
        if last.available == available || last.timestamp == timestamp {
            return false;
        }

        self.marks.push(AvailabilityMark {
            timestamp,
            available,
            closed_by_request: if available {
                last.closed_by_request
            } else {
                closed_by_request
            },
        });
        true
    }

    /// Move a reopen mark back to `timestamp` when data proves the device was
    /// running before the monitor noticed.
    ///
    /// Applies only when the last mark is an "available" mark set by request
    /// and is later than `timestamp`. The mark never moves before the mark
    /// preceding it.
    pub fn backdate_reopen(&mut self, timestamp: i64) -> bool {
        let n = self.marks.len();
        let floor = if n >= 2 {
            self.marks[n - 2].timestamp
        } else {
            i64::MIN
        };
        let Some(last) = self.marks.last_mut() else {
            return false;
        };
        if !last.available || !last.closed_by_request || timestamp >= last.timestamp {
            return false;
        }

        let patched = timestamp.max(floor);
        if patched == last.timestamp {
            return false;
        }
        last.timestamp = patched;
        true
    }

    /// Pull the first mark back to a new, earlier session start.
    pub fn backdate_start(&mut self, start: i64) {
        if let Some(first) = self.marks.first_mut() {
            if start < first.timestamp {
                first.timestamp = start;
            }
        }
    }

    /// Total length of every "unavailable → available" gap.
    pub fn idle_time(&self) -> i64 {
        self.marks
            .windows(2)
            .filter(|w| !w[0].available && w[1].available)
            .map(|w| w[1].timestamp - w[0].timestamp)
            .sum()
    }

    /// Flags alternate and timestamps never decrease.
    pub fn is_consistent(&self) -> bool {
        self.marks
            .windows(2)
            .all(|w| w[0].available != w[1].available && w[0].timestamp <= w[1].timestamp)
    }
}

/// Productive seconds between `start` and `updated`, excluding idle gaps.
///
/// Returns `None` when the elapsed window is empty or negative.
pub fn running_time(start: i64, updated: i64, log: &AvailabilityLog) -> Option<u64> {
    let elapsed = updated - start;
    if elapsed <= 0 {
        return None;
    }
    Some((elapsed - log.idle_time()).max(0) as u64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
