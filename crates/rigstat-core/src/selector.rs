//! Session selection.

use crate::session::BenchmarkSession;

/// Index of the session for `algorithm` with the latest start.
///
/// Ties go to the session encountered first. Returns `None` when no session
/// runs that algorithm.
pub fn select_session(sessions: &[BenchmarkSession], algorithm: &str) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;
    for (index, session) in sessions.iter().enumerate() {
        if session.algorithm() != algorithm {
            continue;
        }
        match best {
            Some((_, started)) if session.started_at() <= started => {}
            _ => best = Some((index, session.started_at())),
        }
    }
    best.map(|(index, _)| index)
}
