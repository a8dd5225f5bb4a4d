//! Pure timer math and transition rules.
//!
//! The server never ticks: elapsed time is always derived from a stored
//! millisecond start timestamp and a caller-supplied "now". All arithmetic
//! is integer seconds with truncating division, and remaining time clamps
//! at zero.

use tandem_types::models::TimerStatus;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("timer is not running")]
    NotRunning,
    #[error("timer is not paused")]
    NotPaused,
}

/// The slice of a session the engine reasons about.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    pub status: TimerStatus,
    pub start_time: Option<i64>,
    pub duration_seconds: i64,
}

/// Replacement start point produced by resume reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePoint {
    pub start_time: i64,
    pub duration_seconds: i64,
}

/// Remaining budget in whole seconds at `now_ms`.
///
/// While paused the stored fields are stale; the value last shown to the
/// caller stands until resume rewrites them, so this returns the stored
/// duration unchanged for both paused and stopped sessions.
pub fn remaining_seconds(snap: &Snapshot, now_ms: i64) -> i64 {
    match (snap.status, snap.start_time) {
        (TimerStatus::Running, Some(start)) => {
            let elapsed = (now_ms - start) / 1000;
            (snap.duration_seconds - elapsed).max(0)
        }
        _ => snap.duration_seconds,
    }
}

/// Pause is only legal while running.
pub fn ensure_can_pause(status: TimerStatus) -> Result<(), TimerError> {
    match status {
        TimerStatus::Running => Ok(()),
        _ => Err(TimerError::NotRunning),
    }
}

/// Resume is only legal while paused.
pub fn ensure_can_resume(status: TimerStatus) -> Result<(), TimerError> {
    match status {
        TimerStatus::Paused => Ok(()),
        _ => Err(TimerError::NotPaused),
    }
}

/// Rewrite the start point so that a later remaining-time read against the
/// new values reproduces the budget left at the resume instant: elapsed
/// seconds (still draining while paused — pause never freezes the clock)
/// are folded out of the duration, and the clock restarts at `now_ms`.
pub fn reconcile_resume(start_time: i64, duration_seconds: i64, now_ms: i64) -> ResumePoint {
    let elapsed = (now_ms - start_time) / 1000;
    let remaining = (duration_seconds - elapsed).max(0);
    ResumePoint {
        start_time: now_ms,
        duration_seconds: remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(start_ms: i64, duration: i64) -> Snapshot {
        Snapshot {
            status: TimerStatus::Running,
            start_time: Some(start_ms),
            duration_seconds: duration,
        }
    }

    #[test]
    fn remaining_counts_down_while_running() {
        let snap = running(0, 1500);
        assert_eq!(remaining_seconds(&snap, 0), 1500);
        assert_eq!(remaining_seconds(&snap, 10_000), 1490);
        assert_eq!(remaining_seconds(&snap, 1_500_000), 0);
    }

    #[test]
    fn remaining_never_goes_negative() {
        let snap = running(0, 60);
        assert_eq!(remaining_seconds(&snap, 61_000), 0);
        assert_eq!(remaining_seconds(&snap, 999_999_000), 0);
    }

    #[test]
    fn sub_second_elapsed_truncates() {
        let snap = running(0, 1500);
        assert_eq!(remaining_seconds(&snap, 999), 1500);
        assert_eq!(remaining_seconds(&snap, 1000), 1499);
        assert_eq!(remaining_seconds(&snap, 1999), 1499);
    }

    #[test]
    fn stopped_reports_the_stored_duration() {
        let snap = Snapshot {
            status: TimerStatus::Stopped,
            start_time: None,
            duration_seconds: 300,
        };
        assert_eq!(remaining_seconds(&snap, 123_456_789), 300);
    }

    #[test]
    fn pause_resume_at_the_same_instant_keeps_remaining() {
        // 1500s work session started at t=0, paused at t=10s.
        let snap = running(0, 1500);
        assert_eq!(remaining_seconds(&snap, 10_000), 1490);

        // Resume at the same wall-clock instant: no time has passed.
        let point = reconcile_resume(0, 1500, 10_000);
        assert_eq!(point.duration_seconds, 1490);
        let resumed = running(point.start_time, point.duration_seconds);
        assert_eq!(remaining_seconds(&resumed, 10_000), 1490);

        // Five seconds later the clock keeps draining.
        assert_eq!(remaining_seconds(&resumed, 15_000), 1485);
    }

    #[test]
    fn resume_matches_a_continuous_run() {
        // A run paused and immediately resumed must project the same
        // remaining time as one that was never paused.
        let continuous = running(0, 1500);
        let point = reconcile_resume(0, 1500, 600_000);
        let resumed = running(point.start_time, point.duration_seconds);

        for now in [600_000, 601_000, 900_000, 1_499_000, 2_000_000] {
            assert_eq!(
                remaining_seconds(&resumed, now),
                remaining_seconds(&continuous, now),
                "diverged at now={now}"
            );
        }
    }

    #[test]
    fn resume_after_expiry_clamps_to_zero() {
        let point = reconcile_resume(0, 60, 120_000);
        assert_eq!(point.duration_seconds, 0);
        let resumed = running(point.start_time, point.duration_seconds);
        assert_eq!(remaining_seconds(&resumed, 120_000), 0);
    }

    #[test]
    fn transition_guards() {
        assert_eq!(ensure_can_pause(TimerStatus::Running), Ok(()));
        assert_eq!(ensure_can_pause(TimerStatus::Paused), Err(TimerError::NotRunning));
        assert_eq!(ensure_can_pause(TimerStatus::Stopped), Err(TimerError::NotRunning));

        assert_eq!(ensure_can_resume(TimerStatus::Paused), Ok(()));
        assert_eq!(ensure_can_resume(TimerStatus::Running), Err(TimerError::NotPaused));
        assert_eq!(ensure_can_resume(TimerStatus::Stopped), Err(TimerError::NotPaused));
    }
}
