// Metrics module for lock observability
// Records acquisitions, releases, failures and time spent waiting per lock mode

use metrics::{counter, describe_counter, describe_histogram, histogram};

use crate::model::LockMode;

/// Register metric descriptions with the installed recorder.
/// Call once after installing a recorder; recording works without it.
pub fn describe_metrics() {
    describe_counter!(
        "warden_lock_acquisitions_total",
        "Total number of successful lock acquisitions"
    );
    describe_counter!(
        "warden_lock_releases_total",
        "Total number of lock releases"
    );
    describe_counter!(
        "warden_lock_failures_total",
        "Total number of failed or abandoned lock acquisitions"
    );
    describe_counter!(
        "warden_lock_watch_waits_total",
        "Total number of times an acquisition parked on a predecessor watch"
    );
    describe_histogram!(
        "warden_lock_wait_seconds",
        "Time from candidate creation to lock acquisition in seconds"
    );
}

/// Record a successful acquisition and how long it took
pub fn record_acquired(mode: LockMode, wait_secs: f64) {
    counter!("warden_lock_acquisitions_total", "mode" => mode.as_str()).increment(1);
    histogram!("warden_lock_wait_seconds", "mode" => mode.as_str()).record(wait_secs);
}

/// Record a release
pub fn record_released(mode: LockMode) {
    counter!("warden_lock_releases_total", "mode" => mode.as_str()).increment(1);
}

/// Record an acquisition that ended in an error or timeout
pub fn record_failed(mode: LockMode) {
    counter!("warden_lock_failures_total", "mode" => mode.as_str()).increment(1);
}

/// Record one park on a predecessor watch
pub fn record_watch_wait(mode: LockMode) {
    counter!("warden_lock_watch_waits_total", "mode" => mode.as_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder() {
        describe_metrics();
        record_acquired(LockMode::Read, 0.5);
        record_released(LockMode::Read);
        record_failed(LockMode::Write);
        record_watch_wait(LockMode::Exclusive);
    }
}
