//! Process-wide pipeline counters, logged periodically by the transport loop.
use std::sync::atomic::{AtomicU64, Ordering};

static ENVELOPES_RECEIVED: AtomicU64 = AtomicU64::new(0);
static ENVELOPES_REJECTED: AtomicU64 = AtomicU64::new(0);
static ENVELOPES_MALFORMED: AtomicU64 = AtomicU64::new(0);
static ENVELOPES_DISCARDED: AtomicU64 = AtomicU64::new(0);
static REPEATERS_UPLOADED: AtomicU64 = AtomicU64::new(0);
static SAMPLES_UPLOADED: AtomicU64 = AtomicU64::new(0);
static UPLOAD_FAILURES: AtomicU64 = AtomicU64::new(0);

pub fn inc_received() {
    ENVELOPES_RECEIVED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_rejected() {
    ENVELOPES_REJECTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_malformed() {
    ENVELOPES_MALFORMED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_discarded() {
    ENVELOPES_DISCARDED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_repeater_uploaded() {
    REPEATERS_UPLOADED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_sample_uploaded() {
    SAMPLES_UPLOADED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_upload_failed() {
    UPLOAD_FAILURES.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub received: u64,
    pub rejected: u64,
    pub malformed: u64,
    pub discarded: u64,
    pub repeaters_uploaded: u64,
    pub samples_uploaded: u64,
    pub upload_failures: u64,
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "received={} rejected={} malformed={} discarded={} repeaters={} samples={} upload_failures={}",
            self.received,
            self.rejected,
            self.malformed,
            self.discarded,
            self.repeaters_uploaded,
            self.samples_uploaded,
            self.upload_failures
        )
    }
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        received: ENVELOPES_RECEIVED.load(Ordering::Relaxed),
        rejected: ENVELOPES_REJECTED.load(Ordering::Relaxed),
        malformed: ENVELOPES_MALFORMED.load(Ordering::Relaxed),
        discarded: ENVELOPES_DISCARDED.load(Ordering::Relaxed),
        repeaters_uploaded: REPEATERS_UPLOADED.load(Ordering::Relaxed),
        samples_uploaded: SAMPLES_UPLOADED.load(Ordering::Relaxed),
        upload_failures: UPLOAD_FAILURES.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_only_increase() {
        // Other tests in this binary may bump counters concurrently.
        let before = snapshot();
        inc_received();
        inc_upload_failed();
        let after = snapshot();
        assert!(after.received > before.received);
        assert!(after.upload_failures > before.upload_failures);
        assert!(after.to_string().contains("received="));
    }
}
