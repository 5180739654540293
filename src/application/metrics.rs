use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for settlement attempts that did and did not change state.
#[derive(Debug, Default)]
pub struct SettlementMetrics {
    settled: AtomicU64,
    duplicate: AtomicU64,
    bad_signature: AtomicU64,
    unknown_payment: AtomicU64,
    unparsable: AtomicU64,
    ignored_event: AtomicU64,
    mismatched: AtomicU64,
    out_of_range: AtomicU64,
}

impl SettlementMetrics {
    pub fn record_settled(&self) {
        self.settled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicate.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bad_signature(&self) {
        self.bad_signature.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unknown_payment(&self) {
        self.unknown_payment.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unparsable(&self) {
        self.unparsable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored_event(&self) {
        self.ignored_event.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mismatch(&self) {
        self.mismatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_out_of_range(&self) {
        self.out_of_range.fetch_add(1, Ordering::Relaxed);
    }
}

/// Counters for support-desk requests that were absorbed as no-ops.
#[derive(Debug, Default)]
pub struct SupportMetrics {
    duplicate_requests: AtomicU64,
    stale_claims: AtomicU64,
}

impl SupportMetrics {
    pub fn record_duplicate_request(&self) {
        self.duplicate_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_claim(&self) {
        self.stale_claims.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub settled: u64,
    pub duplicate_settlements: u64,
    pub bad_signatures: u64,
    pub unknown_payments: u64,
    pub unparsable_events: u64,
    pub ignored_events: u64,
    pub mismatched_payments: u64,
    pub out_of_range_settlements: u64,
    pub duplicate_support_requests: u64,
    pub stale_support_claims: u64,
}

impl MetricsSnapshot {
    pub fn collect(settlement: &SettlementMetrics, support: &SupportMetrics) -> Self {
        Self {
            settled: settlement.settled.load(Ordering::Relaxed),
            duplicate_settlements: settlement.duplicate.load(Ordering::Relaxed),
            bad_signatures: settlement.bad_signature.load(Ordering::Relaxed),
            unknown_payments: settlement.unknown_payment.load(Ordering::Relaxed),
            unparsable_events: settlement.unparsable.load(Ordering::Relaxed),
            ignored_events: settlement.ignored_event.load(Ordering::Relaxed),
            mismatched_payments: settlement.mismatched.load(Ordering::Relaxed),
            out_of_range_settlements: settlement.out_of_range.load(Ordering::Relaxed),
            duplicate_support_requests: support.duplicate_requests.load(Ordering::Relaxed),
            stale_support_claims: support.stale_claims.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let settlement = SettlementMetrics::default();
        let support = SupportMetrics::default();
        settlement.record_settled();
        settlement.record_duplicate();
        settlement.record_duplicate();
        support.record_stale_claim();

        let snapshot = MetricsSnapshot::collect(&settlement, &support);
        assert_eq!(snapshot.settled, 1);
        assert_eq!(snapshot.duplicate_settlements, 2);
        assert_eq!(snapshot.stale_support_claims, 1);
        assert_eq!(snapshot.bad_signatures, 0);
    }
}
