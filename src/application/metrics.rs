use std::sync::atomic::{AtomicU64, Ordering};

/// Events the ledger reports as it processes operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEvent {
    /// A deposit request entered the engine.
    DepositRequested,
    /// A withdrawal request entered the engine.
    WithdrawRequested,
    /// A new transaction was written with APPROVED status.
    TransactionApproved,
    /// A new transaction was written with PENDING status.
    TransactionPending,
}

/// Fire-and-forget sink for ledger events. Implementations must never fail
/// or block; a sink that cannot record an event drops it.
pub trait MetricsSink: Send + Sync {
    fn record(&self, event: LedgerEvent);
}

/// Sink that discards every event.
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record(&self, _event: LedgerEvent) {}
}

/// In-process counters, one per event.
#[derive(Debug, Default)]
pub struct CounterMetrics {
    deposits: AtomicU64,
    withdraws: AtomicU64,
    approved: AtomicU64,
    pending: AtomicU64,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub deposits: u64,
    pub withdraws: u64,
    pub approved: u64,
    pub pending: u64,
}

impl CounterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            deposits: self.deposits.load(Ordering::Relaxed),
            withdraws: self.withdraws.load(Ordering::Relaxed),
            approved: self.approved.load(Ordering::Relaxed),
            pending: self.pending.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSink for CounterMetrics {
    fn record(&self, event: LedgerEvent) {
        let counter = match event {
            LedgerEvent::DepositRequested => &self.deposits,
            LedgerEvent::WithdrawRequested => &self.withdraws,
            LedgerEvent::TransactionApproved => &self.approved,
            LedgerEvent::TransactionPending => &self.pending,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
