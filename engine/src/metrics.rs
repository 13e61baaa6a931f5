//! Metrics collection for engine monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Engine metrics.
pub struct EngineMetrics {
    /// Transfers committed.
    pub transfers_completed: AtomicU64,
    /// Transfers rejected for any reason.
    pub transfers_rejected: AtomicU64,
    /// Direct balance overrides committed.
    pub balance_overrides: AtomicU64,
    /// Freeze or unfreeze mutations committed.
    pub freeze_changes: AtomicU64,
    /// Balance or freeze mutations rejected.
    pub mutations_rejected: AtomicU64,
    /// Row lock waits that exceeded the bound.
    pub lock_timeouts: AtomicU64,
    /// Rows written to the journal.
    pub journal_rows: AtomicU64,
}

impl EngineMetrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            transfers_completed: AtomicU64::new(0),
            transfers_rejected: AtomicU64::new(0),
            balance_overrides: AtomicU64::new(0),
            freeze_changes: AtomicU64::new(0),
            mutations_rejected: AtomicU64::new(0),
            lock_timeouts: AtomicU64::new(0),
            journal_rows: AtomicU64::new(0),
        }
    }

    /// Record a committed transfer.
    pub fn transfer_completed(&self) {
        self.transfers_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected transfer.
    pub fn transfer_rejected(&self) {
        self.transfers_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a committed balance override.
    pub fn balance_override(&self) {
        self.balance_overrides.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a committed freeze change.
    pub fn freeze_change(&self) {
        self.freeze_changes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected mutation.
    pub fn mutation_rejected(&self) {
        self.mutations_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lock wait that exceeded the bound.
    pub fn lock_timeout(&self) {
        self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record rows written to the journal.
    pub fn journal_rows_written(&self, rows: u64) {
        self.journal_rows.fetch_add(rows, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            transfers_completed: self.transfers_completed.load(Ordering::Relaxed),
            transfers_rejected: self.transfers_rejected.load(Ordering::Relaxed),
            balance_overrides: self.balance_overrides.load(Ordering::Relaxed),
            freeze_changes: self.freeze_changes.load(Ordering::Relaxed),
            mutations_rejected: self.mutations_rejected.load(Ordering::Relaxed),
            lock_timeouts: self.lock_timeouts.load(Ordering::Relaxed),
            journal_rows: self.journal_rows.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP custodia_transfers_completed Total committed transfers
# TYPE custodia_transfers_completed counter
custodia_transfers_completed {}

# HELP custodia_transfers_rejected Total rejected transfers
# TYPE custodia_transfers_rejected counter
custodia_transfers_rejected {}

# HELP custodia_balance_overrides Total committed balance overrides
# TYPE custodia_balance_overrides counter
custodia_balance_overrides {}

# HELP custodia_freeze_changes Total committed freeze changes
# TYPE custodia_freeze_changes counter
custodia_freeze_changes {}

# HELP custodia_mutations_rejected Total rejected mutations
# TYPE custodia_mutations_rejected counter
custodia_mutations_rejected {}

# HELP custodia_lock_timeouts Total bounded lock waits exceeded
# TYPE custodia_lock_timeouts counter
custodia_lock_timeouts {}

# HELP custodia_journal_rows Total journal rows written
# TYPE custodia_journal_rows counter
custodia_journal_rows {}
"#,
            snapshot.transfers_completed,
            snapshot.transfers_rejected,
            snapshot.balance_overrides,
            snapshot.freeze_changes,
            snapshot.mutations_rejected,
            snapshot.lock_timeouts,
            snapshot.journal_rows,
        )
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub transfers_completed: u64,
    pub transfers_rejected: u64,
    pub balance_overrides: u64,
    pub freeze_changes: u64,
    pub mutations_rejected: u64,
    pub lock_timeouts: u64,
    pub journal_rows: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<EngineMetrics>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_increment() {
        let metrics = EngineMetrics::new();

        metrics.transfer_completed();
        metrics.transfer_completed();
        metrics.transfer_rejected();
        metrics.journal_rows_written(4);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.transfers_completed, 2);
        assert_eq!(snapshot.transfers_rejected, 1);
        assert_eq!(snapshot.journal_rows, 4);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = EngineMetrics::new();
        metrics.balance_override();

        let output = metrics.to_prometheus();
        assert!(output.contains("custodia_balance_overrides 1"));
        assert!(output.contains("# TYPE custodia_lock_timeouts counter"));
    }
}
