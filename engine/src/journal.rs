//! Write-ahead journal holding the activity log and the transfer ledger.
//!
//! Both logs commit through one boundary so a mutation's audit rows land
//! together or not at all. The journal is append-only; committed records
//! are never updated or deleted.

use crate::activity::ActivityRecord;
use crate::transfer::TransferRecord;
use custodia_common::{CustodiaError, Result};
use parking_lot::RwLock;
use tracing::debug;

/// A set of records that must land in the journal together.
#[derive(Debug, Clone, Default)]
pub struct JournalBatch {
    /// Activity rows in the batch.
    pub activity: Vec<ActivityRecord>,
    /// Transfer rows in the batch.
    pub transfers: Vec<TransferRecord>,
}

impl JournalBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an activity row.
    pub fn add_activity(&mut self, record: ActivityRecord) {
        self.activity.push(record);
    }

    /// Add a transfer row.
    pub fn add_transfer(&mut self, record: TransferRecord) {
        self.transfers.push(record);
    }

    /// Rows in the batch across both logs.
    pub fn len(&self) -> usize {
        self.activity.len() + self.transfers.len()
    }

    /// Check if the batch holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Verify every row satisfies its structural invariants.
    pub fn validate(&self) -> Result<()> {
        for record in &self.transfers {
            record.validate()?;
        }
        Ok(())
    }
}

struct JournalInner {
    activity: Vec<ActivityRecord>,
    transfers: Vec<TransferRecord>,
    next_seq: u64,
}

/// Append-only storage for both audit logs.
pub struct Journal {
    inner: RwLock<JournalInner>,
    max_rows: usize,
}

impl Journal {
    /// Create a journal bounded at `max_rows` across both logs.
    pub fn new(max_rows: usize) -> Self {
        Self {
            inner: RwLock::new(JournalInner {
                activity: Vec::new(),
                transfers: Vec::new(),
                next_seq: 1,
            }),
            max_rows,
        }
    }

    /// Commit a batch atomically, assigning consecutive `seq` positions.
    ///
    /// Validation and the capacity check run before anything is written, so
    /// a failed commit leaves the journal untouched. Returns the batch with
    /// positions filled in.
    pub fn commit(&self, mut batch: JournalBatch) -> Result<JournalBatch> {
        batch.validate()?;
        if batch.is_empty() {
            return Ok(batch);
        }

        let mut inner = self.inner.write();
        let occupied = inner.activity.len() + inner.transfers.len();
        if occupied + batch.len() > self.max_rows {
            return Err(CustodiaError::Storage(format!(
                "journal capacity exhausted at {} rows",
                self.max_rows
            )));
        }

        for record in &mut batch.transfers {
            record.seq = inner.next_seq;
            inner.next_seq += 1;
            inner.transfers.push(record.clone());
        }
        for record in &mut batch.activity {
            record.seq = inner.next_seq;
            inner.next_seq += 1;
            inner.activity.push(record.clone());
        }

        debug!(
            rows = batch.len(),
            next_seq = inner.next_seq,
            "journal batch committed"
        );
        Ok(batch)
    }

    /// Append a single activity row.
    pub fn record_activity(&self, record: ActivityRecord) -> Result<ActivityRecord> {
        let mut batch = JournalBatch::new();
        batch.add_activity(record);
        let mut committed = self.commit(batch)?;
        committed
            .activity
            .pop()
            .ok_or_else(|| CustodiaError::Storage("journal returned an empty commit".to_string()))
    }

    /// Append a single transfer row.
    pub fn record_transfer(&self, record: TransferRecord) -> Result<TransferRecord> {
        let mut batch = JournalBatch::new();
        batch.add_transfer(record);
        let mut committed = self.commit(batch)?;
        committed
            .transfers
            .pop()
            .ok_or_else(|| CustodiaError::Storage("journal returned an empty commit".to_string()))
    }

    /// Snapshot of the activity log in commit order.
    pub fn activity(&self) -> Vec<ActivityRecord> {
        self.inner.read().activity.clone()
    }

    /// Snapshot of the transfer ledger in commit order.
    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.inner.read().transfers.clone()
    }

    /// Rows committed across both logs.
    pub fn len(&self) -> usize {
        let inner = self.inner.read();
        inner.activity.len() + inner.transfers.len()
    }

    /// Check if nothing has been committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
