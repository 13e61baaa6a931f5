//! Transfer ledger records and their status lifecycle.

use custodia_common::{Currency, CustodiaError, Result, Timestamp, TransferId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transfer status representing the lifecycle state.
///
/// This engine settles transfers synchronously and only ever writes
/// `Completed`; the other states are reserved for reviewed or asynchronous
/// flows that advance records out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Accepted but not yet settled.
    Pending,
    /// Funds moved; terminal.
    Completed,
    /// Could not settle; terminal.
    Failed,
    /// Withdrawn before settlement; terminal.
    Cancelled,
}

impl TransferStatus {
    /// Check if this is a final state.
    pub fn is_final(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }

    /// Get valid next states from current state.
    pub fn valid_transitions(&self) -> &[TransferStatus] {
        match self {
            TransferStatus::Pending => &[
                TransferStatus::Completed,
                TransferStatus::Failed,
                TransferStatus::Cancelled,
            ],
            TransferStatus::Completed => &[],
            TransferStatus::Failed => &[],
            TransferStatus::Cancelled => &[],
        }
    }

    /// Check if transition to given state is valid.
    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// One value movement between two accounts, as recorded in the ledger.
/// Immutable once committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Unique transfer ID.
    pub id: TransferId,
    /// Debited account.
    pub from: UserId,
    /// Credited account.
    pub to: UserId,
    /// Amount moved; always positive.
    pub amount: Decimal,
    /// Currency of both accounts.
    pub currency: Currency,
    /// Operator-supplied note.
    pub description: Option<String>,
    /// Lifecycle state.
    pub status: TransferStatus,
    /// When the record was created.
    pub created_at: Timestamp,
    /// Journal position assigned at commit; the total order for replay.
    pub seq: u64,
}

impl TransferRecord {
    /// Create a completed transfer record.
    pub fn completed(
        from: UserId,
        to: UserId,
        amount: Decimal,
        currency: Currency,
        description: Option<String>,
    ) -> Self {
        Self {
            id: TransferId::new(),
            from,
            to,
            amount,
            currency,
            description,
            status: TransferStatus::Completed,
            created_at: custodia_common::now(),
            seq: 0,
        }
    }

    /// Check structural invariants before the record enters the journal.
    pub fn validate(&self) -> Result<()> {
        if self.from == self.to {
            return Err(CustodiaError::invalid_field(
                "transfer endpoints must differ",
                "to",
            ));
        }
        if self.amount <= Decimal::ZERO {
            return Err(CustodiaError::invalid_field(
                "transfer amount must be positive",
                "amount",
            ));
        }
        Ok(())
    }

    /// Check whether the user is either endpoint.
    pub fn involves(&self, user: &UserId) -> bool {
        &self.from == user || &self.to == user
    }

    /// Signed effect of this transfer on one account's balance.
    pub fn signed_amount_for(&self, user: &UserId) -> Decimal {
        if &self.from == user {
            -self.amount
        } else if &self.to == user {
            self.amount
        } else {
            Decimal::ZERO
        }
    }
}
