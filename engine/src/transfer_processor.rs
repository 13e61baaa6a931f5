//! Transfer execution between two accounts.
//!
//! A transfer debits one row and credits another, writes one transfer
//! record and one activity record, and does all four as a single atomic
//! unit: both row locks held, preconditions re-checked under the locks,
//! journal commit before any balance write. First validation failure wins;
//! a failed transfer leaves no trace anywhere.

use crate::account::Account;
use crate::activity::ActivityRecord;
use crate::journal::{Journal, JournalBatch};
use crate::metrics::SharedMetrics;
use crate::store::AccountStore;
use crate::transfer::TransferRecord;
use custodia_common::{AdminId, CustodiaError, Result, UserId};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Validates and executes two-account value movements.
pub struct TransferProcessor {
    store: Arc<AccountStore>,
    journal: Arc<Journal>,
    metrics: SharedMetrics,
}

impl TransferProcessor {
    /// Create a new transfer processor.
    pub fn new(store: Arc<AccountStore>, journal: Arc<Journal>, metrics: SharedMetrics) -> Self {
        Self {
            store,
            journal,
            metrics,
        }
    }

    /// Move funds from one user's account to another's.
    #[instrument(skip(self, description), fields(admin = %admin, from = %from, to = %to, amount = %amount))]
    pub fn transfer(
        &self,
        admin: &AdminId,
        from: &UserId,
        to: &UserId,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<TransferRecord> {
        let result = self.execute(admin, from, to, amount, description);
        match &result {
            Ok(record) => {
                self.metrics.transfer_completed();
                self.metrics.journal_rows_written(2);
                info!(transfer_id = %record.id, "transfer committed");
            }
            Err(err) => {
                if matches!(err, CustodiaError::Busy { .. }) {
                    self.metrics.lock_timeout();
                }
                self.metrics.transfer_rejected();
                warn!(code = err.error_code(), error = %err, "transfer rejected");
            }
        }
        result
    }

    fn execute(
        &self,
        admin: &AdminId,
        from: &UserId,
        to: &UserId,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<TransferRecord> {
        if from == to {
            return Err(CustodiaError::invalid_field(
                "source and destination must differ",
                "to",
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(CustodiaError::invalid_field(
                "transfer amount must be positive",
                "amount",
            ));
        }

        // Fail fast against committed state before taking any lock.
        let source = self.store.get(from)?;
        let dest = self.store.get(to)?;
        Self::check_transferable(&source, &dest, amount)?;

        self.store
            .with_account_pair(from, to, "transfer", |source, dest| {
                // The world may have moved between the read above and the
                // locks here; every precondition is re-checked.
                Self::check_transferable(source, dest, amount)?;

                let next_source = source.balance - amount;
                let next_dest = dest.balance.checked_add(amount).ok_or_else(|| {
                    CustodiaError::invalid_field(
                        "transfer would leave the destination balance out of range",
                        "amount",
                    )
                })?;

                let record = TransferRecord::completed(
                    from.clone(),
                    to.clone(),
                    amount,
                    source.currency.clone(),
                    description,
                );
                let activity = ActivityRecord::transfer_created(admin, &record);

                let mut batch = JournalBatch::new();
                batch.add_transfer(record);
                batch.add_activity(activity);
                let mut committed = self.journal.commit(batch)?;

                // Journal row is durable; the remaining writes cannot fail.
                source.set_balance(next_source);
                dest.set_balance(next_dest);

                committed.transfers.pop().ok_or_else(|| {
                    CustodiaError::Storage("journal returned an empty commit".to_string())
                })
            })
    }

    fn check_transferable(source: &Account, dest: &Account, amount: Decimal) -> Result<()> {
        if source.currency != dest.currency {
            return Err(CustodiaError::invalid_argument(format!(
                "currency mismatch: source holds {}, destination holds {}",
                source.currency, dest.currency
            )));
        }
        if !source.currency.valid_scale(&amount) {
            return Err(CustodiaError::invalid_field(
                "amount has more precision than the currency allows",
                "amount",
            ));
        }
        if !source.can_transfer() {
            return Err(CustodiaError::AccountFrozen(source.user_id.clone()));
        }
        if !dest.can_transfer() {
            return Err(CustodiaError::AccountFrozen(dest.user_id.clone()));
        }
        if !source.has_sufficient_funds(amount) {
            return Err(CustodiaError::InsufficientFunds {
                requested: amount,
                available: source.balance,
            });
        }
        Ok(())
    }
}
