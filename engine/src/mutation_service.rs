//! Direct balance mutations: administrative overrides and freeze state.
//!
//! Every successful mutation commits exactly one activity record through
//! the journal before the row itself changes, all under the row lock. A
//! failure at any point leaves both the row and the journal untouched.

use crate::account::Account;
use crate::activity::ActivityRecord;
use crate::journal::Journal;
use crate::metrics::SharedMetrics;
use crate::store::AccountStore;
use custodia_common::{AdminId, CustodiaError, Result, UserId};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Executes balance overrides and freeze changes for the admin console.
pub struct MutationService {
    store: Arc<AccountStore>,
    journal: Arc<Journal>,
    metrics: SharedMetrics,
}

impl MutationService {
    /// Create a new mutation service.
    pub fn new(store: Arc<AccountStore>, journal: Arc<Journal>, metrics: SharedMetrics) -> Self {
        Self {
            store,
            journal,
            metrics,
        }
    }

    /// Override an account balance to an explicit value.
    ///
    /// Works on frozen accounts: freezing blocks transfers, not
    /// administrative corrections.
    #[instrument(skip(self), fields(admin = %admin, user = %target))]
    pub fn set_balance(
        &self,
        admin: &AdminId,
        target: &UserId,
        new_balance: Decimal,
    ) -> Result<Account> {
        let result = self.execute_set_balance(admin, target, new_balance);
        match &result {
            Ok(account) => {
                self.metrics.balance_override();
                self.metrics.journal_rows_written(1);
                info!(new_balance = %account.balance, "balance override committed");
            }
            Err(err) => self.note_rejection("set_balance", err),
        }
        result
    }

    /// Freeze or unfreeze an account.
    ///
    /// Setting the already-current state is still a mutation: the audit
    /// trail captures admin intent, so a record is written either way.
    #[instrument(skip(self), fields(admin = %admin, user = %target, frozen))]
    pub fn set_frozen(&self, admin: &AdminId, target: &UserId, frozen: bool) -> Result<Account> {
        let result = self.store.with_account(target, "set_frozen", |account| {
            let record = ActivityRecord::frozen_change(admin, target, frozen);
            self.journal.record_activity(record)?;
            account.set_frozen(frozen);
            Ok(account.clone())
        });

        match &result {
            Ok(account) => {
                self.metrics.freeze_change();
                self.metrics.journal_rows_written(1);
                info!(frozen = account.frozen, "freeze change committed");
            }
            Err(err) => self.note_rejection("set_frozen", err),
        }
        result
    }

    fn execute_set_balance(
        &self,
        admin: &AdminId,
        target: &UserId,
        new_balance: Decimal,
    ) -> Result<Account> {
        if new_balance < Decimal::ZERO {
            return Err(CustodiaError::invalid_field(
                "new balance cannot be negative",
                "new_balance",
            ));
        }

        self.store.with_account(target, "set_balance", |account| {
            if !account.currency.valid_scale(&new_balance) {
                return Err(CustodiaError::invalid_field(
                    "new balance has more precision than the currency allows",
                    "new_balance",
                ));
            }

            // Journal first: once the audit row is committed, the in-lock
            // row write below cannot fail.
            let record = ActivityRecord::balance_update(
                admin,
                target,
                account.balance,
                new_balance,
                &account.currency,
            );
            self.journal.record_activity(record)?;

            account.set_balance(new_balance);
            Ok(account.clone())
        })
    }

    fn note_rejection(&self, operation: &'static str, err: &CustodiaError) {
        if matches!(err, CustodiaError::Busy { .. }) {
            self.metrics.lock_timeout();
        }
        self.metrics.mutation_rejected();
        warn!(operation, code = err.error_code(), error = %err, "mutation rejected");
    }
}
