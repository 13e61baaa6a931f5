//! Account store with per-row locking.
//!
//! One mutex per account row. A mutating operation holds its row lock for
//! the whole atomic unit, so per-account history is totally ordered. Waits
//! on a contended row are bounded; exceeding the bound fails `Busy` with no
//! effects. Operations touching two rows always lock in ascending user-id
//! order, which keeps opposing transfers from deadlocking.

use crate::account::Account;
use custodia_common::{CustodiaError, Result, UserId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

type Row = Arc<Mutex<Account>>;

/// Durable record of one balance per user.
pub struct AccountStore {
    rows: DashMap<UserId, Row>,
    lock_wait: Duration,
}

impl AccountStore {
    /// Create an empty store with the given bounded lock wait.
    pub fn new(lock_wait: Duration) -> Self {
        Self {
            rows: DashMap::new(),
            lock_wait,
        }
    }

    /// Register a newly provisioned account.
    pub fn register(&self, account: Account) -> Result<Account> {
        match self.rows.entry(account.user_id.clone()) {
            Entry::Occupied(_) => Err(CustodiaError::AlreadyExists(account.user_id)),
            Entry::Vacant(entry) => {
                info!(
                    user = %account.user_id,
                    currency = %account.currency,
                    "account registered"
                );
                entry.insert(Arc::new(Mutex::new(account.clone())));
                Ok(account)
            }
        }
    }

    /// Fetch a point-in-time copy of an account row.
    ///
    /// Waits at most the configured bound for the row lock, like every
    /// mutating operation.
    pub fn get(&self, user: &UserId) -> Result<Account> {
        let row = self.row(user)?;
        let guard = row
            .try_lock_for(self.lock_wait)
            .ok_or_else(|| self.busy(user, "get"))?;
        Ok(guard.clone())
    }

    /// Check whether an account exists.
    pub fn contains(&self, user: &UserId) -> bool {
        self.rows.contains_key(user)
    }

    /// Run `f` on the account row under its lock.
    pub fn with_account<T>(
        &self,
        user: &UserId,
        operation: &'static str,
        f: impl FnOnce(&mut Account) -> Result<T>,
    ) -> Result<T> {
        let row = self.row(user)?;
        let mut guard = row
            .try_lock_for(self.lock_wait)
            .ok_or_else(|| self.busy(user, operation))?;
        f(&mut guard)
    }

    /// Run `f` on two distinct rows, both locked for the duration.
    ///
    /// The closure sees the rows in argument order (`a`, `b`) regardless of
    /// which lock was taken first.
    pub fn with_account_pair<T>(
        &self,
        a: &UserId,
        b: &UserId,
        operation: &'static str,
        f: impl FnOnce(&mut Account, &mut Account) -> Result<T>,
    ) -> Result<T> {
        if a == b {
            return Err(CustodiaError::invalid_argument(
                "pair operation requires two distinct accounts",
            ));
        }

        // Resolve both rows before locking either, so a missing account
        // never costs a lock acquisition.
        let row_a = self.row(a)?;
        let row_b = self.row(b)?;

        if a < b {
            let mut guard_a = row_a
                .try_lock_for(self.lock_wait)
                .ok_or_else(|| self.busy(a, operation))?;
            let mut guard_b = row_b
                .try_lock_for(self.lock_wait)
                .ok_or_else(|| self.busy(b, operation))?;
            f(&mut guard_a, &mut guard_b)
        } else {
            let mut guard_b = row_b
                .try_lock_for(self.lock_wait)
                .ok_or_else(|| self.busy(b, operation))?;
            let mut guard_a = row_a
                .try_lock_for(self.lock_wait)
                .ok_or_else(|| self.busy(a, operation))?;
            f(&mut guard_a, &mut guard_b)
        }
    }

    /// Administrative balance override. The store accepts any value; policy
    /// checks live in the mutation service.
    pub fn set_balance(&self, user: &UserId, new_balance: Decimal) -> Result<Account> {
        self.with_account(user, "set_balance", |account| {
            account.set_balance(new_balance);
            Ok(account.clone())
        })
    }

    /// Set the frozen flag on an account.
    pub fn set_frozen(&self, user: &UserId, frozen: bool) -> Result<Account> {
        self.with_account(user, "set_frozen", |account| {
            account.set_frozen(frozen);
            Ok(account.clone())
        })
    }

    /// Apply a signed delta; the result may not go negative.
    pub fn adjust(&self, user: &UserId, delta: Decimal) -> Result<Account> {
        self.with_account(user, "adjust", |account| {
            account.adjust(delta)?;
            Ok(account.clone())
        })
    }

    /// All accounts, in user-id order. Each row lock is taken under the
    /// same bounded wait as single-row reads.
    pub fn accounts(&self) -> Result<Vec<Account>> {
        let mut all = Vec::with_capacity(self.rows.len());
        for entry in self.rows.iter() {
            let guard = entry
                .value()
                .try_lock_for(self.lock_wait)
                .ok_or_else(|| self.busy(entry.key(), "list"))?;
            all.push(guard.clone());
        }
        all.sort_by(|x, y| x.user_id.cmp(&y.user_id));
        Ok(all)
    }

    /// Number of registered accounts.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if no accounts are registered.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn row(&self, user: &UserId) -> Result<Row> {
        self.rows
            .get(user)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CustodiaError::NotFound(user.clone()))
    }

    fn busy(&self, user: &UserId, operation: &'static str) -> CustodiaError {
        warn!(user = %user, operation, "row lock wait exceeded");
        CustodiaError::Busy {
            operation: operation.to_string(),
        }
    }
}
