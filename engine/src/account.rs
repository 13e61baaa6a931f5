//! Account row definitions for the balance store.

use chrono::{DateTime, Utc};
use custodia_common::{Currency, CustodiaError, Result, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A user's single balance record under administrative control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Owning user (exactly one account per user).
    pub user_id: UserId,
    /// Current balance in the account currency.
    pub balance: Decimal,
    /// Account currency.
    pub currency: Currency,
    /// Frozen accounts cannot take part in transfers, in either role.
    pub frozen: bool,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with a zero balance.
    pub fn new(user_id: UserId, currency: Currency) -> Self {
        Self {
            user_id,
            balance: Decimal::ZERO,
            currency,
            frozen: false,
            updated_at: Utc::now(),
        }
    }

    /// Check if the account can take part in a transfer.
    pub fn can_transfer(&self) -> bool {
        !self.frozen
    }

    /// Check if the balance covers an amount.
    pub fn has_sufficient_funds(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }

    /// Override the balance. The row accepts any value; policy checks
    /// belong to the mutation service.
    pub fn set_balance(&mut self, new_balance: Decimal) {
        self.balance = new_balance;
        self.updated_at = Utc::now();
    }

    /// Set the frozen flag.
    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
        self.updated_at = Utc::now();
    }

    /// Apply a signed delta. The result may not go negative.
    pub fn adjust(&mut self, delta: Decimal) -> Result<()> {
        let next = self.balance.checked_add(delta).ok_or_else(|| {
            CustodiaError::invalid_field("adjustment leaves the balance out of range", "delta")
        })?;

        if next < Decimal::ZERO {
            return Err(CustodiaError::InsufficientFunds {
                requested: delta.abs(),
                available: self.balance,
            });
        }

        self.balance = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}
