//! Activity log records: the immutable audit trail of administrative
//! mutations.

use custodia_common::{ActivityId, AdminId, Currency, Timestamp, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Kind of administrative action an activity record captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    /// Direct balance override.
    BalanceUpdate,
    /// A transfer was created between two accounts.
    TransferCreated,
    /// An account was frozen.
    AccountFrozen,
    /// An account was unfrozen.
    AccountUnfrozen,
}

impl ActivityAction {
    /// Wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::BalanceUpdate => "balance_update",
            ActivityAction::TransferCreated => "transfer_created",
            ActivityAction::AccountFrozen => "account_frozen",
            ActivityAction::AccountUnfrozen => "account_unfrozen",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One administrative mutation, as recorded in the audit trail.
///
/// Records are immutable once committed. Decimal values inside `details`
/// are rendered as strings so they survive JSON without precision loss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Unique record ID.
    pub id: ActivityId,
    /// Administrator who performed the mutation.
    pub admin: AdminId,
    /// What was done.
    pub action: ActivityAction,
    /// Account the mutation targeted.
    pub target: Option<UserId>,
    /// Parameters of the mutation.
    pub details: Value,
    /// When the record was created.
    pub created_at: Timestamp,
    /// Journal position assigned at commit; the total order for replay.
    pub seq: u64,
}

impl ActivityRecord {
    fn new(admin: &AdminId, action: ActivityAction, target: Option<UserId>, details: Value) -> Self {
        Self {
            id: ActivityId::new(),
            admin: admin.clone(),
            action,
            target,
            details,
            created_at: custodia_common::now(),
            seq: 0,
        }
    }

    /// Record a direct balance override.
    pub fn balance_update(
        admin: &AdminId,
        target: &UserId,
        previous_balance: Decimal,
        new_balance: Decimal,
        currency: &Currency,
    ) -> Self {
        Self::new(
            admin,
            ActivityAction::BalanceUpdate,
            Some(target.clone()),
            json!({
                "previous_balance": previous_balance.to_string(),
                "new_balance": new_balance.to_string(),
                "currency": currency.code(),
            }),
        )
    }

    /// Record a freeze or unfreeze.
    pub fn frozen_change(admin: &AdminId, target: &UserId, frozen: bool) -> Self {
        let action = if frozen {
            ActivityAction::AccountFrozen
        } else {
            ActivityAction::AccountUnfrozen
        };
        Self::new(admin, action, Some(target.clone()), json!({ "frozen": frozen }))
    }

    /// Record the creation of a transfer. The target is the debited account.
    pub fn transfer_created(admin: &AdminId, transfer: &crate::transfer::TransferRecord) -> Self {
        Self::new(
            admin,
            ActivityAction::TransferCreated,
            Some(transfer.from.clone()),
            json!({
                "transfer_id": transfer.id.to_string(),
                "from": transfer.from.as_str(),
                "to": transfer.to.as_str(),
                "amount": transfer.amount.to_string(),
                "currency": transfer.currency.code(),
            }),
        )
    }

    /// Read a decimal value back out of the details payload.
    pub fn detail_decimal(&self, key: &str) -> Option<Decimal> {
        self.details
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| Decimal::from_str(s).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_names() {
        assert_eq!(
            serde_json::to_string(&ActivityAction::BalanceUpdate).unwrap(),
            "\"balance_update\""
        );
        assert_eq!(
            serde_json::to_string(&ActivityAction::AccountUnfrozen).unwrap(),
            "\"account_unfrozen\""
        );
        assert_eq!(ActivityAction::TransferCreated.as_str(), "transfer_created");
    }

    #[test]
    fn test_balance_update_details() {
        let record = ActivityRecord::balance_update(
            &AdminId::new("ops-1"),
            &UserId::new("alice"),
            Decimal::from_str("100.00").unwrap(),
            Decimal::from_str("250.00").unwrap(),
            &Currency::usd(),
        );

        assert_eq!(record.action, ActivityAction::BalanceUpdate);
        assert_eq!(record.target, Some(UserId::new("alice")));
        assert_eq!(record.details["currency"], "USD");
        assert_eq!(
            record.detail_decimal("new_balance"),
            Some(Decimal::from_str("250.00").unwrap())
        );
        assert_eq!(
            record.detail_decimal("previous_balance"),
            Some(Decimal::from_str("100.00").unwrap())
        );
    }

    #[test]
    fn test_frozen_change_picks_action() {
        let admin = AdminId::new("ops-1");
        let target = UserId::new("bob");

        let frozen = ActivityRecord::frozen_change(&admin, &target, true);
        assert_eq!(frozen.action, ActivityAction::AccountFrozen);

        let unfrozen = ActivityRecord::frozen_change(&admin, &target, false);
        assert_eq!(unfrozen.action, ActivityAction::AccountUnfrozen);
        assert_eq!(unfrozen.details["frozen"], false);
    }

    #[test]
    fn test_detail_decimal_rejects_garbage() {
        let record = ActivityRecord::frozen_change(&AdminId::new("ops-1"), &UserId::new("bob"), true);
        assert_eq!(record.detail_decimal("new_balance"), None);
        assert_eq!(record.detail_decimal("frozen"), None);
    }
}
