//! Engine facade wiring the store, journal, and services together.
//!
//! `LedgerEngine` is the single entry point callers hold. It owns the
//! shared state, constructs the services over it, and exposes the
//! administrative operations plus the read-only query surface.

use crate::account::Account;
use crate::activity::ActivityRecord;
use crate::config::EngineConfig;
use crate::journal::Journal;
use crate::metrics::{EngineMetrics, SharedMetrics};
use crate::mutation_service::MutationService;
use crate::query::{paginate, ActivityFilter, Page, PageRequest, TransferFilter};
use crate::reconciliation::{AccountDrift, ReconciliationReport, Reconciler};
use crate::store::AccountStore;
use crate::transfer::TransferRecord;
use crate::transfer_processor::TransferProcessor;
use custodia_common::{AdminId, Currency, CustodiaError, Result, UserId};
use rust_decimal::Decimal;
use std::sync::Arc;

/// The ledger engine: balances, transfers, and their audit trail.
pub struct LedgerEngine {
    config: EngineConfig,
    store: Arc<AccountStore>,
    journal: Arc<Journal>,
    metrics: SharedMetrics,
    mutations: MutationService,
    transfers: TransferProcessor,
    reconciler: Reconciler,
}

impl LedgerEngine {
    /// Create an engine from the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        let store = Arc::new(AccountStore::new(config.lock_wait));
        let journal = Arc::new(Journal::new(config.max_journal_rows));
        let metrics: SharedMetrics = Arc::new(EngineMetrics::new());

        let mutations = MutationService::new(store.clone(), journal.clone(), metrics.clone());
        let transfers = TransferProcessor::new(store.clone(), journal.clone(), metrics.clone());
        let reconciler = Reconciler::new(store.clone(), journal.clone());

        Self {
            config,
            store,
            journal,
            metrics,
            mutations,
            transfers,
            reconciler,
        }
    }

    /// Provision a new account with a zero balance.
    pub fn register_account(&self, user: &UserId, currency: Currency) -> Result<Account> {
        if !user.is_valid() {
            return Err(CustodiaError::invalid_field(
                "user id must be 1-64 characters of letters, digits, '-' or '_'",
                "user_id",
            ));
        }
        self.store.register(Account::new(user.clone(), currency))
    }

    /// Fetch a point-in-time copy of one account.
    pub fn account(&self, user: &UserId) -> Result<Account> {
        self.store.get(user)
    }

    /// Override an account's balance, with an audit row.
    pub fn set_balance(
        &self,
        admin: &AdminId,
        user: &UserId,
        new_balance: Decimal,
    ) -> Result<Account> {
        self.mutations.set_balance(admin, user, new_balance)
    }

    /// Freeze or unfreeze an account, with an audit row.
    pub fn set_frozen(&self, admin: &AdminId, user: &UserId, frozen: bool) -> Result<Account> {
        self.mutations.set_frozen(admin, user, frozen)
    }

    /// Move funds between two accounts as one atomic unit.
    pub fn transfer(
        &self,
        admin: &AdminId,
        from: &UserId,
        to: &UserId,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<TransferRecord> {
        self.transfers.transfer(admin, from, to, amount, description)
    }

    /// Page through all accounts, in user-id order.
    pub fn list_accounts(&self, page: PageRequest) -> Result<Page<Account>> {
        Ok(self.paged(self.store.accounts()?, page))
    }

    /// Page through transfer history, newest first.
    ///
    /// Ordered by descending journal position: commit order is the total
    /// order, and wall-clock timestamps can disagree with it for commits
    /// that raced on disjoint accounts.
    pub fn list_transfers(&self, filter: &TransferFilter, page: PageRequest) -> Page<TransferRecord> {
        let mut records = self.journal.transfers();
        records.retain(|record| filter.matches(record));
        records.sort_by(|a, b| b.seq.cmp(&a.seq));
        self.paged(records, page)
    }

    /// Page through the activity log, newest first (descending journal
    /// position, as for transfers).
    pub fn list_activity(&self, filter: &ActivityFilter, page: PageRequest) -> Page<ActivityRecord> {
        let mut records = self.journal.activity();
        records.retain(|record| filter.matches(record));
        records.sort_by(|a, b| b.seq.cmp(&a.seq));
        self.paged(records, page)
    }

    /// Reconstruct one account's balance from journal history alone.
    pub fn replay_balance(&self, user: &UserId) -> Result<Decimal> {
        self.reconciler.replay_balance(user)
    }

    /// Compare one account against its replayed history.
    pub fn reconcile(&self, user: &UserId) -> Result<Option<AccountDrift>> {
        self.reconciler.reconcile(user)
    }

    /// Replay every account and report all drifts.
    pub fn reconcile_all(&self) -> Result<ReconciliationReport> {
        self.reconciler.reconcile_all()
    }

    /// Engine counters.
    pub fn metrics(&self) -> &EngineMetrics {
        self.metrics.as_ref()
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of registered accounts.
    pub fn account_count(&self) -> usize {
        self.store.len()
    }

    fn paged<T>(&self, items: Vec<T>, page: PageRequest) -> Page<T> {
        paginate(
            items,
            page,
            self.config.default_page_size,
            self.config.max_page_size,
        )
    }
}

impl Default for LedgerEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityAction;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn create_test_engine() -> LedgerEngine {
        let engine = LedgerEngine::default();
        for user in ["alice", "bob", "carol"] {
            engine
                .register_account(&UserId::new(user), Currency::usd())
                .unwrap();
        }
        engine
    }

    #[test]
    fn test_register_validates_user_id() {
        let engine = LedgerEngine::default();

        let err = engine
            .register_account(&UserId::new("no spaces allowed"), Currency::usd())
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");

        engine
            .register_account(&UserId::new("alice"), Currency::usd())
            .unwrap();
        let err = engine
            .register_account(&UserId::new("alice"), Currency::usd())
            .unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_EXISTS");
        assert_eq!(engine.account_count(), 1);
    }

    #[test]
    fn test_full_flow_through_facade() {
        let engine = create_test_engine();
        let admin = AdminId::new("ops-1");
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        engine.set_balance(&admin, &alice, dec("100.00")).unwrap();
        engine
            .transfer(&admin, &alice, &bob, dec("40.00"), None)
            .unwrap();

        assert_eq!(engine.account(&alice).unwrap().balance, dec("60.00"));
        assert_eq!(engine.account(&bob).unwrap().balance, dec("40.00"));

        let transfers = engine.list_transfers(&TransferFilter::default(), PageRequest::default());
        assert_eq!(transfers.total, 1);

        // Newest first: the transfer's audit row precedes the override's.
        let activity = engine.list_activity(&ActivityFilter::default(), PageRequest::default());
        assert_eq!(activity.total, 2);
        assert_eq!(activity.items[0].action, ActivityAction::TransferCreated);
        assert_eq!(activity.items[1].action, ActivityAction::BalanceUpdate);

        assert!(engine.reconcile_all().unwrap().is_clean());
        assert_eq!(engine.metrics().snapshot().transfers_completed, 1);
    }

    #[test]
    fn test_list_transfers_filters_by_user() {
        let engine = create_test_engine();
        let admin = AdminId::new("ops-1");
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let carol = UserId::new("carol");

        engine.set_balance(&admin, &alice, dec("100.00")).unwrap();
        engine.transfer(&admin, &alice, &bob, dec("10.00"), None).unwrap();
        engine.transfer(&admin, &alice, &carol, dec("20.00"), None).unwrap();
        engine.transfer(&admin, &bob, &carol, dec("5.00"), None).unwrap();

        let filter = TransferFilter {
            user: Some(bob.clone()),
            ..Default::default()
        };
        let page = engine.list_transfers(&filter, PageRequest::default());
        // Both roles count: bob received one transfer and sent another.
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|t| t.involves(&bob)));
    }

    #[test]
    fn test_list_activity_filters_by_admin_and_target() {
        let engine = create_test_engine();
        let alice = UserId::new("alice");

        engine
            .set_balance(&AdminId::new("ops-1"), &alice, dec("10.00"))
            .unwrap();
        engine
            .set_frozen(&AdminId::new("ops-2"), &alice, true)
            .unwrap();
        engine
            .set_frozen(&AdminId::new("ops-2"), &UserId::new("bob"), true)
            .unwrap();

        let by_admin = engine.list_activity(
            &ActivityFilter {
                admin: Some(AdminId::new("ops-2")),
                ..Default::default()
            },
            PageRequest::default(),
        );
        assert_eq!(by_admin.total, 2);

        let by_target = engine.list_activity(
            &ActivityFilter {
                target: Some(alice.clone()),
                ..Default::default()
            },
            PageRequest::default(),
        );
        assert_eq!(by_target.total, 2);
    }

    #[test]
    fn test_account_pages_clamp_and_default() {
        let engine = LedgerEngine::default();
        for n in 0..7 {
            engine
                .register_account(&UserId::new(format!("user-{n}")), Currency::usd())
                .unwrap();
        }

        let page = engine.list_accounts(PageRequest::new(2, 3)).unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total, 7);
        assert_eq!(page.offset, 2);
        assert_eq!(page.items[0].user_id, UserId::new("user-2"));
        assert!(!page.is_last());

        // Limit zero falls back to the engine default page size.
        let page = engine.list_accounts(PageRequest::new(0, 0)).unwrap();
        assert_eq!(page.items.len(), 7);
    }

    #[test]
    fn test_listing_order_follows_commit_order() {
        let engine = create_test_engine();
        let alice = UserId::new("alice");

        // Two records whose wall-clock timestamps disagree with commit
        // order, as racing commits on disjoint rows can produce. The
        // journal position decides the listing order.
        let mut early_commit =
            ActivityRecord::frozen_change(&AdminId::new("ops-1"), &alice, true);
        early_commit.created_at = custodia_common::now() + chrono::Duration::minutes(5);
        let late_commit = ActivityRecord::frozen_change(&AdminId::new("ops-2"), &alice, false);

        engine.journal.record_activity(early_commit).unwrap();
        engine.journal.record_activity(late_commit).unwrap();

        let page = engine.list_activity(&ActivityFilter::default(), PageRequest::default());
        assert_eq!(page.items[0].admin, AdminId::new("ops-2"));
        assert!(page.items[0].seq > page.items[1].seq);
        assert!(page.items[0].created_at < page.items[1].created_at);
    }
}
