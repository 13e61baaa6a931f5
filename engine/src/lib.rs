//! Custodia Ledger Engine
//!
//! Balance and transfer ledger for the administrative console: per-account
//! row locking, an append-only journal of transfers and admin activity, and
//! replay-based reconciliation.

pub mod account;
pub mod activity;
pub mod config;
pub mod engine;
pub mod journal;
pub mod metrics;
pub mod mutation_service;
pub mod query;
pub mod reconciliation;
pub mod store;
pub mod transfer;
pub mod transfer_processor;

pub use account::Account;
pub use activity::{ActivityAction, ActivityRecord};
pub use config::EngineConfig;
pub use engine::LedgerEngine;
pub use journal::{Journal, JournalBatch};
pub use metrics::{EngineMetrics, MetricsSnapshot, SharedMetrics};
pub use mutation_service::MutationService;
pub use query::{ActivityFilter, Page, PageRequest, TransferFilter};
pub use reconciliation::{AccountDrift, ReconciliationReport, Reconciler};
pub use store::AccountStore;
pub use transfer::{TransferRecord, TransferStatus};
pub use transfer_processor::TransferProcessor;
