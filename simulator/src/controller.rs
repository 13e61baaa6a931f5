//! Simulation controller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{info, warn};

use custodia_common::{AdminId, CustodiaError, UserId};
use custodia_engine::{EngineConfig, LedgerEngine, PageRequest, TransferFilter};

use crate::metrics::SimulationMetrics;
use crate::scenario::{Scenario, ScenarioCheck, ScenarioStep};
use crate::seed::AccountSeeder;

/// Administrators the load generator acts as.
const ADMINS: [&str; 3] = ["ops-1", "ops-2", "ops-3"];

/// Controls the simulation.
pub struct SimulationController {
    /// Number of accounts to seed.
    account_count: usize,
    /// Simulation speed multiplier.
    speed: f64,
    /// Engine under simulation.
    engine: Arc<LedgerEngine>,
    /// Seeded account ids.
    users: Arc<RwLock<Vec<UserId>>>,
    /// Random number generator.
    rng: Arc<RwLock<StdRng>>,
    /// Simulation metrics.
    metrics: Arc<RwLock<SimulationMetrics>>,
    /// Running flag.
    running: Arc<RwLock<bool>>,
}

impl SimulationController {
    /// Create a new simulation controller.
    pub fn new(config: EngineConfig, account_count: usize, speed: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Self {
            account_count,
            speed,
            engine: Arc::new(LedgerEngine::new(config)),
            users: Arc::new(RwLock::new(Vec::new())),
            rng: Arc::new(RwLock::new(rng)),
            metrics: Arc::new(RwLock::new(SimulationMetrics::new())),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Initialize the simulation population.
    pub async fn initialize(&mut self) -> anyhow::Result<()> {
        info!(
            "Initializing simulation with {} accounts",
            self.account_count
        );

        let seeded = {
            let mut rng = self.rng.write().await;
            AccountSeeder::seed(&self.engine, self.account_count, &mut rng)?
        };
        *self.users.write().await = seeded;

        Ok(())
    }

    /// Run a scripted scenario.
    pub async fn run_scenario(&self, scenario: Scenario) -> anyhow::Result<()> {
        info!(
            "Running scenario: {} - {}",
            scenario.name, scenario.description
        );

        *self.running.write().await = true;

        for step in &scenario.steps {
            if !*self.running.read().await {
                break;
            }

            self.execute_step(step).await?;
        }

        *self.running.write().await = false;

        Ok(())
    }

    /// Run in continuous load mode.
    pub async fn run(&self, duration: Option<Duration>) -> anyhow::Result<()> {
        info!("Running simulation in load mode");

        *self.running.write().await = true;

        let engine = self.engine.clone();
        let users = self.users.clone();
        let metrics = self.metrics.clone();
        let rng = self.rng.clone();
        let running = self.running.clone();
        let speed = self.speed;

        let handle = tokio::spawn(async move {
            loop {
                if !*running.read().await {
                    break;
                }

                let users_guard = users.read().await;
                if users_guard.len() < 2 {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }

                let (from_idx, to_idx, cents, roll, frozen, admin) = {
                    let mut rng_guard = rng.write().await;
                    let from = rng_guard.gen_range(0..users_guard.len());
                    let mut to = rng_guard.gen_range(0..users_guard.len());
                    while to == from {
                        to = rng_guard.gen_range(0..users_guard.len());
                    }
                    (
                        from,
                        to,
                        rng_guard.gen_range(1..50_000u32),
                        rng_guard.gen_range(0..100u32),
                        // Freeze less often than unfreeze, so most accounts
                        // stay transferable.
                        rng_guard.gen_bool(0.3),
                        AdminId::new(ADMINS[rng_guard.gen_range(0..ADMINS.len())]),
                    )
                };
                let amount = Decimal::new(i64::from(cents), 2);

                let started = Instant::now();
                let result: Result<(), CustodiaError> = if roll < 80 {
                    engine
                        .transfer(&admin, &users_guard[from_idx], &users_guard[to_idx], amount, None)
                        .map(|_| ())
                } else if roll < 90 {
                    engine
                        .set_frozen(&admin, &users_guard[from_idx], frozen)
                        .map(|_| ())
                } else {
                    engine
                        .set_balance(&admin, &users_guard[from_idx], amount * Decimal::from(10))
                        .map(|_| ())
                };

                {
                    let mut metrics_guard = metrics.write().await;
                    match &result {
                        Ok(()) => {
                            metrics_guard.record_completed(started.elapsed().as_micros() as u64)
                        }
                        Err(err) if err.is_retryable() => {
                            warn!(error = %err, "retryable rejection under load");
                            metrics_guard.record_busy();
                        }
                        Err(_) => metrics_guard.record_business_rejection(),
                    }
                }

                drop(users_guard);

                // Wait based on speed.
                let delay = Duration::from_millis((1000.0 / speed) as u64);
                tokio::time::sleep(delay).await;
            }
        });

        // Wait for duration or Ctrl+C.
        match duration {
            Some(d) => {
                tokio::time::sleep(d).await;
            }
            None => {
                tokio::signal::ctrl_c().await?;
            }
        }

        *self.running.write().await = false;
        handle.await?;

        Ok(())
    }

    /// Execute a single scenario step.
    async fn execute_step(&self, step: &ScenarioStep) -> anyhow::Result<()> {
        let admin = AdminId::new("scenario");
        match step {
            ScenarioStep::Wait { seconds } => {
                let adjusted = (*seconds as f64 / self.speed) as u64;
                info!("Waiting {} seconds (adjusted: {})", seconds, adjusted);
                tokio::time::sleep(Duration::from_secs(adjusted)).await;
            }
            ScenarioStep::SetBalance { user, amount } => {
                let amount = parse_amount(amount)?;
                let target = UserId::new(user.as_str());
                let started = Instant::now();
                let result = self.engine.set_balance(&admin, &target, amount);
                self.note_result(started, &result).await;
                result.with_context(|| format!("set_balance on {user}"))?;
            }
            ScenarioStep::SetFrozen { user, frozen } => {
                let target = UserId::new(user.as_str());
                let started = Instant::now();
                let result = self.engine.set_frozen(&admin, &target, *frozen);
                self.note_result(started, &result).await;
                result.with_context(|| format!("set_frozen on {user}"))?;
            }
            ScenarioStep::Transfer { from, to, amount } => {
                let amount = parse_amount(amount)?;
                let started = Instant::now();
                let result = self.engine.transfer(
                    &admin,
                    &UserId::new(from.as_str()),
                    &UserId::new(to.as_str()),
                    amount,
                    None,
                );
                self.note_result(started, &result).await;
                result.with_context(|| format!("transfer {from} -> {to}"))?;
            }
            ScenarioStep::ExpectRejectedTransfer {
                from,
                to,
                amount,
                code,
            } => {
                let amount = parse_amount(amount)?;
                let started = Instant::now();
                let result = self.engine.transfer(
                    &admin,
                    &UserId::new(from.as_str()),
                    &UserId::new(to.as_str()),
                    amount,
                    None,
                );
                self.note_result(started, &result).await;
                match result {
                    Ok(record) => bail!(
                        "expected {code} rejection, but transfer {} committed",
                        record.id
                    ),
                    Err(err) if err.error_code() == code => {
                        info!(code = %code, "transfer rejected as scripted");
                    }
                    Err(err) => bail!(
                        "expected {code} rejection, engine returned {}: {err}",
                        err.error_code()
                    ),
                }
            }
            ScenarioStep::Churn { transfers } => {
                info!(transfers = *transfers, "running churn burst");
                let users = self.users.read().await.clone();
                if users.len() < 2 {
                    bail!("churn needs at least two seeded accounts");
                }
                for _ in 0..*transfers {
                    let (from_idx, to_idx, cents) = {
                        let mut rng = self.rng.write().await;
                        let from = rng.gen_range(0..users.len());
                        let mut to = rng.gen_range(0..users.len());
                        while to == from {
                            to = rng.gen_range(0..users.len());
                        }
                        (from, to, rng.gen_range(1..10_000u32))
                    };
                    let started = Instant::now();
                    let result = self
                        .engine
                        .transfer(
                            &admin,
                            &users[from_idx],
                            &users[to_idx],
                            Decimal::new(i64::from(cents), 2),
                            None,
                        )
                        .map(|_| ());
                    self.note_result(started, &result).await;
                }
            }
            ScenarioStep::Assert { check } => {
                self.check_condition(check)?;
            }
        }

        Ok(())
    }

    /// Evaluate one scenario assertion against live engine state.
    fn check_condition(&self, check: &ScenarioCheck) -> anyhow::Result<()> {
        match check {
            ScenarioCheck::BalanceEquals { user, amount } => {
                let expected = parse_amount(amount)?;
                let account = self.engine.account(&UserId::new(user.as_str()))?;
                if account.balance != expected {
                    bail!(
                        "balance check failed for {user}: live {} expected {expected}",
                        account.balance
                    );
                }
                info!(user = %user, balance = %account.balance, "balance check passed");
            }
            ScenarioCheck::FrozenEquals { user, frozen } => {
                let account = self.engine.account(&UserId::new(user.as_str()))?;
                if account.frozen != *frozen {
                    bail!(
                        "frozen check failed for {user}: live {} expected {frozen}",
                        account.frozen
                    );
                }
                info!(user = %user, frozen = *frozen, "frozen check passed");
            }
            ScenarioCheck::TransferCountAtLeast { count } => {
                let total = self
                    .engine
                    .list_transfers(&TransferFilter::default(), PageRequest::default())
                    .total as u64;
                if total < *count {
                    bail!("transfer count check failed: {total} committed, expected >= {count}");
                }
                info!(total, "transfer count check passed");
            }
            ScenarioCheck::ReplayMatches => {
                let report = self.engine.reconcile_all()?;
                if !report.is_clean() {
                    bail!(
                        "replay check failed: {} accounts drifted from their history",
                        report.drifts.len()
                    );
                }
                info!(accounts = report.accounts_checked, "replay check passed");
            }
        }

        Ok(())
    }

    /// Verify ledger invariants after the run.
    pub fn verify(&self) -> anyhow::Result<()> {
        let report = self.engine.reconcile_all()?;
        if !report.is_clean() {
            for drift in &report.drifts {
                warn!(
                    user = %drift.user_id,
                    ledger = %drift.ledger_balance,
                    replayed = %drift.replayed_balance,
                    "account drifted from journal history"
                );
            }
            bail!(
                "reconciliation found {} drifted accounts",
                report.drifts.len()
            );
        }
        info!(
            accounts = report.accounts_checked,
            "final reconciliation clean"
        );

        let snapshot = self.engine.metrics().snapshot();
        info!(
            transfers_completed = snapshot.transfers_completed,
            transfers_rejected = snapshot.transfers_rejected,
            journal_rows = snapshot.journal_rows,
            "engine counters"
        );

        Ok(())
    }

    async fn note_result<T>(&self, started: Instant, result: &Result<T, CustodiaError>) {
        let mut metrics = self.metrics.write().await;
        match result {
            Ok(_) => metrics.record_completed(started.elapsed().as_micros() as u64),
            Err(err) if err.is_retryable() => metrics.record_busy(),
            Err(_) => metrics.record_business_rejection(),
        }
    }

    /// Get simulation metrics.
    pub async fn get_metrics(&self) -> SimulationMetrics {
        self.metrics.read().await.clone()
    }

    /// Stop the simulation.
    #[allow(dead_code)]
    pub async fn stop(&self) {
        *self.running.write().await = false;
    }
}

fn parse_amount(raw: &str) -> anyhow::Result<Decimal> {
    Decimal::from_str_exact(raw).with_context(|| format!("invalid amount {raw:?}"))
}
