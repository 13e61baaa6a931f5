//! Account seeding for simulation runs.

use anyhow::Context;
use custodia_common::{AdminId, Currency, UserId};
use custodia_engine::LedgerEngine;
use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::Decimal;
use tracing::info;

/// Named users seeded first; accounts beyond the list get generated ids.
const SEED_USERS: [&str; 8] = [
    "alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi",
];

/// Registers and funds the simulation population.
pub struct AccountSeeder;

impl AccountSeeder {
    /// Register `count` accounts, each funded with a random opening balance.
    pub fn seed(
        engine: &LedgerEngine,
        count: usize,
        rng: &mut StdRng,
    ) -> anyhow::Result<Vec<UserId>> {
        let admin = AdminId::new("seeder");
        let mut users = Vec::with_capacity(count);

        for n in 0..count {
            let user = if n < SEED_USERS.len() {
                UserId::new(SEED_USERS[n])
            } else {
                UserId::new(format!("user-{:03}", n))
            };

            engine
                .register_account(&user, Currency::usd())
                .with_context(|| format!("registering {user}"))?;

            // Opening balances between 100.00 and 10,000.00.
            let cents = rng.gen_range(10_000..=1_000_000u32);
            engine
                .set_balance(&admin, &user, Decimal::new(i64::from(cents), 2))
                .with_context(|| format!("funding {user}"))?;

            users.push(user);
        }

        info!(accounts = users.len(), "seeded simulation accounts");
        Ok(users)
    }
}
