//! Simulation scenarios.
//!
//! A scenario is a scripted sequence of administrative operations with
//! executable checks. Steps reference seeded accounts by user id.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// A scripted simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// A step in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Wait for a duration.
    Wait { seconds: u64 },
    /// Override an account balance.
    SetBalance { user: String, amount: String },
    /// Freeze or unfreeze an account.
    SetFrozen { user: String, frozen: bool },
    /// Transfer between two accounts; the step fails if the engine rejects.
    Transfer {
        from: String,
        to: String,
        amount: String,
    },
    /// Attempt a transfer that must be rejected with the given error code.
    ExpectRejectedTransfer {
        from: String,
        to: String,
        amount: String,
        code: String,
    },
    /// Fire a burst of random transfers between seeded accounts.
    Churn { transfers: u64 },
    /// Check a condition against live engine state.
    Assert { check: ScenarioCheck },
}

/// Conditions that can be asserted mid-scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioCheck {
    /// An account holds exactly this balance.
    BalanceEquals { user: String, amount: String },
    /// An account's frozen flag has this value.
    FrozenEquals { user: String, frozen: bool },
    /// At least this many transfers have committed.
    TransferCountAtLeast { count: u64 },
    /// Every live balance matches its replayed journal history.
    ReplayMatches,
}

impl Scenario {
    /// Load a built-in scenario by name.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "simple-transfer" => Ok(Self::simple_transfer()),
            "frozen-account" => Ok(Self::frozen_account()),
            "override-and-replay" => Ok(Self::override_and_replay()),
            "high-contention" => Ok(Self::high_contention()),
            _ => Err(anyhow::anyhow!("Unknown scenario: {}", name)),
        }
    }

    /// Load a scenario from a JSON file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing scenario file {}", path.display()))
    }

    /// Fund one account, move part of it, check both sides.
    fn simple_transfer() -> Self {
        Self {
            name: "simple-transfer".to_string(),
            description: "Fund one account and move part of the balance".to_string(),
            steps: vec![
                ScenarioStep::SetBalance {
                    user: "alice".to_string(),
                    amount: "100.00".to_string(),
                },
                ScenarioStep::SetBalance {
                    user: "bob".to_string(),
                    amount: "0.00".to_string(),
                },
                ScenarioStep::Transfer {
                    from: "alice".to_string(),
                    to: "bob".to_string(),
                    amount: "40.00".to_string(),
                },
                ScenarioStep::Assert {
                    check: ScenarioCheck::BalanceEquals {
                        user: "alice".to_string(),
                        amount: "60.00".to_string(),
                    },
                },
                ScenarioStep::Assert {
                    check: ScenarioCheck::BalanceEquals {
                        user: "bob".to_string(),
                        amount: "40.00".to_string(),
                    },
                },
                ScenarioStep::Assert {
                    check: ScenarioCheck::ReplayMatches,
                },
            ],
        }
    }

    /// A frozen account rejects transfers in both directions and keeps
    /// its balance.
    fn frozen_account() -> Self {
        Self {
            name: "frozen-account".to_string(),
            description: "Frozen accounts reject transfers in both roles".to_string(),
            steps: vec![
                ScenarioStep::SetBalance {
                    user: "alice".to_string(),
                    amount: "50.00".to_string(),
                },
                ScenarioStep::SetBalance {
                    user: "carol".to_string(),
                    amount: "10.00".to_string(),
                },
                ScenarioStep::SetFrozen {
                    user: "carol".to_string(),
                    frozen: true,
                },
                ScenarioStep::ExpectRejectedTransfer {
                    from: "carol".to_string(),
                    to: "alice".to_string(),
                    amount: "5.00".to_string(),
                    code: "ACCOUNT_FROZEN".to_string(),
                },
                ScenarioStep::ExpectRejectedTransfer {
                    from: "alice".to_string(),
                    to: "carol".to_string(),
                    amount: "5.00".to_string(),
                    code: "ACCOUNT_FROZEN".to_string(),
                },
                ScenarioStep::Assert {
                    check: ScenarioCheck::BalanceEquals {
                        user: "carol".to_string(),
                        amount: "10.00".to_string(),
                    },
                },
                ScenarioStep::Assert {
                    check: ScenarioCheck::FrozenEquals {
                        user: "carol".to_string(),
                        frozen: true,
                    },
                },
                ScenarioStep::Assert {
                    check: ScenarioCheck::ReplayMatches,
                },
            ],
        }
    }

    /// Overrides interleaved with transfers still replay exactly.
    fn override_and_replay() -> Self {
        Self {
            name: "override-and-replay".to_string(),
            description: "Overrides interleaved with transfers replay exactly".to_string(),
            steps: vec![
                ScenarioStep::SetBalance {
                    user: "alice".to_string(),
                    amount: "250.00".to_string(),
                },
                ScenarioStep::Transfer {
                    from: "alice".to_string(),
                    to: "bob".to_string(),
                    amount: "75.50".to_string(),
                },
                ScenarioStep::SetBalance {
                    user: "alice".to_string(),
                    amount: "10.00".to_string(),
                },
                ScenarioStep::ExpectRejectedTransfer {
                    from: "alice".to_string(),
                    to: "bob".to_string(),
                    amount: "10.01".to_string(),
                    code: "INSUFFICIENT_FUNDS".to_string(),
                },
                ScenarioStep::Assert {
                    check: ScenarioCheck::BalanceEquals {
                        user: "alice".to_string(),
                        amount: "10.00".to_string(),
                    },
                },
                ScenarioStep::Assert {
                    check: ScenarioCheck::ReplayMatches,
                },
            ],
        }
    }

    /// Random transfer burst across the whole population.
    fn high_contention() -> Self {
        Self {
            name: "high-contention".to_string(),
            description: "Random transfer burst across all seeded accounts".to_string(),
            steps: vec![
                ScenarioStep::Churn { transfers: 500 },
                ScenarioStep::Assert {
                    check: ScenarioCheck::TransferCountAtLeast { count: 1 },
                },
                ScenarioStep::Assert {
                    check: ScenarioCheck::ReplayMatches,
                },
            ],
        }
    }
}
