//! End-to-end allowance scenario
//!
//! Runs approve -> allowance -> transferFrom -> allowance against any [`Erc20`]
//! backend and records what it observed. Step assertions do not abort the run;
//! transport and provisioning errors do.

use crate::token::Erc20;
use alloy::primitives::{Address, U256};
use eyre::Result;
use futures::future::try_join;
use serde::Serialize;

/// Outcome of one scenario step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// Everything the scenario observed, in order
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioReport {
    pub steps: Vec<StepOutcome>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|step| step.passed)
    }

    /// Names of the steps that failed
    pub fn failures(&self) -> Vec<&'static str> {
        self.steps
            .iter()
            .filter(|step| !step.passed)
            .map(|step| step.name)
            .collect()
    }

    fn record(&mut self, name: &'static str, passed: bool, detail: String) {
        if passed {
            tracing::info!("{}: ok ({})", name, detail);
        } else {
            tracing::warn!("{}: FAILED ({})", name, detail);
        }
        self.steps.push(StepOutcome {
            name,
            passed,
            detail,
        });
    }
}

/// Allowance round trip: the owner approves the spender for `amount`, the
/// spender moves all of it to the recipient, and the allowance must end at zero
#[derive(Debug, Clone)]
pub struct AllowanceScenario {
    amount: U256,
}

impl AllowanceScenario {
    pub fn new(amount: U256) -> Self {
        Self { amount }
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    /// Value used to overwrite the first approval; always differs from `amount`
    fn replacement(&self) -> U256 {
        if self.amount.is_zero() {
            U256::from(1u64)
        } else {
            self.amount / U256::from(2u64)
        }
    }

    /// Run every step; `owner` and `spender` are handles on the same token
    pub async fn run<O: Erc20, S: Erc20>(
        &self,
        owner: &O,
        spender: &S,
        recipient: Address,
    ) -> Result<ScenarioReport> {
        let mut report = ScenarioReport::default();
        let owner_address = owner.caller();
        let spender_address = spender.caller();
        let amount = self.amount;

        // Approve and read back
        let approved = owner.approve(spender_address, amount).await?;
        let allowance = owner.allowance(owner_address, spender_address).await?;
        report.record(
            "approve",
            approved && allowance == amount,
            format!("status {}, allowance {} (want {})", approved, allowance, amount),
        );

        // A second approval with a different value replaces the first, then
        // the original amount is restored for the spend
        let replacement = self.replacement();
        let replaced = owner.approve(spender_address, replacement).await?;
        let replaced_allowance = owner.allowance(owner_address, spender_address).await?;
        let restored = owner.approve(spender_address, amount).await?;
        let restored_allowance = owner.allowance(owner_address, spender_address).await?;
        report.record(
            "reapprove_replaces",
            replaced
                && restored
                && replaced_allowance == replacement
                && restored_allowance == amount,
            format!(
                "allowance {} (want {}), then {} (want {})",
                replaced_allowance, replacement, restored_allowance, amount
            ),
        );

        // Spend the whole allowance
        let (owner_before, recipient_before) = try_join(
            owner.balance_of(owner_address),
            owner.balance_of(recipient),
        )
        .await?;
        let moved = spender
            .transfer_from(owner_address, recipient, amount)
            .await?;
        let (owner_after, recipient_after) = try_join(
            owner.balance_of(owner_address),
            owner.balance_of(recipient),
        )
        .await?;
        let owner_ok = owner_before.checked_sub(amount) == Some(owner_after);
        let recipient_ok = recipient_before.checked_add(amount) == Some(recipient_after);
        report.record(
            "transfer_from",
            moved && owner_ok && recipient_ok,
            format!(
                "status {}, owner {} -> {}, recipient {} -> {}",
                moved, owner_before, owner_after, recipient_before, recipient_after
            ),
        );

        let allowance = owner.allowance(owner_address, spender_address).await?;
        report.record(
            "allowance_spent",
            allowance.is_zero(),
            format!("allowance {} (want 0)", allowance),
        );

        // One unit past the remaining allowance must be refused, not clamped
        let overspend = allowance.saturating_add(U256::from(1u64));
        let outcome = spender
            .transfer_from(owner_address, recipient, overspend)
            .await;
        let refused = match &outcome {
            Ok(status) => !status,
            Err(e) => {
                tracing::debug!("Overspend refused: {:#}", e);
                true
            }
        };
        let (owner_final, recipient_final) = try_join(
            owner.balance_of(owner_address),
            owner.balance_of(recipient),
        )
        .await?;
        let allowance_final = owner.allowance(owner_address, spender_address).await?;
        report.record(
            "overspend_refused",
            refused
                && owner_final == owner_after
                && recipient_final == recipient_after
                && allowance_final == allowance,
            format!(
                "refused {}, owner {}, recipient {}, allowance {}",
                refused, owner_final, recipient_final, allowance_final
            ),
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TokenLedger;
    use std::sync::{Arc, Mutex};

    /// How the test backend treats a new approval
    #[derive(Clone, Copy)]
    enum Approvals {
        Replace,
        /// Add the new amount to the old one
        Accumulate,
        /// Ignore approvals once an allowance is set
        SetOnce,
    }

    /// Ledger handle with configurable approval behavior, to check that the
    /// scenario notices broken backends
    #[derive(Clone)]
    struct SharedLedger {
        ledger: Arc<Mutex<TokenLedger>>,
        caller: Address,
        approvals: Approvals,
    }

    impl SharedLedger {
        fn as_caller(&self, caller: Address) -> Self {
            Self {
                caller,
                ..self.clone()
            }
        }
    }

    impl Erc20 for SharedLedger {
        fn caller(&self) -> Address {
            self.caller
        }

        fn token_address(&self) -> Address {
            Address::ZERO
        }

        async fn balance_of(&self, account: Address) -> Result<U256> {
            Ok(self.ledger.lock().unwrap().balance_of(account))
        }

        async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
            Ok(self.ledger.lock().unwrap().allowance(owner, spender))
        }

        async fn approve(&self, spender: Address, amount: U256) -> Result<bool> {
            let mut ledger = self.ledger.lock().unwrap();
            let current = ledger.allowance(self.caller, spender);
            let amount = match self.approvals {
                Approvals::Replace => amount,
                Approvals::Accumulate => current + amount,
                Approvals::SetOnce if !current.is_zero() => return Ok(true),
                Approvals::SetOnce => amount,
            };
            ledger.approve(self.caller, self.caller, spender, amount)?;
            Ok(true)
        }

        async fn transfer_from(&self, from: Address, to: Address, amount: U256) -> Result<bool> {
            let mut ledger = self.ledger.lock().unwrap();
            ledger.transfer_from(self.caller, from, to, amount)?;
            Ok(true)
        }
    }

    const OWNER: Address = Address::repeat_byte(0x01);
    const SPENDER: Address = Address::repeat_byte(0x02);
    const RECIPIENT: Address = Address::repeat_byte(0x03);

    fn shared(approvals: Approvals) -> SharedLedger {
        SharedLedger {
            ledger: Arc::new(Mutex::new(TokenLedger::new(
                "ffff",
                "F",
                3,
                OWNER,
                U256::from(100u64),
            ))),
            caller: OWNER,
            approvals,
        }
    }

    #[tokio::test]
    async fn test_scenario_passes_on_ledger() {
        let owner = shared(Approvals::Replace);
        let spender = owner.as_caller(SPENDER);

        let report = AllowanceScenario::new(U256::from(100u64))
            .run(&owner, &spender, RECIPIENT)
            .await
            .unwrap();

        assert!(report.passed(), "failures: {:?}", report.failures());
        assert_eq!(report.steps.len(), 5);
        assert_eq!(owner.balance_of(OWNER).await.unwrap(), U256::ZERO);
        assert_eq!(owner.balance_of(RECIPIENT).await.unwrap(), U256::from(100u64));
    }

    #[tokio::test]
    async fn test_scenario_flags_additive_approvals() {
        let owner = shared(Approvals::Accumulate);
        let spender = owner.as_caller(SPENDER);

        let report = AllowanceScenario::new(U256::from(40u64))
            .run(&owner, &spender, RECIPIENT)
            .await
            .unwrap();

        assert!(!report.passed());
        assert!(report.failures().contains(&"reapprove_replaces"));
        assert!(report.failures().contains(&"allowance_spent"));
    }

    #[tokio::test]
    async fn test_scenario_flags_approvals_that_never_replace() {
        let owner = shared(Approvals::SetOnce);
        let spender = owner.as_caller(SPENDER);

        let report = AllowanceScenario::new(U256::from(100u64))
            .run(&owner, &spender, RECIPIENT)
            .await
            .unwrap();

        assert!(!report.passed());
        assert_eq!(report.failures(), vec!["reapprove_replaces"]);
        // The first approval still went through and was spent in full
        assert_eq!(owner.balance_of(RECIPIENT).await.unwrap(), U256::from(100u64));
    }

    #[test]
    fn test_replacement_differs_from_amount() {
        for amount in [0u64, 1, 2, 100] {
            let scenario = AllowanceScenario::new(U256::from(amount));
            assert_ne!(scenario.replacement(), scenario.amount());
        }
    }

    #[test]
    fn test_empty_report_does_not_pass() {
        assert!(!ScenarioReport::default().passed());
    }

    #[test]
    fn test_report_serializes() {
        let mut report = ScenarioReport::default();
        report.record("approve", true, "allowance 100".to_string());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"][0]["name"], "approve");
        assert_eq!(json["steps"][0]["passed"], true);
    }
}
