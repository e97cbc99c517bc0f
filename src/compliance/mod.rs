// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Compliance Gate
//!
//! Decides whether a mint or transfer may be applied. The gate never
//! mutates state; the ledger operation consults it and either commits or
//! rejects with `ComplianceError`.
//!
//! ## Rules
//!
//! - The ledger must not be paused.
//! - Mint: the receiver is registered and verified.
//! - Transfer: sender and receiver are both registered and verified.
//! - Every installed [`TransferPolicy`] approves. With no policies
//!   installed, this rule always passes.

pub mod modules;

use serde::Serialize;
use utoipa::ToSchema;

use crate::ledger::TokenLedger;
use crate::registry::IdentityVerifier;
use crate::types::{Address, Amount};

pub use modules::{CountryRestriction, MaxBalance};

/// A mutating ledger request awaiting a compliance decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Mint {
        to: Address,
        amount: Amount,
    },
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
}

impl Operation {
    pub fn receiver(&self) -> Address {
        match self {
            Operation::Mint { to, .. } | Operation::Transfer { to, .. } => *to,
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            Operation::Mint { amount, .. } | Operation::Transfer { amount, .. } => *amount,
        }
    }
}

/// State a policy may consult. Both views are as of the operation's
/// position in the total order.
pub struct PolicyContext<'a> {
    pub identities: &'a dyn IdentityVerifier,
    pub ledger: &'a TokenLedger,
}

/// Pluggable transfer restriction consulted by the gate.
pub trait TransferPolicy: Send + Sync {
    /// Short identifier used in logs and rejection messages.
    fn name(&self) -> &str;

    fn approves(&self, operation: &Operation, ctx: &PolicyContext<'_>) -> bool;
}

/// Outcome of a compliance evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    Rejected(String),
}

impl Verdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, Verdict::Approved)
    }
}

#[derive(Default)]
pub struct ComplianceGate {
    policies: Vec<Box<dyn TransferPolicy>>,
}

impl ComplianceGate {
    /// Gate with no extra policies.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: impl TransferPolicy + 'static) -> Self {
        self.policies.push(Box::new(policy));
        self
    }

    pub fn policy_names(&self) -> Vec<String> {
        self.policies.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn approve(&self, operation: &Operation, ctx: &PolicyContext<'_>) -> bool {
        self.evaluate(operation, ctx).is_approved()
    }

    /// Evaluate `operation` and explain the first failing rule.
    pub fn evaluate(&self, operation: &Operation, ctx: &PolicyContext<'_>) -> Verdict {
        if ctx.ledger.paused() {
            return Verdict::Rejected("token is paused".into());
        }

        let parties = match operation {
            Operation::Mint { to, .. } => vec![("receiver", *to)],
            Operation::Transfer { from, to, .. } => vec![("sender", *from), ("receiver", *to)],
        };
        for (role, wallet) in &parties {
            if !ctx.identities.is_registered(wallet) {
                return Verdict::Rejected(format!("{role} {wallet} is not registered"));
            }
            if !ctx.identities.is_verified(wallet) {
                return Verdict::Rejected(format!("{role} {wallet} is not verified"));
            }
        }

        for policy in &self.policies {
            if !policy.approves(operation, ctx) {
                return Verdict::Rejected(format!("rejected by policy {}", policy.name()));
            }
        }

        Verdict::Approved
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ledger::TokenMetadata;
    use crate::types::Jurisdiction;
    use std::collections::BTreeMap;

    /// Verifier stub: `(verified, country)` per registered wallet.
    #[derive(Default)]
    pub(crate) struct StubVerifier(pub BTreeMap<Address, (bool, Jurisdiction)>);

    impl IdentityVerifier for StubVerifier {
        fn is_registered(&self, wallet: &Address) -> bool {
            self.0.contains_key(wallet)
        }

        fn is_verified(&self, wallet: &Address) -> bool {
            self.0.get(wallet).is_some_and(|(verified, _)| *verified)
        }

        fn investor_country(&self, wallet: &Address) -> Jurisdiction {
            self.0.get(wallet).map(|(_, c)| *c).unwrap_or(0)
        }
    }

    struct DenyAll;

    impl TransferPolicy for DenyAll {
        fn name(&self) -> &str {
            "deny_all"
        }

        fn approves(&self, _: &Operation, _: &PolicyContext<'_>) -> bool {
            false
        }
    }

    pub(crate) fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    pub(crate) fn unpaused_ledger() -> TokenLedger {
        let mut ledger = TokenLedger::new(TokenMetadata::default());
        ledger.set_paused(false);
        ledger
    }

    fn verifier() -> StubVerifier {
        let mut map = BTreeMap::new();
        map.insert(addr(1), (true, 840));
        map.insert(addr(2), (true, 840));
        map.insert(addr(3), (false, 840));
        StubVerifier(map)
    }

    #[test]
    fn mint_requires_verified_receiver() {
        let gate = ComplianceGate::new();
        let verifier = verifier();
        let ledger = unpaused_ledger();
        let ctx = PolicyContext {
            identities: &verifier,
            ledger: &ledger,
        };

        assert!(gate.approve(&Operation::Mint { to: addr(1), amount: 1 }, &ctx));
        assert!(!gate.approve(&Operation::Mint { to: addr(3), amount: 1 }, &ctx));
        assert!(!gate.approve(&Operation::Mint { to: addr(9), amount: 1 }, &ctx));
    }

    #[test]
    fn transfer_requires_both_parties_verified() {
        let gate = ComplianceGate::new();
        let verifier = verifier();
        let ledger = unpaused_ledger();
        let ctx = PolicyContext {
            identities: &verifier,
            ledger: &ledger,
        };

        let ok = Operation::Transfer { from: addr(1), to: addr(2), amount: 5 };
        assert_eq!(gate.evaluate(&ok, &ctx), Verdict::Approved);

        let bad_sender = Operation::Transfer { from: addr(3), to: addr(2), amount: 5 };
        assert!(matches!(gate.evaluate(&bad_sender, &ctx), Verdict::Rejected(r) if r.starts_with("sender")));

        let bad_receiver = Operation::Transfer { from: addr(1), to: addr(9), amount: 5 };
        assert!(matches!(gate.evaluate(&bad_receiver, &ctx), Verdict::Rejected(r) if r.contains("not registered")));
    }

    #[test]
    fn paused_ledger_rejects_everything() {
        let gate = ComplianceGate::new();
        let verifier = verifier();
        let ledger = TokenLedger::new(TokenMetadata::default());
        let ctx = PolicyContext {
            identities: &verifier,
            ledger: &ledger,
        };
        assert_eq!(
            gate.evaluate(&Operation::Mint { to: addr(1), amount: 1 }, &ctx),
            Verdict::Rejected("token is paused".into())
        );
    }

    #[test]
    fn installed_policy_is_consulted() {
        let gate = ComplianceGate::new().with_policy(DenyAll);
        assert_eq!(gate.policy_names(), vec!["deny_all".to_string()]);
        let verifier = verifier();
        let ledger = unpaused_ledger();
        let ctx = PolicyContext {
            identities: &verifier,
            ledger: &ledger,
        };
        let op = Operation::Transfer { from: addr(1), to: addr(2), amount: 5 };
        assert_eq!(
            gate.evaluate(&op, &ctx),
            Verdict::Rejected("rejected by policy deny_all".into())
        );
    }
}
