// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stock transfer policies.

use std::collections::BTreeSet;

use crate::types::{Amount, Jurisdiction};

use super::{Operation, PolicyContext, TransferPolicy};

/// Rejects operations whose receiver resides in a restricted jurisdiction.
#[derive(Debug, Clone, Default)]
pub struct CountryRestriction {
    restricted: BTreeSet<Jurisdiction>,
}

impl CountryRestriction {
    pub fn new(restricted: impl IntoIterator<Item = Jurisdiction>) -> Self {
        Self {
            restricted: restricted.into_iter().collect(),
        }
    }

    pub fn is_restricted(&self, country: Jurisdiction) -> bool {
        self.restricted.contains(&country)
    }
}

impl TransferPolicy for CountryRestriction {
    fn name(&self) -> &str {
        "country_restriction"
    }

    fn approves(&self, operation: &Operation, ctx: &PolicyContext<'_>) -> bool {
        let country = ctx.identities.investor_country(&operation.receiver());
        !self.is_restricted(country)
    }
}

/// Caps the balance any single receiver may end up holding.
#[derive(Debug, Clone, Copy)]
pub struct MaxBalance {
    cap: Amount,
}

impl MaxBalance {
    pub fn new(cap: Amount) -> Self {
        Self { cap }
    }
}

impl TransferPolicy for MaxBalance {
    fn name(&self) -> &str {
        "max_balance"
    }

    fn approves(&self, operation: &Operation, ctx: &PolicyContext<'_>) -> bool {
        let receiver = operation.receiver();
        if let Operation::Transfer { from, .. } = operation {
            if *from == receiver {
                return ctx.ledger.balance_of(&receiver) <= self.cap;
            }
        }
        ctx.ledger
            .balance_of(&receiver)
            .checked_add(operation.amount())
            .is_some_and(|after| after <= self.cap)
    }
}
