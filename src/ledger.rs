// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token Ledger: balances, total supply and the pause switch.
//!
//! The ledger validates amounts and balances and plans the resulting
//! writes. Authorization and the compliance decision happen in the suite
//! before a plan is committed. Total supply always equals the sum of all
//! balances.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{CoreError, CoreResult};
use crate::storage::Change;
use crate::types::{Address, Amount};

/// Descriptive token metadata, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: "Tokenized Stock".to_string(),
            symbol: "TSTOCK".to_string(),
            decimals: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenLedger {
    metadata: TokenMetadata,
    balances: BTreeMap<Address, Amount>,
    total_supply: Amount,
    paused: bool,
}

impl TokenLedger {
    /// A new ledger holds no balances and starts paused.
    pub fn new(metadata: TokenMetadata) -> Self {
        Self {
            metadata,
            balances: BTreeMap::new(),
            total_supply: 0,
            paused: true,
        }
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    /// Balance of `address`; zero for unknown addresses.
    pub fn balance_of(&self, address: &Address) -> Amount {
        self.balances.get(address).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Number of addresses with a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    pub fn plan_mint(&self, to: Address, amount: Amount) -> CoreResult<Vec<Change>> {
        if amount == 0 {
            return Err(CoreError::InvalidAmount("mint amount must be positive".into()));
        }
        if to.is_zero() {
            return Err(CoreError::InvalidArgument("cannot mint to the null address".into()));
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| CoreError::InvalidAmount("total supply overflow".into()))?;
        // Each balance is bounded by the supply, so this cannot overflow.
        let balance = self.balance_of(&to) + amount;
        Ok(vec![
            Change::PutBalance(to, balance),
            Change::SetTotalSupply(supply),
        ])
    }

    pub fn plan_burn(&self, from: Address, amount: Amount) -> CoreResult<Vec<Change>> {
        if amount == 0 {
            return Err(CoreError::InvalidAmount("burn amount must be positive".into()));
        }
        let available = self.balance_of(&from);
        if available < amount {
            return Err(CoreError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        Ok(vec![
            Change::PutBalance(from, available - amount),
            Change::SetTotalSupply(self.total_supply - amount),
        ])
    }

    pub fn plan_transfer(
        &self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> CoreResult<Vec<Change>> {
        if to.is_zero() {
            return Err(CoreError::InvalidArgument(
                "cannot transfer to the null address".into(),
            ));
        }
        let available = self.balance_of(&from);
        if available < amount {
            return Err(CoreError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        if from == to {
            return Ok(Vec::new());
        }
        Ok(vec![
            Change::PutBalance(from, available - amount),
            Change::PutBalance(to, self.balance_of(&to) + amount),
        ])
    }

    pub(crate) fn set_balance(&mut self, address: Address, amount: Amount) {
        if amount == 0 {
            self.balances.remove(&address);
        } else {
            self.balances.insert(address, amount);
        }
    }

    pub(crate) fn set_total_supply(&mut self, supply: Amount) {
        self.total_supply = supply;
    }

    pub(crate) fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}
