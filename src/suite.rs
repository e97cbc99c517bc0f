// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Compliance Suite
//!
//! Owns every registry, the identity store and the token ledger, and is the
//! only place state changes.
//!
//! Each mutating operation runs the same pipeline:
//!
//! 1. `authorize` the caller for the operation's role
//! 2. plan a changeset against a read-only view of current state
//! 3. consult the compliance gate (mint and transfer only)
//! 4. commit the changeset to the backend
//! 5. apply the same changeset in memory
//!
//! Any failure before step 5 leaves memory and the backend untouched. The
//! caller serializes mutations (see `AppState`), which gives every operation
//! a consistent snapshot and a position in a total order.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::auth::{authorize, Role, RoleMap};
use crate::compliance::{ComplianceGate, Operation, PolicyContext, Verdict};
use crate::error::{CoreError, CoreResult};
use crate::identity::{recover_claim_signer, Identity, IdentityStore};
use crate::ledger::{TokenLedger, TokenMetadata};
use crate::registry::{
    ClaimTopicsRegistry, IdentityRegistry, IdentityVerifier, RegistryView, TrustedIssuersRegistry,
};
use crate::storage::{Change, MemoryBackend, StateBackend};
use crate::types::{Address, Amount, Claim, ClaimId, ClaimTopic, IdentityRecord, Jurisdiction};
use crate::verification::{self, TopicStatus};

/// One entry of a batch registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub wallet: Address,
    pub identity: Address,
    pub jurisdiction: Jurisdiction,
}

/// In-memory projection of everything the backend stores.
#[derive(Debug, Clone)]
pub struct SuiteState {
    pub roles: RoleMap,
    pub topics: ClaimTopicsRegistry,
    pub issuers: TrustedIssuersRegistry,
    pub identities: IdentityStore,
    pub registry: IdentityRegistry,
    pub ledger: TokenLedger,
}

impl SuiteState {
    pub fn new(metadata: TokenMetadata) -> Self {
        Self {
            roles: RoleMap::new(),
            topics: ClaimTopicsRegistry::new(),
            issuers: TrustedIssuersRegistry::new(),
            identities: IdentityStore::new(),
            registry: IdentityRegistry::new(),
            ledger: TokenLedger::new(metadata),
        }
    }

    pub fn view(&self) -> RegistryView<'_> {
        RegistryView {
            registry: &self.registry,
            identities: &self.identities,
            topics: &self.topics,
            issuers: &self.issuers,
        }
    }

    fn apply(&mut self, change: &Change) {
        match change {
            Change::PutSuiteRoles(principal, roles) => {
                self.roles.set_roles(*principal, roles.clone());
            }
            Change::AddClaimTopic(topic) => self.topics.insert(*topic),
            Change::RemoveClaimTopic(topic) => self.topics.remove(topic),
            Change::PutTrustedIssuer(issuer, topics) => self.issuers.put(*issuer, topics),
            Change::RemoveTrustedIssuer(issuer) => self.issuers.remove(issuer),
            Change::PutIdentityKeys(address, keys) => match self.identities.get_mut(address) {
                Some(identity) => identity.keys = keys.clone(),
                None => self.identities.insert(Identity {
                    address: *address,
                    keys: keys.clone(),
                    claims: Default::default(),
                }),
            },
            Change::PutClaim(address, claim) => match self.identities.get_mut(address) {
                Some(identity) => {
                    identity.claims.insert(claim.id(), claim.clone());
                }
                None => warn!(identity = %address, "Dropping claim for unknown identity"),
            },
            Change::RemoveClaim(address, claim_id) => {
                if let Some(identity) = self.identities.get_mut(address) {
                    identity.claims.remove(claim_id);
                }
            }
            Change::SetIdentityNonce(nonce) => self.identities.set_nonce(*nonce),
            Change::PutIdentityRecord(record) => self.registry.put(record.clone()),
            Change::RemoveIdentityRecord(wallet) => self.registry.remove(wallet),
            Change::PutBalance(holder, amount) => self.ledger.set_balance(*holder, *amount),
            Change::SetTotalSupply(supply) => self.ledger.set_total_supply(*supply),
            Change::SetPaused(paused) => self.ledger.set_paused(*paused),
        }
    }
}

pub struct ComplianceSuite {
    state: SuiteState,
    backend: Box<dyn StateBackend>,
    gate: ComplianceGate,
}

impl ComplianceSuite {
    /// Rebuild state from `backend`.
    pub fn open(
        backend: Box<dyn StateBackend>,
        metadata: TokenMetadata,
        gate: ComplianceGate,
    ) -> CoreResult<Self> {
        let mut state = SuiteState::new(metadata);
        let changes = backend.load()?;
        for change in &changes {
            state.apply(change);
        }
        info!(
            backend = backend.name(),
            replayed = changes.len(),
            identities = state.identities.len(),
            registered = state.registry.len(),
            total_supply = %state.ledger.total_supply(),
            paused = state.ledger.paused(),
            policies = ?gate.policy_names(),
            "Compliance suite loaded"
        );
        Ok(Self {
            state,
            backend,
            gate,
        })
    }

    /// Empty suite on an in-memory backend with default token metadata.
    pub fn in_memory(gate: ComplianceGate) -> Self {
        Self {
            state: SuiteState::new(TokenMetadata::default()),
            backend: Box::new(MemoryBackend::new()),
            gate,
        }
    }

    pub fn state(&self) -> &SuiteState {
        &self.state
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn gate(&self) -> &ComplianceGate {
        &self.gate
    }

    fn commit(&mut self, changes: Vec<Change>) -> CoreResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        self.backend.commit(&changes)?;
        for change in &changes {
            self.state.apply(change);
        }
        debug!(changes = changes.len(), "Committed changeset");
        Ok(())
    }

    // =========================================================================
    // Suite roles
    // =========================================================================

    /// Grant Owner and Agent to `owner` when the suite has no owner yet.
    ///
    /// Returns `false` when an owner already exists.
    pub fn bootstrap_owner(&mut self, owner: Address) -> CoreResult<bool> {
        if !self.state.roles.holders(Role::Owner).is_empty() {
            return Ok(false);
        }
        if owner.is_zero() {
            return Err(CoreError::InvalidArgument("owner is the null address".into()));
        }
        let mut roles = self.state.roles.roles_of(&owner);
        roles.insert(Role::Owner);
        roles.insert(Role::Agent);
        self.commit(vec![Change::PutSuiteRoles(owner, roles)])?;
        info!(%owner, "Bootstrapped suite owner");
        Ok(true)
    }

    pub fn owners(&self) -> Vec<Address> {
        self.state.roles.holders(Role::Owner)
    }

    pub fn agents(&self) -> Vec<Address> {
        self.state.roles.holders(Role::Agent)
    }

    pub fn is_agent(&self, principal: &Address) -> bool {
        self.state.roles.has_role(principal, Role::Agent)
    }

    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Owner)?;
        if new_owner.is_zero() {
            return Err(CoreError::InvalidArgument("new owner is the null address".into()));
        }
        if new_owner == caller {
            return Ok(());
        }
        let mut previous = self.state.roles.roles_of(&caller);
        previous.remove(&Role::Owner);
        let mut next = self.state.roles.roles_of(&new_owner);
        next.insert(Role::Owner);
        self.commit(vec![
            Change::PutSuiteRoles(caller, previous),
            Change::PutSuiteRoles(new_owner, next),
        ])?;
        info!(from = %caller, to = %new_owner, "Suite ownership transferred");
        Ok(())
    }

    pub fn add_agent(&mut self, caller: Address, agent: Address) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Owner)?;
        if agent.is_zero() {
            return Err(CoreError::InvalidArgument("agent is the null address".into()));
        }
        let mut roles = self.state.roles.roles_of(&agent);
        if !roles.insert(Role::Agent) {
            return Err(CoreError::InvalidArgument(format!("{agent} is already an agent")));
        }
        self.commit(vec![Change::PutSuiteRoles(agent, roles)])?;
        info!(%agent, by = %caller, "Agent added");
        Ok(())
    }

    pub fn remove_agent(&mut self, caller: Address, agent: Address) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Owner)?;
        let mut roles = self.state.roles.roles_of(&agent);
        if !roles.remove(&Role::Agent) {
            return Err(CoreError::InvalidArgument(format!("{agent} is not an agent")));
        }
        self.commit(vec![Change::PutSuiteRoles(agent, roles)])?;
        info!(%agent, by = %caller, "Agent removed");
        Ok(())
    }

    // =========================================================================
    // Claim topics and trusted issuers
    // =========================================================================

    pub fn claim_topics(&self) -> Vec<ClaimTopic> {
        self.state.topics.topics()
    }

    pub fn add_claim_topic(&mut self, caller: Address, topic: ClaimTopic) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Owner)?;
        let change = self.state.topics.plan_add(topic)?;
        self.commit(vec![change])?;
        info!(%topic, "Claim topic required");
        Ok(())
    }

    pub fn remove_claim_topic(&mut self, caller: Address, topic: ClaimTopic) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Owner)?;
        let change = self.state.topics.plan_remove(topic)?;
        self.commit(vec![change])?;
        info!(%topic, "Claim topic no longer required");
        Ok(())
    }

    pub fn trusted_issuers(&self) -> &TrustedIssuersRegistry {
        &self.state.issuers
    }

    pub fn add_trusted_issuer(
        &mut self,
        caller: Address,
        issuer: Address,
        topics: &[ClaimTopic],
    ) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Owner)?;
        let change = self.state.issuers.plan_add(issuer, topics)?;
        self.commit(vec![change])?;
        info!(%issuer, topics = topics.len(), "Trusted issuer added");
        Ok(())
    }

    pub fn remove_trusted_issuer(&mut self, caller: Address, issuer: Address) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Owner)?;
        let change = self.state.issuers.plan_remove(issuer)?;
        self.commit(vec![change])?;
        info!(%issuer, "Trusted issuer removed");
        Ok(())
    }

    pub fn update_issuer_claim_topics(
        &mut self,
        caller: Address,
        issuer: Address,
        topics: &[ClaimTopic],
    ) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Owner)?;
        let change = self.state.issuers.plan_update(issuer, topics)?;
        self.commit(vec![change])?;
        info!(%issuer, topics = topics.len(), "Trusted issuer topics updated");
        Ok(())
    }

    // =========================================================================
    // Identities and claims
    // =========================================================================

    pub fn identity_object(&self, identity: &Address) -> Option<&Identity> {
        self.state.identities.get(identity)
    }

    fn existing_identity(&self, identity: &Address) -> CoreResult<&Identity> {
        self.state
            .identities
            .get(identity)
            .ok_or(CoreError::IdentityNotFound(*identity))
    }

    /// Create an identity managed by `manager` and return its address.
    ///
    /// Open to any caller; the identity carries no trust until claims from
    /// trusted issuers are attached.
    pub fn create_identity(&mut self, caller: Address, manager: Address) -> CoreResult<Address> {
        if manager.is_zero() {
            return Err(CoreError::InvalidArgument("manager is the null address".into()));
        }
        let nonce = self.state.identities.nonce();
        let address = self.state.identities.next_address(manager);
        if self.state.identities.contains(&address) {
            return Err(CoreError::InvalidArgument(format!(
                "identity {address} already exists"
            )));
        }
        self.commit(vec![
            Change::PutIdentityKeys(address, RoleMap::with(manager, Role::Owner)),
            Change::SetIdentityNonce(nonce + 1),
        ])?;
        info!(identity = %address, %manager, by = %caller, "Identity created");
        Ok(address)
    }

    pub fn add_key(
        &mut self,
        caller: Address,
        identity: Address,
        key: Address,
        role: Role,
    ) -> CoreResult<()> {
        let current = self.existing_identity(&identity)?;
        authorize(&current.keys, &caller, Role::Owner)?;
        if key.is_zero() {
            return Err(CoreError::InvalidArgument("key is the null address".into()));
        }
        let mut keys = current.keys.clone();
        if !keys.grant(key, role) {
            return Err(CoreError::InvalidArgument(format!("{key} already holds {role}")));
        }
        self.commit(vec![Change::PutIdentityKeys(identity, keys)])?;
        info!(%identity, %key, %role, "Identity key added");
        Ok(())
    }

    pub fn remove_key(
        &mut self,
        caller: Address,
        identity: Address,
        key: Address,
        role: Role,
    ) -> CoreResult<()> {
        let current = self.existing_identity(&identity)?;
        authorize(&current.keys, &caller, Role::Owner)?;
        let mut keys = current.keys.clone();
        if !keys.revoke(&key, role) {
            return Err(CoreError::InvalidArgument(format!("{key} does not hold {role}")));
        }
        if keys.holders(Role::Owner).is_empty() {
            return Err(CoreError::InvalidArgument(
                "cannot remove the last owner key".into(),
            ));
        }
        self.commit(vec![Change::PutIdentityKeys(identity, keys)])?;
        info!(%identity, %key, %role, "Identity key removed");
        Ok(())
    }

    /// Attach `claim` to `identity`, replacing any claim with the same
    /// issuer and topic.
    ///
    /// The signature must recover to a `ClaimSigner` key of the issuer
    /// identity. Whether the issuer is trusted is decided later, at
    /// verification time.
    pub fn add_claim(
        &mut self,
        caller: Address,
        identity: Address,
        claim: Claim,
    ) -> CoreResult<ClaimId> {
        let subject = self.existing_identity(&identity)?;
        authorize(&subject.keys, &caller, Role::Owner)?;

        let issuer = self
            .state
            .identities
            .get(&claim.issuer)
            .ok_or(CoreError::SignatureInvalid {
                issuer: claim.issuer,
            })?;
        let signer = recover_claim_signer(identity, claim.topic, &claim.data, &claim.signature);
        if !signer.is_some_and(|key| issuer.is_claim_signer(&key)) {
            warn!(%identity, issuer = %claim.issuer, topic = %claim.topic, "Rejected claim with invalid signature");
            return Err(CoreError::SignatureInvalid {
                issuer: claim.issuer,
            });
        }

        let claim_id = claim.id();
        let topic = claim.topic;
        let issuer = claim.issuer;
        self.commit(vec![Change::PutClaim(identity, claim)])?;
        info!(%identity, %issuer, %topic, %claim_id, "Claim added");
        Ok(claim_id)
    }

    pub fn remove_claim(
        &mut self,
        caller: Address,
        identity: Address,
        claim_id: ClaimId,
    ) -> CoreResult<()> {
        let subject = self.existing_identity(&identity)?;
        authorize(&subject.keys, &caller, Role::Owner)?;
        if subject.claim(&claim_id).is_none() {
            return Err(CoreError::ClaimNotFound(claim_id));
        }
        self.commit(vec![Change::RemoveClaim(identity, claim_id)])?;
        info!(%identity, %claim_id, "Claim removed");
        Ok(())
    }

    pub fn claim(&self, identity: &Address, claim_id: &ClaimId) -> Option<&Claim> {
        self.state.identities.get(identity)?.claim(claim_id)
    }

    pub fn claim_ids_by_topic(&self, identity: &Address, topic: ClaimTopic) -> Vec<ClaimId> {
        self.state
            .identities
            .get(identity)
            .map(|subject| subject.claim_ids_by_topic(topic))
            .unwrap_or_default()
    }

    // =========================================================================
    // Identity registry
    // =========================================================================

    pub fn register_identity(
        &mut self,
        caller: Address,
        wallet: Address,
        identity: Address,
        jurisdiction: Jurisdiction,
    ) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Agent)?;
        let change = self.state.registry.plan_register(
            &self.state.identities,
            wallet,
            identity,
            jurisdiction,
        )?;
        self.commit(vec![change])?;
        info!(%wallet, %identity, jurisdiction, "Identity registered");
        Ok(())
    }

    /// Register each entry independently; one failure does not affect the
    /// others.
    pub fn batch_register_identity(
        &mut self,
        caller: Address,
        entries: &[Registration],
    ) -> Vec<CoreResult<()>> {
        let results: Vec<CoreResult<()>> = entries
            .iter()
            .map(|entry| {
                self.register_identity(caller, entry.wallet, entry.identity, entry.jurisdiction)
            })
            .collect();
        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(total = entries.len(), failed, "Batch registration processed");
        results
    }

    pub fn delete_identity(&mut self, caller: Address, wallet: Address) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Agent)?;
        let change = self.state.registry.plan_delete(wallet)?;
        self.commit(vec![change])?;
        info!(%wallet, "Identity registration deleted");
        Ok(())
    }

    pub fn update_identity(
        &mut self,
        caller: Address,
        wallet: Address,
        identity: Address,
    ) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Agent)?;
        let change =
            self.state
                .registry
                .plan_update_identity(&self.state.identities, wallet, identity)?;
        self.commit(vec![change])?;
        info!(%wallet, %identity, "Registered identity updated");
        Ok(())
    }

    pub fn update_country(
        &mut self,
        caller: Address,
        wallet: Address,
        jurisdiction: Jurisdiction,
    ) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Agent)?;
        let change = self.state.registry.plan_update_country(wallet, jurisdiction)?;
        self.commit(vec![change])?;
        info!(%wallet, jurisdiction, "Investor country updated");
        Ok(())
    }

    pub fn contains(&self, wallet: &Address) -> bool {
        self.state.registry.contains(wallet)
    }

    pub fn record(&self, wallet: &Address) -> Option<&IdentityRecord> {
        self.state.registry.record(wallet)
    }

    /// Identity bound to `wallet`, or the null address.
    pub fn identity(&self, wallet: &Address) -> Address {
        self.state.registry.identity(wallet)
    }

    pub fn is_verified(&self, wallet: &Address) -> bool {
        self.state.view().is_verified(wallet)
    }

    pub fn investor_country(&self, wallet: &Address) -> Jurisdiction {
        self.state.registry.investor_country(wallet)
    }

    /// Per-topic verification detail for the identity bound to `wallet`.
    pub fn verification_report(&self, wallet: &Address) -> Option<Vec<TopicStatus>> {
        let bound = self.state.registry.identity(wallet);
        let identity = self.state.identities.get(&bound)?;
        Some(verification::verification_report(
            identity,
            &self.state.topics,
            &self.state.issuers,
            &self.state.identities,
        ))
    }

    // =========================================================================
    // Token ledger
    // =========================================================================

    pub fn metadata(&self) -> &TokenMetadata {
        self.state.ledger.metadata()
    }

    pub fn balance_of(&self, address: &Address) -> Amount {
        self.state.ledger.balance_of(address)
    }

    pub fn total_supply(&self) -> Amount {
        self.state.ledger.total_supply()
    }

    pub fn paused(&self) -> bool {
        self.state.ledger.paused()
    }

    /// Run the compliance gate against current state without committing.
    pub fn evaluate(&self, operation: &Operation) -> Verdict {
        let view = self.state.view();
        let ctx = PolicyContext {
            identities: &view,
            ledger: &self.state.ledger,
        };
        self.gate.evaluate(operation, &ctx)
    }

    fn require_approval(&self, operation: &Operation) -> CoreResult<()> {
        match self.evaluate(operation) {
            Verdict::Approved => Ok(()),
            Verdict::Rejected(reason) => {
                warn!(?operation, %reason, "Compliance rejected operation");
                Err(CoreError::Compliance(reason))
            }
        }
    }

    pub fn mint(&mut self, caller: Address, to: Address, amount: Amount) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Agent)?;
        let changes = self.state.ledger.plan_mint(to, amount)?;
        self.require_approval(&Operation::Mint { to, amount })?;
        self.commit(changes)?;
        info!(%to, amount = %amount, total_supply = %self.total_supply(), "Minted");
        Ok(())
    }

    /// Not compliance gated: an agent may always recover tokens.
    pub fn burn(&mut self, caller: Address, from: Address, amount: Amount) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Agent)?;
        let changes = self.state.ledger.plan_burn(from, amount)?;
        self.commit(changes)?;
        info!(%from, amount = %amount, total_supply = %self.total_supply(), "Burned");
        Ok(())
    }

    /// Move `amount` from the caller to `to`.
    ///
    /// Checked in order: paused, balance, verification and policies.
    pub fn transfer(&mut self, caller: Address, to: Address, amount: Amount) -> CoreResult<()> {
        if self.state.ledger.paused() {
            warn!(from = %caller, %to, "Transfer rejected while paused");
            return Err(CoreError::Compliance("token is paused".into()));
        }
        let changes = self.state.ledger.plan_transfer(caller, to, amount)?;
        self.require_approval(&Operation::Transfer {
            from: caller,
            to,
            amount,
        })?;
        self.commit(changes)?;
        info!(from = %caller, %to, amount = %amount, "Transferred");
        Ok(())
    }

    pub fn pause(&mut self, caller: Address) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Agent)?;
        if self.state.ledger.paused() {
            return Err(CoreError::InvalidArgument("token is already paused".into()));
        }
        self.commit(vec![Change::SetPaused(true)])?;
        info!(by = %caller, "Token paused");
        Ok(())
    }

    pub fn unpause(&mut self, caller: Address) -> CoreResult<()> {
        authorize(&self.state.roles, &caller, Role::Agent)?;
        if !self.state.ledger.paused() {
            return Err(CoreError::InvalidArgument("token is not paused".into()));
        }
        self.commit(vec![Change::SetPaused(false)])?;
        info!(by = %caller, "Token unpaused");
        Ok(())
    }

    /// Suite roles held by `principal`.
    pub fn roles_of(&self, principal: &Address) -> BTreeSet<Role> {
        self.state.roles.roles_of(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::{CountryRestriction, MaxBalance};
    use crate::identity::{ClaimSigner, LocalClaimSigner};
    use crate::storage::{RedbBackend, StoreError, StoreResult};
    use crate::types::topic_from_name;
    use alloy::primitives::{address, Bytes};

    const OWNER: Address = address!("0x0101010101010101010101010101010101010101");
    const AGENT: Address = address!("0x0202020202020202020202020202020202020202");
    const ISSUER_MANAGER: Address = address!("0x0303030303030303030303030303030303030303");
    const STRANGER: Address = address!("0x0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f");

    struct Fixture {
        suite: ComplianceSuite,
        signer: LocalClaimSigner,
        issuer: Address,
        topic: ClaimTopic,
    }

    fn fixture_with(gate: ComplianceGate) -> Fixture {
        setup(ComplianceSuite::in_memory(gate))
    }

    fn fixture() -> Fixture {
        fixture_with(ComplianceGate::new())
    }

    /// Owner, agent, one trusted KYC issuer, unpaused token.
    fn setup(mut suite: ComplianceSuite) -> Fixture {
        let topic = topic_from_name("CLAIM_TOPIC");
        let signer = LocalClaimSigner::random();

        assert!(suite.bootstrap_owner(OWNER).unwrap());
        suite.add_agent(OWNER, AGENT).unwrap();
        suite.add_claim_topic(OWNER, topic).unwrap();

        let issuer = suite.create_identity(ISSUER_MANAGER, ISSUER_MANAGER).unwrap();
        suite
            .add_key(ISSUER_MANAGER, issuer, signer.address(), Role::ClaimSigner)
            .unwrap();
        suite.add_trusted_issuer(OWNER, issuer, &[topic]).unwrap();
        suite.unpause(AGENT).unwrap();

        Fixture {
            suite,
            signer,
            issuer,
            topic,
        }
    }

    impl Fixture {
        fn signed_claim(&self, identity: Address) -> Claim {
            let data = Bytes::from_static(b"kyc passed");
            let signature = self.signer.sign_claim(identity, self.topic, &data).unwrap();
            Claim {
                topic: self.topic,
                scheme: 1,
                issuer: self.issuer,
                signature,
                data,
                uri: String::new(),
            }
        }

        /// Identity managed by `wallet`, not yet registered.
        fn new_identity(&mut self, wallet: Address) -> Address {
            self.suite.create_identity(wallet, wallet).unwrap()
        }

        /// Registered wallet with a valid KYC claim.
        fn onboard(&mut self, wallet: Address, country: Jurisdiction) -> Address {
            let identity = self.new_identity(wallet);
            let claim = self.signed_claim(identity);
            self.suite.add_claim(wallet, identity, claim).unwrap();
            self.suite
                .register_identity(AGENT, wallet, identity, country)
                .unwrap();
            assert!(self.suite.is_verified(&wallet));
            identity
        }
    }

    fn wallet(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn register_then_delete_binding() {
        let mut f = fixture();
        let id = f.new_identity(wallet(0x10));

        f.suite.register_identity(AGENT, wallet(0x10), id, 840).unwrap();
        assert_eq!(f.suite.identity(&wallet(0x10)), id);
        assert_eq!(f.suite.investor_country(&wallet(0x10)), 840);
        assert!(f.suite.contains(&wallet(0x10)));

        f.suite.delete_identity(AGENT, wallet(0x10)).unwrap();
        assert_eq!(f.suite.identity(&wallet(0x10)), Address::ZERO);
        assert!(f.suite.identity_object(&id).is_some());
        assert!(matches!(
            f.suite.delete_identity(AGENT, wallet(0x10)),
            Err(CoreError::NotRegistered(_))
        ));
    }

    #[test]
    fn duplicate_registration_keeps_existing_binding() {
        let mut f = fixture();
        let first = f.new_identity(wallet(0x10));
        let second = f.new_identity(wallet(0x11));
        f.suite.register_identity(AGENT, wallet(0x10), first, 840).unwrap();

        assert!(matches!(
            f.suite.register_identity(AGENT, wallet(0x10), second, 250),
            Err(CoreError::AlreadyRegistered(_))
        ));
        assert_eq!(f.suite.identity(&wallet(0x10)), first);
        assert_eq!(f.suite.investor_country(&wallet(0x10)), 840);
    }

    #[test]
    fn privileged_calls_require_roles() {
        let mut f = fixture();
        let id = f.new_identity(wallet(0x10));

        assert!(matches!(
            f.suite.register_identity(STRANGER, wallet(0x10), id, 840),
            Err(CoreError::Authorization { role: Role::Agent, .. })
        ));
        assert!(!f.suite.contains(&wallet(0x10)));

        // Owner is not implicitly an agent once the role is revoked.
        f.suite.remove_agent(OWNER, OWNER).unwrap();
        assert!(f.suite.mint(OWNER, wallet(0x10), 1).is_err());
        assert!(matches!(
            f.suite.add_claim_topic(AGENT, topic_from_name("OTHER")),
            Err(CoreError::Authorization { role: Role::Owner, .. })
        ));
        assert!(matches!(
            f.suite.pause(STRANGER),
            Err(CoreError::Authorization { .. })
        ));
    }

    #[test]
    fn re_registration_with_fresh_identity_resets_verification() {
        let mut f = fixture();
        f.onboard(wallet(0x10), 840);

        f.suite.delete_identity(AGENT, wallet(0x10)).unwrap();
        let fresh = f.new_identity(wallet(0x10));
        f.suite.register_identity(AGENT, wallet(0x10), fresh, 840).unwrap();
        assert!(!f.suite.is_verified(&wallet(0x10)));
    }

    #[test]
    fn transfer_moves_balance_and_rejects_overdraft() {
        let mut f = fixture();
        f.onboard(wallet(0x10), 840);
        f.onboard(wallet(0x11), 840);
        f.suite.mint(AGENT, wallet(0x10), 100).unwrap();

        f.suite.transfer(wallet(0x10), wallet(0x11), 40).unwrap();
        assert_eq!(f.suite.balance_of(&wallet(0x10)), 60);
        assert_eq!(f.suite.balance_of(&wallet(0x11)), 40);
        assert_eq!(f.suite.total_supply(), 100);

        assert!(matches!(
            f.suite.transfer(wallet(0x10), wallet(0x11), 1000),
            Err(CoreError::InsufficientBalance { .. })
        ));
        assert_eq!(f.suite.balance_of(&wallet(0x10)), 60);
        assert_eq!(f.suite.balance_of(&wallet(0x11)), 40);
    }

    #[test]
    fn mint_to_unverified_wallet_is_rejected() {
        let mut f = fixture();
        let id = f.new_identity(wallet(0x10));
        f.suite.register_identity(AGENT, wallet(0x10), id, 840).unwrap();

        assert!(matches!(
            f.suite.mint(AGENT, wallet(0x10), 100),
            Err(CoreError::Compliance(_))
        ));
        assert_eq!(f.suite.balance_of(&wallet(0x10)), 0);
        assert_eq!(f.suite.total_supply(), 0);

        let claim = f.signed_claim(id);
        f.suite.add_claim(wallet(0x10), id, claim).unwrap();
        f.suite.mint(AGENT, wallet(0x10), 100).unwrap();
        assert_eq!(f.suite.balance_of(&wallet(0x10)), 100);
        assert_eq!(f.suite.total_supply(), 100);

        assert!(matches!(
            f.suite.mint(AGENT, wallet(0x10), 0),
            Err(CoreError::InvalidAmount(_))
        ));
    }

    #[test]
    fn removing_trusted_issuer_revokes_verification_live() {
        let mut f = fixture();
        f.onboard(wallet(0x10), 840);

        f.suite.remove_trusted_issuer(OWNER, f.issuer).unwrap();
        assert!(!f.suite.is_verified(&wallet(0x10)));

        f.suite.add_trusted_issuer(OWNER, f.issuer, &[f.topic]).unwrap();
        assert!(f.suite.is_verified(&wallet(0x10)));
    }

    #[test]
    fn removing_claim_revokes_verification() {
        let mut f = fixture();
        let id = f.onboard(wallet(0x10), 840);
        let claim_id = crate::types::claim_id(f.issuer, f.topic);
        assert_eq!(f.suite.claim_ids_by_topic(&id, f.topic), vec![claim_id]);

        assert!(matches!(
            f.suite.remove_claim(STRANGER, id, claim_id),
            Err(CoreError::Authorization { .. })
        ));
        f.suite.remove_claim(wallet(0x10), id, claim_id).unwrap();
        assert!(!f.suite.is_verified(&wallet(0x10)));
        assert!(matches!(
            f.suite.remove_claim(wallet(0x10), id, claim_id),
            Err(CoreError::ClaimNotFound(_))
        ));
    }

    #[test]
    fn forged_claim_is_rejected_at_insertion() {
        let mut f = fixture();
        let id = f.new_identity(wallet(0x10));
        let mut claim = f.signed_claim(id);
        claim.data = Bytes::from_static(b"tampered");

        assert!(matches!(
            f.suite.add_claim(wallet(0x10), id, claim),
            Err(CoreError::SignatureInvalid { .. })
        ));
        assert!(f.suite.identity_object(&id).unwrap().claims.is_empty());

        // Signed for a different identity.
        let other = f.new_identity(wallet(0x11));
        let claim = f.signed_claim(other);
        assert!(matches!(
            f.suite.add_claim(wallet(0x10), id, claim),
            Err(CoreError::SignatureInvalid { .. })
        ));
    }

    #[test]
    fn re_adding_claim_replaces_previous_record() {
        let mut f = fixture();
        let id = f.onboard(wallet(0x10), 840);
        let mut claim = f.signed_claim(id);
        claim.uri = "https://issuer.example/kyc/2".into();
        let claim_id = f.suite.add_claim(wallet(0x10), id, claim).unwrap();

        let identity = f.suite.identity_object(&id).unwrap();
        assert_eq!(identity.claims.len(), 1);
        assert_eq!(
            f.suite.claim(&id, &claim_id).unwrap().uri,
            "https://issuer.example/kyc/2"
        );
    }

    #[test]
    fn paused_token_blocks_mint_and_transfer() {
        let mut f = fixture();
        f.onboard(wallet(0x10), 840);
        f.onboard(wallet(0x11), 840);
        f.suite.mint(AGENT, wallet(0x10), 10).unwrap();
        f.suite.pause(AGENT).unwrap();

        assert!(matches!(
            f.suite.mint(AGENT, wallet(0x10), 1),
            Err(CoreError::Compliance(_))
        ));
        assert!(matches!(
            f.suite.transfer(wallet(0x10), wallet(0x11), 1),
            Err(CoreError::Compliance(_))
        ));
        // Paused is checked before balance.
        assert!(matches!(
            f.suite.transfer(wallet(0x10), wallet(0x11), 1000),
            Err(CoreError::Compliance(_))
        ));
        assert!(matches!(
            f.suite.pause(AGENT),
            Err(CoreError::InvalidArgument(_))
        ));

        f.suite.unpause(AGENT).unwrap();
        f.suite.transfer(wallet(0x10), wallet(0x11), 1).unwrap();
    }

    #[test]
    fn new_suite_starts_paused() {
        let suite = ComplianceSuite::in_memory(ComplianceGate::new());
        assert!(suite.paused());
        assert_eq!(suite.metadata().symbol, "TSTOCK");
    }

    #[test]
    fn batch_registration_is_per_entry() {
        let mut f = fixture();
        let a = f.new_identity(wallet(0x10));
        let b = f.new_identity(wallet(0x11));
        f.suite.register_identity(AGENT, wallet(0x10), a, 840).unwrap();

        let results = f.suite.batch_register_identity(
            AGENT,
            &[
                Registration { wallet: wallet(0x10), identity: a, jurisdiction: 840 },
                Registration { wallet: wallet(0x11), identity: b, jurisdiction: 250 },
                Registration { wallet: wallet(0x12), identity: wallet(0xee), jurisdiction: 250 },
            ],
        );

        assert!(matches!(results[0], Err(CoreError::AlreadyRegistered(_))));
        assert!(results[1].is_ok());
        assert!(matches!(results[2], Err(CoreError::IdentityNotFound(_))));
        assert_eq!(f.suite.investor_country(&wallet(0x11)), 250);
        assert!(!f.suite.contains(&wallet(0x12)));
    }

    #[test]
    fn update_identity_and_country() {
        let mut f = fixture();
        f.onboard(wallet(0x10), 840);
        let fresh = f.new_identity(wallet(0x10));

        f.suite.update_country(AGENT, wallet(0x10), 250).unwrap();
        assert_eq!(f.suite.investor_country(&wallet(0x10)), 250);

        f.suite.update_identity(AGENT, wallet(0x10), fresh).unwrap();
        assert_eq!(f.suite.identity(&wallet(0x10)), fresh);
        assert!(!f.suite.is_verified(&wallet(0x10)));

        assert!(matches!(
            f.suite.update_country(AGENT, wallet(0x99), 250),
            Err(CoreError::NotRegistered(_))
        ));
    }

    #[test]
    fn identity_keys_keep_an_owner() {
        let mut f = fixture();
        let id = f.new_identity(wallet(0x10));

        assert!(matches!(
            f.suite.remove_key(wallet(0x10), id, wallet(0x10), Role::Owner),
            Err(CoreError::InvalidArgument(_))
        ));
        f.suite.add_key(wallet(0x10), id, wallet(0x20), Role::Owner).unwrap();
        f.suite.remove_key(wallet(0x20), id, wallet(0x10), Role::Owner).unwrap();
        assert!(matches!(
            f.suite.add_key(wallet(0x10), id, wallet(0x30), Role::Owner),
            Err(CoreError::Authorization { .. })
        ));
    }

    #[test]
    fn ownership_transfer_moves_owner_role_only() {
        let mut f = fixture();
        f.suite.transfer_ownership(OWNER, wallet(0x40)).unwrap();
        assert_eq!(f.suite.owners(), vec![wallet(0x40)]);
        assert!(f.suite.is_agent(&OWNER));
        assert!(!f.suite.bootstrap_owner(wallet(0x50)).unwrap());
        assert!(f.suite.add_agent(OWNER, wallet(0x41)).is_err());
    }

    #[test]
    fn burn_reduces_supply_without_compliance() {
        let mut f = fixture();
        f.onboard(wallet(0x10), 840);
        f.suite.mint(AGENT, wallet(0x10), 50).unwrap();
        f.suite.delete_identity(AGENT, wallet(0x10)).unwrap();

        f.suite.burn(AGENT, wallet(0x10), 20).unwrap();
        assert_eq!(f.suite.balance_of(&wallet(0x10)), 30);
        assert_eq!(f.suite.total_supply(), 30);
        assert!(matches!(
            f.suite.burn(AGENT, wallet(0x10), 31),
            Err(CoreError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn installed_policies_gate_mints_and_transfers() {
        let gate = ComplianceGate::new()
            .with_policy(CountryRestriction::new([408]))
            .with_policy(MaxBalance::new(100));
        let mut f = fixture_with(gate);
        f.onboard(wallet(0x10), 840);
        f.onboard(wallet(0x11), 408);

        f.suite.mint(AGENT, wallet(0x10), 100).unwrap();
        assert!(matches!(
            f.suite.mint(AGENT, wallet(0x10), 1),
            Err(CoreError::Compliance(reason)) if reason.contains("max_balance")
        ));
        assert!(matches!(
            f.suite.transfer(wallet(0x10), wallet(0x11), 1),
            Err(CoreError::Compliance(reason)) if reason.contains("country_restriction")
        ));
        assert_eq!(f.suite.balance_of(&wallet(0x10)), 100);
    }

    struct FailingBackend;

    impl StateBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn load(&self) -> StoreResult<Vec<Change>> {
            Ok(Vec::new())
        }

        fn commit(&self, _: &[Change]) -> StoreResult<()> {
            Err(StoreError::Unavailable("disk full".into()))
        }
    }

    #[test]
    fn failed_commit_leaves_state_untouched() {
        let mut suite = ComplianceSuite::open(
            Box::new(FailingBackend),
            TokenMetadata::default(),
            ComplianceGate::new(),
        )
        .unwrap();

        assert!(matches!(
            suite.bootstrap_owner(OWNER),
            Err(CoreError::Storage(_))
        ));
        assert!(suite.owners().is_empty());
        assert!(matches!(
            suite.create_identity(wallet(0x10), wallet(0x10)),
            Err(CoreError::Storage(_))
        ));
        assert_eq!(suite.state().identities.nonce(), 0);
        assert!(suite.state().identities.is_empty());
    }

    #[test]
    fn state_is_rebuilt_from_redb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite.redb");
        let (issuer, topic, id) = {
            let backend = RedbBackend::open(&path).unwrap();
            let suite = ComplianceSuite::open(
                Box::new(backend),
                TokenMetadata::default(),
                ComplianceGate::new(),
            )
            .unwrap();
            let mut f = setup(suite);
            let id = f.onboard(wallet(0x10), 840);
            f.onboard(wallet(0x11), 840);
            f.suite.mint(AGENT, wallet(0x10), 70).unwrap();
            f.suite.transfer(wallet(0x10), wallet(0x11), 20).unwrap();
            (f.issuer, f.topic, id)
        };

        let backend = RedbBackend::open(&path).unwrap();
        let mut suite = ComplianceSuite::open(
            Box::new(backend),
            TokenMetadata::default(),
            ComplianceGate::new(),
        )
        .unwrap();

        assert!(!suite.paused());
        assert_eq!(suite.balance_of(&wallet(0x10)), 50);
        assert_eq!(suite.balance_of(&wallet(0x11)), 20);
        assert_eq!(suite.total_supply(), 70);
        assert_eq!(suite.identity(&wallet(0x10)), id);
        assert!(suite.is_verified(&wallet(0x10)));
        assert_eq!(suite.claim_topics(), vec![topic]);

        // Verification is recomputed, not restored.
        suite.remove_trusted_issuer(OWNER, issuer).unwrap();
        assert!(!suite.is_verified(&wallet(0x10)));

        // The identity nonce survives, so new identities do not collide.
        suite.create_identity(wallet(0x12), wallet(0x12)).unwrap();
    }
}
