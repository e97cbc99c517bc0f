// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Claim digests, signer recovery and the injected claim-signing capability.
//!
//! A claim is signed over `keccak256(abi.encode(identity, topic, data))`
//! using EIP-191 personal-message prefixing, so any standard Ethereum
//! wallet can act as a claim issuer key.

use alloy::{
    primitives::{keccak256, Bytes, Signature, B256},
    signers::{local::PrivateKeySigner, SignerSync},
    sol_types::SolValue,
};
use k256::SecretKey;

use crate::types::{Address, ClaimTopic};

/// Errors raised by signing capabilities.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

/// Digest a claim is signed over.
pub fn claim_digest(identity: Address, topic: ClaimTopic, data: &[u8]) -> B256 {
    keccak256((identity, topic, Bytes::copy_from_slice(data)).abi_encode_params())
}

/// Recover the key that signed `(identity, topic, data)`.
///
/// Returns `None` for malformed signatures instead of failing; callers treat
/// that exactly like a signature from an unknown key.
pub fn recover_claim_signer(
    identity: Address,
    topic: ClaimTopic,
    data: &[u8],
    signature: &[u8],
) -> Option<Address> {
    let digest = claim_digest(identity, topic, data);
    recover_message_signer(digest.as_slice(), signature)
}

/// Recover the key behind an EIP-191 signature over `message`.
pub fn recover_message_signer(message: &[u8], signature: &[u8]) -> Option<Address> {
    let signature = Signature::from_raw(signature).ok()?;
    signature.recover_address_from_msg(message).ok()
}

/// Capability that produces claim signatures.
///
/// Key material never lives in the core; it is supplied at the boundary
/// through an implementation of this trait.
pub trait ClaimSigner: Send + Sync {
    /// Address of the signing key.
    fn address(&self) -> Address;

    /// Sign the claim digest for `(identity, topic, data)`.
    fn sign_claim(
        &self,
        identity: Address,
        topic: ClaimTopic,
        data: &[u8],
    ) -> Result<Bytes, SigningError>;
}

/// [`ClaimSigner`] backed by an in-process secp256k1 key.
#[derive(Debug, Clone)]
pub struct LocalClaimSigner {
    signer: PrivateKeySigner,
}

impl LocalClaimSigner {
    /// Generate a fresh random key.
    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    /// Load from a hex encoded private key (with or without `0x`).
    pub fn from_hex(private_key_hex: &str) -> Result<Self, SigningError> {
        let key_bytes = alloy::hex::decode(private_key_hex)
            .map_err(|e| SigningError::InvalidPrivateKey(e.to_string()))?;
        let signer = PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| SigningError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { signer })
    }

    /// Load from a SEC1 or PKCS#8 PEM encoded private key.
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self, SigningError> {
        let pem_str = std::str::from_utf8(pem_bytes)
            .map_err(|e| SigningError::InvalidPrivateKey(format!("Invalid UTF-8: {e}")))?;
        let pem = pem::parse(pem_str)
            .map_err(|e| SigningError::InvalidPrivateKey(format!("Invalid PEM: {e}")))?;

        let secret_key = SecretKey::from_sec1_der(pem.contents())
            .or_else(|_| {
                use k256::pkcs8::DecodePrivateKey;
                SecretKey::from_pkcs8_der(pem.contents())
            })
            .map_err(|e| SigningError::InvalidPrivateKey(format!("Invalid key format: {e}")))?;

        let signer = PrivateKeySigner::from_slice(&secret_key.to_bytes())
            .map_err(|e| SigningError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { signer })
    }

    /// Sign an arbitrary message with EIP-191 prefixing.
    pub fn sign_message(&self, message: &[u8]) -> Result<Bytes, SigningError> {
        let signature = self
            .signer
            .sign_message_sync(message)
            .map_err(|e| SigningError::SigningFailed(e.to_string()))?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }
}

impl ClaimSigner for LocalClaimSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    fn sign_claim(
        &self,
        identity: Address,
        topic: ClaimTopic,
        data: &[u8],
    ) -> Result<Bytes, SigningError> {
        let digest = claim_digest(identity, topic, data);
        self.sign_message(digest.as_slice())
    }
}
