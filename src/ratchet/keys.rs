//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

use crate::crypto;
use crate::curve::{PrivateKey, PublicKey};
use crate::error::Result;
use crate::kdf;

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// A key for exactly one message. Consumed by encrypting or decrypting
/// a single packet body.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MessageKey {
    key: [u8; 32],
}

impl MessageKey {
    pub(crate) fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MessageKey {{ <secret> }}")
    }
}

/// The AEAD key protecting the plaintext ratchet header of a packet.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct HeaderKey {
    key: [u8; 32],
}

impl HeaderKey {
    pub(crate) fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    pub fn ct_eq(&self, other: &HeaderKey) -> subtle::Choice {
        self.key.ct_eq(&other.key)
    }
}

impl fmt::Debug for HeaderKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HeaderKey {{ <secret> }}")
    }
}

/// A chain key. Yields one message key per position and advances by a
/// one-way step, so previous chain keys are unrecoverable.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ChainKey {
    key: [u8; 32],
}

impl ChainKey {
    const MESSAGE_KEY_SEED: [u8; 1] = [0x00u8];
    const CHAIN_KEY_SEED: [u8; 1] = [0x01u8];

    pub(crate) fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// `CK' = HMAC(CK, 0x01)`
    pub(crate) fn next_chain_key(&self) -> Result<Self> {
        Ok(Self {
            key: crypto::blake2b_keyed(&self.key, &Self::CHAIN_KEY_SEED)?,
        })
    }

    /// `MK = HMAC(CK, 0x00)`
    pub(crate) fn message_key(&self) -> Result<MessageKey> {
        Ok(MessageKey::new(crypto::blake2b_keyed(
            &self.key,
            &Self::MESSAGE_KEY_SEED,
        )?))
    }
}

impl fmt::Debug for ChainKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ChainKey {{ <secret> }}")
    }
}

/// The root key of the DH ratchet.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RootKey {
    key: [u8; 32],
}

impl RootKey {
    pub(crate) fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// One DH-ratchet step:
    /// `RK', NHK, CK = KDF(HMAC(RK, DH(ours, theirs)))`.
    pub(crate) fn advance(
        &self,
        our_ratchet_key: &PrivateKey,
        their_ratchet_key: &PublicKey,
    ) -> Result<(RootKey, HeaderKey, ChainKey)> {
        let shared_secret = Zeroizing::new(our_ratchet_key.calculate_agreement(their_ratchet_key));
        let master = Zeroizing::new(crypto::blake2b_keyed_64(&self.key, &*shared_secret)?);
        Ok((
            RootKey::new(kdf::derive_key(&*master, 0)?),
            HeaderKey::new(kdf::derive_key(&*master, 1)?),
            ChainKey::new(kdf::derive_key(&*master, 2)?),
        ))
    }
}

impl fmt::Debug for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RootKey {{ <secret> }}")
    }
}
