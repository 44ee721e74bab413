//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! X25519 key material.

use crate::consts::{PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
use crate::{error::Result, AxolotlError};

use std::fmt;

use rand::{CryptoRng, Rng};
use subtle::ConstantTimeEq;
use x25519_dalek::StaticSecret;

/// An X25519 public key.
///
/// `Ord` is the plain lexicographic order of the encoded point; it is
/// used to break the role symmetry at session bootstrap and is not
/// constant time. Use [`PublicKey::ct_eq`] when comparing against
/// secret-derived material.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey {
    key: [u8; PUBLIC_KEY_SIZE],
}

impl PublicKey {
    pub fn deserialize(value: &[u8]) -> Result<Self> {
        let key = <[u8; PUBLIC_KEY_SIZE]>::try_from(value)
            .map_err(|_| AxolotlError::InvalidInput("bad public key length"))?;
        Ok(Self { key })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.key
    }

    pub fn ct_eq(&self, other: &PublicKey) -> subtle::Choice {
        self.key.ct_eq(&other.key)
    }
}

impl From<[u8; PUBLIC_KEY_SIZE]> for PublicKey {
    fn from(key: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self { key }
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = AxolotlError;

    fn try_from(value: &[u8]) -> Result<Self> {
        Self::deserialize(value)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PublicKey {{ {} }}", hex::encode(self.key))
    }
}

/// An X25519 private key. Zeroed on release by the underlying scalar
/// type.
#[derive(Clone)]
pub struct PrivateKey {
    key: StaticSecret,
}

impl PrivateKey {
    pub fn deserialize(value: &[u8]) -> Result<Self> {
        let bytes = <[u8; PRIVATE_KEY_SIZE]>::try_from(value)
            .map_err(|_| AxolotlError::InvalidInput("bad private key length"))?;
        Ok(Self {
            key: StaticSecret::from(bytes),
        })
    }

    pub fn serialize(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.key.to_bytes()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(*x25519_dalek::PublicKey::from(&self.key).as_bytes())
    }

    /// Raw X25519 shared secret with `their_key`.
    pub fn calculate_agreement(&self, their_key: &PublicKey) -> [u8; 32] {
        let their_key = x25519_dalek::PublicKey::from(*their_key.as_bytes());
        self.key.diffie_hellman(&their_key).to_bytes()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PrivateKey {{ <scalar> }}")
    }
}

#[derive(Clone, Debug)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

impl KeyPair {
    pub fn generate<R: Rng + CryptoRng>(csprng: &mut R) -> Self {
        let private_key = StaticSecret::random_from_rng(csprng);
        let public_key = PublicKey::from(*x25519_dalek::PublicKey::from(&private_key).as_bytes());
        Self {
            public_key,
            private_key: PrivateKey { key: private_key },
        }
    }

    pub fn from_public_and_private(public_key: &[u8], private_key: &[u8]) -> Result<Self> {
        Ok(Self {
            public_key: PublicKey::deserialize(public_key)?,
            private_key: PrivateKey::deserialize(private_key)?,
        })
    }

    pub fn calculate_agreement(&self, their_key: &PublicKey) -> [u8; 32] {
        self.private_key.calculate_agreement(their_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn agreements_match() {
        let mut csprng = OsRng;
        let alice = KeyPair::generate(&mut csprng);
        let bob = KeyPair::generate(&mut csprng);

        let shared_alice = alice.calculate_agreement(&bob.public_key);
        let shared_bob = bob.calculate_agreement(&alice.public_key);
        assert_eq!(shared_alice, shared_bob);
    }

    #[test]
    fn round_trips_through_bytes() {
        let mut csprng = OsRng;
        let pair = KeyPair::generate(&mut csprng);

        let restored = KeyPair::from_public_and_private(
            pair.public_key.as_bytes(),
            &pair.private_key.serialize(),
        )
        .expect("valid lengths");
        assert_eq!(restored.public_key, pair.public_key);
        assert_eq!(restored.private_key.public_key(), pair.public_key);

        assert!(PublicKey::deserialize(&[0u8; 31]).is_err());
        assert!(PrivateKey::deserialize(&[0u8; 33]).is_err());
    }
}
