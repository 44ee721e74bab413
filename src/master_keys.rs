//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! Long-term identity: an Ed25519 signing keypair and an X25519 DH
//! keypair.

use crate::consts::{SIGNATURE_SIZE, SIGNING_PUBLIC_KEY_SIZE};
use crate::curve::{KeyPair, PublicKey};
use crate::{error::Result, AxolotlError};

use std::fmt;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::{CryptoRng, Rng};

/// The public half of an identity signing key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SigningPublicKey {
    key: VerifyingKey,
}

impl SigningPublicKey {
    pub fn deserialize(value: &[u8]) -> Result<Self> {
        let bytes = <[u8; SIGNING_PUBLIC_KEY_SIZE]>::try_from(value)
            .map_err(|_| AxolotlError::InvalidInput("bad signing public key length"))?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|_| AxolotlError::InvalidInput("bad signing public key"))?;
        Ok(Self { key })
    }

    pub fn as_bytes(&self) -> &[u8; SIGNING_PUBLIC_KEY_SIZE] {
        self.key.as_bytes()
    }

    /// Check a detached signature over `data`.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<()> {
        let signature = <[u8; SIGNATURE_SIZE]>::try_from(signature)
            .map_err(|_| AxolotlError::VerifyError)?;
        self.key
            .verify_strict(data, &ed25519_dalek::Signature::from_bytes(&signature))
            .map_err(|_| AxolotlError::VerifyError)
    }

    /// Split `signed` into data and trailing signature and verify it,
    /// returning the data on success.
    pub fn verify_signed<'a>(&self, signed: &'a [u8]) -> Result<&'a [u8]> {
        if signed.len() < SIGNATURE_SIZE {
            return Err(AxolotlError::VerifyError);
        }
        let (data, signature) = signed.split_at(signed.len() - SIGNATURE_SIZE);
        self.verify(data, signature)?;
        Ok(data)
    }
}

impl fmt::Debug for SigningPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SigningPublicKey {{ {} }}", hex::encode(self.as_bytes()))
    }
}

/// A user's long-term key material. Created once, destroyed with the
/// user.
#[derive(Clone)]
pub struct MasterKeys {
    signing_key: SigningKey,
    identity_key_pair: KeyPair,
}

impl MasterKeys {
    pub fn generate<R: Rng + CryptoRng>(csprng: &mut R) -> Self {
        Self {
            signing_key: SigningKey::generate(csprng),
            identity_key_pair: KeyPair::generate(csprng),
        }
    }

    pub(crate) fn from_parts(signing_key: SigningKey, identity_key_pair: KeyPair) -> Self {
        Self {
            signing_key,
            identity_key_pair,
        }
    }

    #[inline]
    pub fn signing_public_key(&self) -> SigningPublicKey {
        SigningPublicKey {
            key: self.signing_key.verifying_key(),
        }
    }

    #[inline]
    pub fn public_identity_key(&self) -> &PublicKey {
        &self.identity_key_pair.public_key
    }

    #[inline]
    pub(crate) fn identity_key_pair(&self) -> &KeyPair {
        &self.identity_key_pair
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// `sign(data) = data || signature`.
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        let signature = self.signing_key.sign(data);
        let mut signed = Vec::with_capacity(data.len() + SIGNATURE_SIZE);
        signed.extend_from_slice(data);
        signed.extend_from_slice(&signature.to_bytes());
        signed
    }
}

impl fmt::Debug for MasterKeys {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MasterKeys")
            .field("signing_public_key", &self.signing_public_key())
            .field("public_identity_key", self.public_identity_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn signed_data_round_trips() {
        let keys = MasterKeys::generate(&mut OsRng);
        let signed = keys.sign(b"prekey list bytes");

        let verifier = keys.signing_public_key();
        assert_eq!(
            verifier.verify_signed(&signed).expect("valid signature"),
            b"prekey list bytes"
        );

        let mut tampered = signed.clone();
        tampered[0] ^= 0x01;
        assert_eq!(
            verifier.verify_signed(&tampered).unwrap_err(),
            AxolotlError::VerifyError
        );

        let other = MasterKeys::generate(&mut OsRng);
        assert_eq!(
            other.signing_public_key().verify_signed(&signed).unwrap_err(),
            AxolotlError::VerifyError
        );
    }

    #[test]
    fn signing_public_key_round_trips() {
        let keys = MasterKeys::generate(&mut OsRng);
        let verifier = keys.signing_public_key();
        let restored =
            SigningPublicKey::deserialize(verifier.as_bytes()).expect("valid encoding");
        assert_eq!(restored, verifier);
        assert!(SigningPublicKey::deserialize(&[0u8; 31]).is_err());
    }
}
