//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! A user's complete local key material: master keys plus the prekey
//! pool.

use crate::crypto;
use crate::error::Result;
use crate::master_keys::{MasterKeys, SigningPublicKey};
use crate::prekey_store::PrekeyStore;
use crate::state;
use crate::timestamp::Timestamp;

use rand::{CryptoRng, Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use zeroize::Zeroizing;

#[derive(Debug)]
pub struct User {
    master_keys: MasterKeys,
    prekeys: PrekeyStore,
}

impl User {
    /// Create a user with fresh master keys and a full prekey pool.
    ///
    /// Caller-provided entropy in `seed` is mixed with fresh CSPRNG
    /// output before use, so a weak seed cannot weaken the generated
    /// keys.
    pub fn create<R: Rng + CryptoRng>(
        csprng: &mut R,
        seed: Option<&[u8]>,
        now: Timestamp,
    ) -> Result<User> {
        let user = match seed {
            Some(seed) => {
                let mut spiced = spiced_rng(csprng, seed);
                Self::generate(&mut spiced, now)
            }
            None => Self::generate(csprng, now),
        };
        log::info!(
            "created user with identity key {}",
            hex::encode(user.master_keys.public_identity_key().as_bytes())
        );
        Ok(user)
    }

    fn generate<R: Rng + CryptoRng>(csprng: &mut R, now: Timestamp) -> User {
        User {
            master_keys: MasterKeys::generate(csprng),
            prekeys: PrekeyStore::generate(csprng, now),
        }
    }

    #[inline]
    pub fn master_keys(&self) -> &MasterKeys {
        &self.master_keys
    }

    #[inline]
    pub fn prekeys(&self) -> &PrekeyStore {
        &self.prekeys
    }

    #[inline]
    pub fn prekeys_mut(&mut self) -> &mut PrekeyStore {
        &mut self.prekeys
    }

    #[inline]
    pub fn signing_public_key(&self) -> SigningPublicKey {
        self.master_keys.signing_public_key()
    }

    /// The signed prekey list to advertise, valid from `now`.
    pub fn signed_prekey_list(&self, now: Timestamp) -> Vec<u8> {
        self.prekeys.signed_list(&self.master_keys, now)
    }

    /// Structure-preserving export of master keys and prekey pool.
    pub fn export(&self) -> Vec<u8> {
        state::serialize_user(self)
    }

    /// Rebuild a user from [`User::export`] output.
    pub fn import(bytes: &[u8]) -> Result<User> {
        state::deserialize_user(bytes)
    }

    pub(crate) fn from_parts(master_keys: MasterKeys, prekeys: PrekeyStore) -> Self {
        Self {
            master_keys,
            prekeys,
        }
    }
}

/// Key generation stream for seeded creation: fresh CSPRNG output and
/// the caller's seed, mixed through Blake2b.
fn spiced_rng<R: Rng + CryptoRng>(csprng: &mut R, seed: &[u8]) -> ChaCha20Rng {
    let mut fresh = Zeroizing::new([0u8; 32]);
    csprng.fill_bytes(&mut *fresh);
    let digest = Zeroizing::new(crypto::blake2b_hash_64(&[&fresh[..], seed]));
    let mut spiced_seed = [0u8; 32];
    spiced_seed.copy_from_slice(&digest[..32]);
    ChaCha20Rng::from_seed(spiced_seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{limits::PREKEY_COUNT, PUBLIC_KEY_SIZE, SIGNATURE_SIZE};
    use crate::prekey_store::PrekeyList;
    use rand::rngs::OsRng;

    #[test]
    fn creation_produces_a_verifiable_prekey_list() {
        let now = Timestamp::from_epoch_seconds(1_000);
        let user = User::create(&mut OsRng, None, now).expect("creation succeeds");

        let signed = user.signed_prekey_list(now);
        assert_eq!(
            signed.len(),
            PREKEY_COUNT * PUBLIC_KEY_SIZE + 8 + SIGNATURE_SIZE
        );
        assert!(PrekeyList::verify(&signed, &user.signing_public_key(), now).is_ok());
    }

    #[test]
    fn seeded_creation_still_differs_per_user() {
        let now = Timestamp::from_epoch_seconds(1_000);
        let first = User::create(&mut OsRng, Some(b"low entropy seed"), now)
            .expect("creation succeeds");
        let second = User::create(&mut OsRng, Some(b"low entropy seed"), now)
            .expect("creation succeeds");
        // The seed is spiced with fresh randomness, so identical seeds
        // must not produce identical users.
        assert_ne!(
            first.master_keys().public_identity_key(),
            second.master_keys().public_identity_key()
        );
    }
}
