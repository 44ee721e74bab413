//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! One-time prekeys: the local pool with its deprecation lifecycle and
//! the verified view of a peer's signed prekey list.

use crate::consts::{
    limits::PREKEY_COUNT, DEPRECATED_PREKEY_LIFETIME, PREKEY_LIST_LIFETIME,
    PREKEY_ROTATION_PERIOD, PUBLIC_KEY_SIZE, SIGNATURE_SIZE,
};
use crate::curve::{KeyPair, PublicKey};
use crate::master_keys::{MasterKeys, SigningPublicKey};
use crate::timestamp::Timestamp;
use crate::{error::Result, AxolotlError};

use rand::{CryptoRng, Rng};

/// One entry of the pool. Active entries carry their rotation deadline
/// in `expires_at`; deprecated entries carry the deprecation time and
/// their removal deadline.
#[derive(Clone, Debug)]
pub(crate) struct Prekey {
    key_pair: KeyPair,
    deprecated_at: Option<Timestamp>,
    expires_at: Option<Timestamp>,
}

impl Prekey {
    fn fresh<R: Rng + CryptoRng>(csprng: &mut R, now: Timestamp) -> Self {
        Self {
            key_pair: KeyPair::generate(csprng),
            deprecated_at: None,
            expires_at: Some(now.add_duration(PREKEY_ROTATION_PERIOD)),
        }
    }

    pub(crate) fn from_parts(
        key_pair: KeyPair,
        deprecated_at: Option<Timestamp>,
        expires_at: Option<Timestamp>,
    ) -> Self {
        Self {
            key_pair,
            deprecated_at,
            expires_at,
        }
    }

    pub(crate) fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub(crate) fn deprecated_at(&self) -> Option<Timestamp> {
        self.deprecated_at
    }

    pub(crate) fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    fn deprecate(mut self, now: Timestamp) -> Self {
        self.deprecated_at = Some(now);
        self.expires_at = Some(now.add_duration(DEPRECATED_PREKEY_LIFETIME));
        self
    }
}

/// The local prekey pool: a fixed-size active set plus the deprecated
/// entries kept around for retried initial messages.
#[derive(Debug)]
pub struct PrekeyStore {
    active: Vec<Prekey>,
    deprecated: Vec<Prekey>,
}

impl PrekeyStore {
    pub fn generate<R: Rng + CryptoRng>(csprng: &mut R, now: Timestamp) -> Self {
        Self {
            active: (0..PREKEY_COUNT).map(|_| Prekey::fresh(csprng, now)).collect(),
            deprecated: Vec::new(),
        }
    }

    pub(crate) fn from_parts(active: Vec<Prekey>, deprecated: Vec<Prekey>) -> Result<Self> {
        if active.len() != PREKEY_COUNT {
            return Err(AxolotlError::InvalidProtobufEncoding);
        }
        Ok(Self { active, deprecated })
    }

    pub(crate) fn active(&self) -> &[Prekey] {
        &self.active
    }

    pub(crate) fn deprecated(&self) -> &[Prekey] {
        &self.deprecated
    }

    /// The active pool's public halves, in pool order.
    pub fn list_public(&self) -> Vec<u8> {
        let mut list = Vec::with_capacity(PREKEY_COUNT * PUBLIC_KEY_SIZE);
        for prekey in &self.active {
            list.extend_from_slice(prekey.key_pair.public_key.as_bytes());
        }
        list
    }

    /// The signed wire form: `publics || expiration (8 BE) || signature`.
    pub fn signed_list(&self, master_keys: &MasterKeys, now: Timestamp) -> Vec<u8> {
        let mut list = self.list_public();
        let expires_at = now.add_duration(PREKEY_LIST_LIFETIME);
        list.extend_from_slice(&expires_at.epoch_seconds().to_be_bytes());
        master_keys.sign(&list)
    }

    /// Resolve the private half of `public` for a session bootstrap.
    ///
    /// An active match is moved to the deprecated pool and its slot is
    /// refilled, so later sessions cannot select it. A deprecated match
    /// is returned unchanged, which keeps retried initial messages
    /// decryptable.
    pub fn use_for_session<R: Rng + CryptoRng>(
        &mut self,
        public: &PublicKey,
        now: Timestamp,
        csprng: &mut R,
    ) -> Result<KeyPair> {
        // Scan the whole pool regardless of where the match sits.
        let mut active_match = None;
        for (index, prekey) in self.active.iter().enumerate() {
            if bool::from(prekey.key_pair.public_key.ct_eq(public)) {
                active_match = Some(index);
            }
        }
        let mut deprecated_match = None;
        for (index, prekey) in self.deprecated.iter().enumerate() {
            if bool::from(prekey.key_pair.public_key.ct_eq(public)) {
                deprecated_match = Some(index);
            }
        }

        if let Some(index) = active_match {
            let used = std::mem::replace(&mut self.active[index], Prekey::fresh(csprng, now));
            let key_pair = used.key_pair.clone();
            self.deprecated.push(used.deprecate(now));
            log::info!("prekey used for a new session, slot {} refilled", index);
            return Ok(key_pair);
        }
        if let Some(index) = deprecated_match {
            return Ok(self.deprecated[index].key_pair.clone());
        }
        Err(AxolotlError::NotFound("no matching prekey"))
    }

    /// Replace active entries past their rotation deadline and purge
    /// deprecated entries past their removal deadline.
    pub fn rotate<R: Rng + CryptoRng>(&mut self, now: Timestamp, csprng: &mut R) {
        let mut rotated = 0;
        for slot in self.active.iter_mut() {
            let stale = matches!(slot.expires_at, Some(deadline) if deadline <= now);
            if stale {
                let old = std::mem::replace(slot, Prekey::fresh(csprng, now));
                self.deprecated.push(old.deprecate(now));
                rotated += 1;
            }
        }
        let before = self.deprecated.len();
        self.deprecated
            .retain(|prekey| matches!(prekey.expires_at, Some(deadline) if deadline > now));
        if rotated > 0 || before != self.deprecated.len() {
            log::info!(
                "prekey rotation: {} replaced, {} deprecated purged",
                rotated,
                before - self.deprecated.len()
            );
        }
    }
}

/// A peer's advertised prekey list after signature verification.
#[derive(Debug)]
pub struct PrekeyList {
    keys: Vec<PublicKey>,
    expires_at: Timestamp,
}

impl PrekeyList {
    /// Parse and verify a signed prekey list.
    pub fn verify(signed: &[u8], signer: &SigningPublicKey, now: Timestamp) -> Result<Self> {
        if signed.len() != PREKEY_COUNT * PUBLIC_KEY_SIZE + 8 + SIGNATURE_SIZE {
            return Err(AxolotlError::InvalidInput("bad prekey list length"));
        }
        let data = signer.verify_signed(signed)?;

        let (key_bytes, expiration_bytes) = data.split_at(PREKEY_COUNT * PUBLIC_KEY_SIZE);
        let expires_at = Timestamp::from_epoch_seconds(u64::from_be_bytes(
            expiration_bytes.try_into().expect("length checked"),
        ));
        if expires_at <= now {
            return Err(AxolotlError::InvalidInput("prekey list expired"));
        }

        let keys = key_bytes
            .chunks_exact(PUBLIC_KEY_SIZE)
            .map(PublicKey::deserialize)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { keys, expires_at })
    }

    #[inline]
    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// Pick one prekey uniformly at random.
    pub(crate) fn choose<R: Rng + CryptoRng>(&self, csprng: &mut R) -> &PublicKey {
        &self.keys[csprng.gen_range(0..self.keys.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn first_public(store: &PrekeyStore) -> PublicKey {
        store.active[0].key_pair.public_key
    }

    #[test]
    fn listing_has_fixed_shape() {
        let now = Timestamp::from_epoch_seconds(1_000);
        let store = PrekeyStore::generate(&mut OsRng, now);
        assert_eq!(store.list_public().len(), PREKEY_COUNT * PUBLIC_KEY_SIZE);

        let master_keys = MasterKeys::generate(&mut OsRng);
        let signed = store.signed_list(&master_keys, now);
        assert_eq!(
            signed.len(),
            PREKEY_COUNT * PUBLIC_KEY_SIZE + 8 + SIGNATURE_SIZE
        );

        let list = PrekeyList::verify(&signed, &master_keys.signing_public_key(), now)
            .expect("valid list");
        assert_eq!(
            list.expires_at(),
            now.add_duration(PREKEY_LIST_LIFETIME)
        );
    }

    #[test]
    fn verification_failures() {
        let now = Timestamp::from_epoch_seconds(1_000);
        let store = PrekeyStore::generate(&mut OsRng, now);
        let master_keys = MasterKeys::generate(&mut OsRng);
        let signed = store.signed_list(&master_keys, now);

        let mut tampered = signed.clone();
        tampered[3] ^= 0x40;
        assert_eq!(
            PrekeyList::verify(&tampered, &master_keys.signing_public_key(), now).unwrap_err(),
            AxolotlError::VerifyError
        );

        let other = MasterKeys::generate(&mut OsRng);
        assert_eq!(
            PrekeyList::verify(&signed, &other.signing_public_key(), now).unwrap_err(),
            AxolotlError::VerifyError
        );

        let later = now.add_duration(PREKEY_LIST_LIFETIME);
        assert!(matches!(
            PrekeyList::verify(&signed, &master_keys.signing_public_key(), later),
            Err(AxolotlError::InvalidInput("prekey list expired"))
        ));
    }

    #[test]
    fn use_deprecates_and_refills() {
        let now = Timestamp::from_epoch_seconds(1_000);
        let mut csprng = OsRng;
        let mut store = PrekeyStore::generate(&mut csprng, now);
        let public = first_public(&store);

        let used = store
            .use_for_session(&public, now, &mut csprng)
            .expect("prekey is active");
        assert_eq!(used.public_key, public);
        assert_eq!(store.active.len(), PREKEY_COUNT);
        assert_eq!(store.deprecated.len(), 1);
        // The slot was refilled with a different key.
        assert_ne!(first_public(&store), public);

        // An exact repeat resolves from the deprecated pool, without
        // growing it.
        let again = store
            .use_for_session(&public, now, &mut csprng)
            .expect("repeat resolves");
        assert_eq!(again.public_key, public);
        assert_eq!(
            again.private_key.serialize(),
            used.private_key.serialize()
        );
        assert_eq!(store.deprecated.len(), 1);

        let unknown = KeyPair::generate(&mut csprng).public_key;
        assert_eq!(
            store.use_for_session(&unknown, now, &mut csprng).unwrap_err(),
            AxolotlError::NotFound("no matching prekey")
        );
    }

    #[test]
    fn rotation_replaces_stale_and_purges_deprecated() {
        let now = Timestamp::from_epoch_seconds(1_000);
        let mut csprng = OsRng;
        let mut store = PrekeyStore::generate(&mut csprng, now);
        let original = first_public(&store);
        store
            .use_for_session(&original, now, &mut csprng)
            .expect("prekey is active");

        // Nothing is due yet.
        store.rotate(now.add_duration(PREKEY_ROTATION_PERIOD / 2), &mut csprng);
        assert_eq!(store.deprecated.len(), 1);

        // Past both deadlines: every active key is replaced and the
        // deprecated entry is gone.
        let far = now
            .add_duration(PREKEY_ROTATION_PERIOD)
            .add_duration(DEPRECATED_PREKEY_LIFETIME);
        let before_rotation = store.list_public();
        store.rotate(far, &mut csprng);
        assert_eq!(store.active.len(), PREKEY_COUNT);
        assert_ne!(store.list_public(), before_rotation);
        assert!(store
            .deprecated
            .iter()
            .all(|p| p.deprecated_at() == Some(far)));
    }
}
