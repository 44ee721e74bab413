//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

use crate::curve::{KeyPair, PublicKey};

/// Key material the initiating party feeds into session bootstrap: its
/// own identity and fresh ephemeral, plus the peer's identity and the
/// prekey chosen from the peer's advertised list.
pub struct InitiatorParameters {
    our_identity_key_pair: KeyPair,
    our_ephemeral_key_pair: KeyPair,
    their_identity_key: PublicKey,
    their_prekey: PublicKey,
}

impl InitiatorParameters {
    pub fn new(
        our_identity_key_pair: KeyPair,
        our_ephemeral_key_pair: KeyPair,
        their_identity_key: PublicKey,
        their_prekey: PublicKey,
    ) -> Self {
        Self {
            our_identity_key_pair,
            our_ephemeral_key_pair,
            their_identity_key,
            their_prekey,
        }
    }

    #[inline]
    pub fn our_identity_key_pair(&self) -> &KeyPair {
        &self.our_identity_key_pair
    }

    #[inline]
    pub fn our_ephemeral_key_pair(&self) -> &KeyPair {
        &self.our_ephemeral_key_pair
    }

    #[inline]
    pub fn their_identity_key(&self) -> &PublicKey {
        &self.their_identity_key
    }

    #[inline]
    pub fn their_prekey(&self) -> &PublicKey {
        &self.their_prekey
    }
}

/// The responder's mirror image: the prekey named by the incoming
/// bundle stands in for the responder's ephemeral.
pub struct ResponderParameters {
    our_identity_key_pair: KeyPair,
    our_prekey_pair: KeyPair,
    their_identity_key: PublicKey,
    their_ephemeral_key: PublicKey,
}

impl ResponderParameters {
    pub fn new(
        our_identity_key_pair: KeyPair,
        our_prekey_pair: KeyPair,
        their_identity_key: PublicKey,
        their_ephemeral_key: PublicKey,
    ) -> Self {
        Self {
            our_identity_key_pair,
            our_prekey_pair,
            their_identity_key,
            their_ephemeral_key,
        }
    }

    #[inline]
    pub fn our_identity_key_pair(&self) -> &KeyPair {
        &self.our_identity_key_pair
    }

    #[inline]
    pub fn our_prekey_pair(&self) -> &KeyPair {
        &self.our_prekey_pair
    }

    #[inline]
    pub fn their_identity_key(&self) -> &PublicKey {
        &self.their_identity_key
    }

    #[inline]
    pub fn their_ephemeral_key(&self) -> &PublicKey {
        &self.their_ephemeral_key
    }
}
