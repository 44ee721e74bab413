//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! Key derivation. Every derivation in the protocol is keyed Blake2b
//! with a short, fixed message: a 32-bit subkey counter for splitting
//! one master key into several, or a one-byte tag for stepping a chain.

use crate::crypto;
use crate::curve::{PrivateKey, PublicKey};
use crate::error::Result;
use crate::ratchet::{ChainKey, HeaderKey, RootKey};

use zeroize::Zeroizing;

/// Derive subkey number `subkey_counter` from `input_key`.
///
/// The input key must be between 16 and 64 bytes.
pub(crate) fn derive_key(input_key: &[u8], subkey_counter: u32) -> Result<[u8; 32]> {
    crypto::blake2b_keyed(input_key, &subkey_counter.to_le_bytes())
}

/// The full key schedule both parties derive from the three initial
/// DH agreements.
///
/// `RK, CKs/r, HKs/r, NHKs/r = KDF(HASH(DH(A,B0) || DH(A0,B) || DH(A0,B0)))`
///
/// Subkeys are labelled by role (A or B), not by direction, so both
/// parties arrive at the same pairing: role A's sending chain is role
/// B's receiving chain and vice versa.
pub(crate) struct InitialKeys {
    pub(crate) root_key: RootKey,
    pub(crate) sending_chain_key: ChainKey,
    pub(crate) receiving_chain_key: ChainKey,
    pub(crate) sending_header_key: HeaderKey,
    pub(crate) receiving_header_key: HeaderKey,
    pub(crate) next_sending_header_key: HeaderKey,
    pub(crate) next_receiving_header_key: HeaderKey,
}

pub(crate) fn derive_initial_keys(
    our_identity: &PrivateKey,
    their_identity: &PublicKey,
    our_ephemeral: &PrivateKey,
    their_ephemeral: &PublicKey,
    is_alice: bool,
) -> Result<InitialKeys> {
    // DH1 = DH(identity A, ephemeral B), DH2 = DH(ephemeral A, identity B),
    // DH3 = DH(ephemeral A, ephemeral B), with A the role-A party.
    let (dh1, dh2) = if is_alice {
        (
            Zeroizing::new(our_identity.calculate_agreement(their_ephemeral)),
            Zeroizing::new(our_ephemeral.calculate_agreement(their_identity)),
        )
    } else {
        (
            Zeroizing::new(our_ephemeral.calculate_agreement(their_identity)),
            Zeroizing::new(our_identity.calculate_agreement(their_ephemeral)),
        )
    };
    let dh3 = Zeroizing::new(our_ephemeral.calculate_agreement(their_ephemeral));

    let master = Zeroizing::new(crypto::blake2b_hash_64(&[&dh1[..], &dh2[..], &dh3[..]]));

    let root_key = RootKey::new(derive_key(&*master, 0)?);
    let chain_key_a = ChainKey::new(derive_key(&*master, 1)?);
    let chain_key_b = ChainKey::new(derive_key(&*master, 2)?);
    let header_key_a = HeaderKey::new(derive_key(&*master, 3)?);
    let header_key_b = HeaderKey::new(derive_key(&*master, 4)?);
    let next_header_key_a = HeaderKey::new(derive_key(&*master, 5)?);
    let next_header_key_b = HeaderKey::new(derive_key(&*master, 6)?);

    let keys = if is_alice {
        InitialKeys {
            root_key,
            sending_chain_key: chain_key_a,
            receiving_chain_key: chain_key_b,
            sending_header_key: header_key_a,
            receiving_header_key: header_key_b,
            next_sending_header_key: next_header_key_a,
            next_receiving_header_key: next_header_key_b,
        }
    } else {
        InitialKeys {
            root_key,
            sending_chain_key: chain_key_b,
            receiving_chain_key: chain_key_a,
            sending_header_key: header_key_b,
            receiving_header_key: header_key_a,
            next_sending_header_key: next_header_key_b,
            next_receiving_header_key: next_header_key_a,
        }
    };
    Ok(keys)
}
