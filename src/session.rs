//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! Asynchronous session bootstrap: the initial key agreement that
//! seeds a ratchet from identity keys and a one-time prekey.

use crate::curve::{KeyPair, PublicKey};
use crate::master_keys::MasterKeys;
use crate::packet::{Packet, PacketType, PrekeyBundle};
use crate::prekey_store::{PrekeyList, PrekeyStore};
use crate::ratchet::{
    initialize_initiator_ratchet, initialize_responder_ratchet, InitiatorParameters, Ratchet,
    ResponderParameters,
};
use crate::timestamp::Timestamp;
use crate::{error::Result, AxolotlError};

use rand::{CryptoRng, Rng};

/// Both parties label the key schedule by role, not by who initiated:
/// the lexicographically smaller identity public key is role A. Equal
/// keys would collapse the schedule into one chain, so sessions with
/// oneself are rejected.
pub(crate) fn role_is_alice(
    our_identity: &PublicKey,
    their_identity: &PublicKey,
) -> Result<bool> {
    match our_identity.cmp(their_identity) {
        std::cmp::Ordering::Less => Ok(true),
        std::cmp::Ordering::Greater => Ok(false),
        std::cmp::Ordering::Equal => Err(AxolotlError::InvalidInput(
            "cannot establish a session with the same identity key",
        )),
    }
}

/// A freshly bootstrapped outbound session plus the bundle fields the
/// first packet must carry.
pub(crate) struct OutboundSession {
    pub(crate) ratchet: Ratchet,
    pub(crate) bundle: PrekeyBundle,
}

/// Initiator side: generate an ephemeral, pick one of the peer's
/// advertised prekeys at random and run the initial key agreement.
pub(crate) fn initiate_session<R: Rng + CryptoRng>(
    our_keys: &MasterKeys,
    their_identity: &PublicKey,
    their_prekeys: &PrekeyList,
    csprng: &mut R,
) -> Result<OutboundSession> {
    let ephemeral_key_pair = KeyPair::generate(csprng);
    let prekey = *their_prekeys.choose(csprng);

    let parameters = InitiatorParameters::new(
        our_keys.identity_key_pair().clone(),
        ephemeral_key_pair.clone(),
        *their_identity,
        prekey,
    );
    let ratchet = initialize_initiator_ratchet(&parameters)?;

    Ok(OutboundSession {
        ratchet,
        bundle: PrekeyBundle {
            sender_identity_key: *our_keys.public_identity_key(),
            sender_ephemeral_key: ephemeral_key_pair.public_key,
            prekey,
        },
    })
}

/// Responder side: resolve the prekey the bundle names (deprecating
/// it) and run the mirror key agreement.
pub(crate) fn respond_session<R: Rng + CryptoRng>(
    our_keys: &MasterKeys,
    prekeys: &mut PrekeyStore,
    packet: &Packet,
    now: Timestamp,
    csprng: &mut R,
) -> Result<Ratchet> {
    if packet.packet_type() != PacketType::Prekey {
        return Err(AxolotlError::InvalidInput("not a prekey packet"));
    }
    let bundle = packet
        .bundle()
        .ok_or(AxolotlError::InvalidInput("not a prekey packet"))?;

    let prekey_pair = prekeys.use_for_session(&bundle.prekey, now, csprng)?;

    let parameters = ResponderParameters::new(
        our_keys.identity_key_pair().clone(),
        prekey_pair,
        bundle.sender_identity_key,
        bundle.sender_ephemeral_key,
    );
    initialize_responder_ratchet(&parameters)
}
