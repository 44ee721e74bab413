//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

use axolotl::*;
use rand::{CryptoRng, Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

// Use this function to debug tests
#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::max())
        .is_test(true)
        .try_init();
}

pub fn seeded_rng(seed: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(seed)
}

pub fn now() -> Timestamp {
    Timestamp::from_epoch_seconds(1_700_000_000)
}

pub fn make_user<R: Rng + CryptoRng>(csprng: &mut R) -> User {
    User::create(csprng, None, now()).expect("user creation succeeds")
}

/// Verify `advertiser`'s signed list the way a directory client would.
pub fn verified_prekey_list(advertiser: &User) -> PrekeyList {
    let signed = advertiser.signed_prekey_list(now());
    PrekeyList::verify(&signed, &advertiser.signing_public_key(), now())
        .expect("freshly signed list verifies")
}

/// Bootstrap a session pair: the initiator's first packet is consumed
/// by the responder. Returns both conversations.
#[allow(dead_code)]
pub fn establish_pair<R: Rng + CryptoRng>(
    initiator: &User,
    responder: &mut User,
    csprng: &mut R,
) -> (Conversation, Conversation) {
    let list = verified_prekey_list(responder);
    let (initiator_conversation, first_packet) = Conversation::initiate(
        initiator.master_keys(),
        responder.master_keys().public_identity_key(),
        &list,
        b"session bootstrap",
        csprng,
    )
    .expect("initiate succeeds");

    let responder_master_keys = responder.master_keys().clone();
    let (responder_conversation, received) = Conversation::respond(
        &responder_master_keys,
        responder.prekeys_mut(),
        &first_packet,
        now(),
        csprng,
    )
    .expect("respond succeeds");
    assert_eq!(received.plaintext, b"session bootstrap");

    (initiator_conversation, responder_conversation)
}
