//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

mod support;

use std::time::Duration;

use axolotl::*;
use support::*;

#[test]
fn post_receive_state_cannot_decrypt_the_packet_again() {
    let mut csprng = seeded_rng(0x2001);
    let alice = make_user(&mut csprng);
    let mut bob = make_user(&mut csprng);
    let (mut alice_conversation, mut bob_conversation) =
        establish_pair(&alice, &mut bob, &mut csprng);

    let packet = alice_conversation
        .send(b"forward secret", &mut csprng)
        .expect("send");

    // A snapshot taken before the receive can decrypt the packet.
    let before = bob_conversation.export();
    let received = bob_conversation.receive(&packet, now()).expect("receive");
    assert_eq!(received.plaintext, b"forward secret");

    let mut restored_before = Conversation::import(&before).expect("import");
    let received = restored_before.receive(&packet, now()).expect("receive");
    assert_eq!(received.plaintext, b"forward secret");

    // A snapshot taken after holds no derivation path back to the
    // consumed message key: the chain has advanced past it and the
    // skipped store never saw it.
    let after = bob_conversation.export();
    let mut restored_after = Conversation::import(&after).expect("import");
    assert!(restored_after.receive(&packet, now()).is_err());
}

#[test]
fn far_future_counter_is_rejected_at_the_wire() {
    let mut csprng = seeded_rng(0x2002);
    let alice = make_user(&mut csprng);
    let mut bob = make_user(&mut csprng);
    let (mut alice_conversation, mut bob_conversation) =
        establish_pair(&alice, &mut bob, &mut csprng);

    // Burn through more sends than the receiver may cache, then
    // deliver only the last one.
    let bound = consts::limits::MAX_SKIPPED_KEYS;
    let mut last_packet = Vec::new();
    for _ in 0..bound + 2 {
        last_packet = alice_conversation.send(b"burst", &mut csprng).expect("send");
    }

    let error = bob_conversation.receive(&last_packet, now()).unwrap_err();
    assert!(matches!(error, AxolotlError::DecryptError(_)));
    assert!(bob_conversation.ratchet().skipped_keys().is_empty());
    assert_eq!(bob_conversation.ratchet().receive_message_number(), 1);
}

#[test]
fn skipped_keys_expire_after_their_lifetime() {
    let mut csprng = seeded_rng(0x2003);
    let alice = make_user(&mut csprng);
    let mut bob = make_user(&mut csprng);
    let (mut alice_conversation, mut bob_conversation) =
        establish_pair(&alice, &mut bob, &mut csprng);

    let delayed = alice_conversation.send(b"delayed", &mut csprng).expect("send");
    let prompt = alice_conversation.send(b"prompt", &mut csprng).expect("send");

    bob_conversation.receive(&prompt, now()).expect("receive");
    assert_eq!(bob_conversation.ratchet().skipped_keys().len(), 1);

    // Well past the skipped-key lifetime the cached key is pruned and
    // the stale packet can no longer be decrypted.
    let much_later = now()
        .add_duration(consts::SKIPPED_KEY_LIFETIME)
        .add_duration(Duration::from_secs(1));
    assert!(bob_conversation.receive(&delayed, much_later).is_err());
    assert!(bob_conversation.ratchet().skipped_keys().is_empty());
}

#[test]
fn sessions_in_both_name_orders_interoperate() {
    // The role bit comes from identity-key ordering, so exercise both
    // assignments by letting each side of a fresh pair initiate.
    for seed in [0x2004u64, 0x2005, 0x2006, 0x2007] {
        let mut csprng = seeded_rng(seed);
        let first = make_user(&mut csprng);
        let mut second = make_user(&mut csprng);
        let (mut initiator, mut responder) = establish_pair(&first, &mut second, &mut csprng);

        let reply = responder.send(b"reply", &mut csprng).expect("send");
        let received = initiator.receive(&reply, now()).expect("receive");
        assert_eq!(received.plaintext, b"reply");

        let counter = initiator.send(b"counter", &mut csprng).expect("send");
        let received = responder.receive(&counter, now()).expect("receive");
        assert_eq!(received.plaintext, b"counter");
    }
}
