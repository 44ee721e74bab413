//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! Cache of (header key, message key) pairs the ratchet stepped past.
//!
//! Entries are kept oldest-first. Each entry can decrypt at most one
//! packet; a successful trial consumes it.

use crate::consts::{limits::MAX_SKIPPED_KEYS, SKIPPED_KEY_LIFETIME};
use crate::header::RatchetHeader;
use crate::packet::Packet;
use crate::ratchet::{HeaderKey, MessageKey};
use crate::timestamp::Timestamp;

use std::collections::VecDeque;

#[derive(Clone, Debug)]
pub(crate) struct SkippedKey {
    header_key: HeaderKey,
    message_key: MessageKey,
    expires_at: Timestamp,
}

impl SkippedKey {
    pub(crate) fn new(header_key: HeaderKey, message_key: MessageKey, expires_at: Timestamp) -> Self {
        Self {
            header_key,
            message_key,
            expires_at,
        }
    }

    pub(crate) fn header_key(&self) -> &HeaderKey {
        &self.header_key
    }

    pub(crate) fn message_key(&self) -> &MessageKey {
        &self.message_key
    }

    pub(crate) fn expires_at(&self) -> Timestamp {
        self.expires_at
    }
}

#[derive(Clone, Default, Debug)]
pub struct SkippedKeyStore {
    keys: VecDeque<SkippedKey>,
}

impl SkippedKeyStore {
    pub(crate) fn new() -> Self {
        Self {
            keys: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Remember a stepped-past key pair. Over the ceiling, the oldest
    /// entry is evicted; the receive path bounds its own additions, so
    /// this only fires as a backstop.
    pub(crate) fn put(&mut self, header_key: HeaderKey, message_key: MessageKey, now: Timestamp) {
        self.keys.push_back(SkippedKey::new(
            header_key,
            message_key,
            now.add_duration(SKIPPED_KEY_LIFETIME),
        ));
        while self.keys.len() > MAX_SKIPPED_KEYS {
            log::warn!("skipped-key store over ceiling, evicting oldest entry");
            self.keys.pop_front();
        }
    }

    /// Trial-decrypt `packet` against every stored entry, oldest first.
    /// On the first entry whose header key and message key both verify,
    /// the entry is removed and the plaintext and parsed header are
    /// returned. Individual trial failures are non-destructive.
    pub(crate) fn try_decrypt(&mut self, packet: &Packet) -> Option<(Vec<u8>, RatchetHeader)> {
        for index in 0..self.keys.len() {
            let entry = &self.keys[index];
            let Ok(header_bytes) = packet.decrypt_header(entry.header_key()) else {
                continue;
            };
            let Ok(header) = RatchetHeader::deserialize(&header_bytes) else {
                continue;
            };
            let Ok(message) = packet.decrypt_message(entry.message_key()) else {
                continue;
            };
            self.keys.remove(index);
            return Some((message, header));
        }
        None
    }

    /// Drop entries whose expiration has passed.
    pub(crate) fn prune_expired(&mut self, now: Timestamp) {
        let before = self.keys.len();
        self.keys.retain(|entry| entry.expires_at() > now);
        let dropped = before - self.keys.len();
        if dropped > 0 {
            log::info!("pruned {} expired skipped key(s)", dropped);
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &SkippedKey> {
        self.keys.iter()
    }

    pub(crate) fn restore(&mut self, entry: SkippedKey) {
        self.keys.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketType;
    use rand::rngs::OsRng;

    fn make_packet(header_key: &HeaderKey, message_key: &MessageKey) -> Packet {
        use crate::curve::KeyPair;
        let header = RatchetHeader::new(KeyPair::generate(&mut OsRng).public_key, 4, 0);
        Packet::encrypt(
            PacketType::Normal,
            &header.serialize(),
            header_key,
            b"skipped message",
            message_key,
            None,
            &mut OsRng,
        )
        .expect("encrypt succeeds")
    }

    #[test]
    fn entries_decrypt_exactly_once() {
        let now = Timestamp::from_epoch_seconds(1_000);
        let header_key = HeaderKey::new([1u8; 32]);
        let message_key = MessageKey::new([2u8; 32]);
        let packet = make_packet(&header_key, &message_key);

        let mut store = SkippedKeyStore::new();
        store.put(HeaderKey::new([9u8; 32]), MessageKey::new([9u8; 32]), now);
        store.put(header_key, message_key, now);
        assert_eq!(store.len(), 2);

        let (message, header) = store.try_decrypt(&packet).expect("entry matches");
        assert_eq!(message, b"skipped message");
        assert_eq!(header.message_number(), 4);
        assert_eq!(store.len(), 1);

        // The matching entry was consumed; the unrelated one survives
        // but cannot decrypt this packet.
        assert!(store.try_decrypt(&packet).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn partial_success_consumes_nothing() {
        let now = Timestamp::from_epoch_seconds(1_000);
        let header_key = HeaderKey::new([1u8; 32]);
        let message_key = MessageKey::new([2u8; 32]);
        let packet = make_packet(&header_key, &message_key);

        let mut store = SkippedKeyStore::new();
        // Right header key, wrong message key: the header trial passes
        // but the entry must stay put.
        store.put(HeaderKey::new([1u8; 32]), MessageKey::new([7u8; 32]), now);
        assert!(store.try_decrypt(&packet).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn pruning_and_eviction() {
        let now = Timestamp::from_epoch_seconds(1_000);
        let mut store = SkippedKeyStore::new();
        store.put(HeaderKey::new([1u8; 32]), MessageKey::new([1u8; 32]), now);
        store.prune_expired(now.add_duration(SKIPPED_KEY_LIFETIME));
        assert!(store.is_empty());

        for i in 0..MAX_SKIPPED_KEYS + 5 {
            let byte = (i % 251) as u8;
            store.put(HeaderKey::new([byte; 32]), MessageKey::new([byte; 32]), now);
        }
        assert_eq!(store.len(), MAX_SKIPPED_KEYS);
    }
}
