//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! A conversation: a local handle (random id) around one ratchet,
//! driving the packet codec on send and receive.

use crate::consts::CONVERSATION_ID_SIZE;
use crate::curve::PublicKey;
use crate::header::RatchetHeader;
use crate::master_keys::MasterKeys;
use crate::packet::{Packet, PacketType, PrekeyBundle};
use crate::prekey_store::{PrekeyList, PrekeyStore};
use crate::ratchet::{HeaderDecryptability, Ratchet};
use crate::session;
use crate::state;
use crate::timestamp::Timestamp;
use crate::{error::Result, AxolotlError};

use rand::{CryptoRng, Rng};

/// A decrypted packet with the counters its header carried.
#[derive(Debug)]
pub struct ReceivedMessage {
    pub plaintext: Vec<u8>,
    pub message_number: u32,
    pub previous_message_number: u32,
}

#[derive(Debug)]
pub struct Conversation {
    id: [u8; CONVERSATION_ID_SIZE],
    ratchet: Ratchet,
}

impl Conversation {
    /// Start a conversation as the initiator. Returns the conversation
    /// and the first packet (a prekey packet carrying `first_message`).
    pub fn initiate<R: Rng + CryptoRng>(
        our_keys: &MasterKeys,
        their_identity: &PublicKey,
        their_prekeys: &PrekeyList,
        first_message: &[u8],
        csprng: &mut R,
    ) -> Result<(Conversation, Vec<u8>)> {
        let outbound = session::initiate_session(our_keys, their_identity, their_prekeys, csprng)?;
        let mut conversation = Conversation {
            id: random_id(csprng),
            ratchet: outbound.ratchet,
        };
        let packet = conversation.send_with_type(
            first_message,
            PacketType::Prekey,
            Some(&outbound.bundle),
            csprng,
        )?;
        log::info!(
            "initiated conversation {}",
            hex::encode(&conversation.id[..8])
        );
        Ok((conversation, packet))
    }

    /// Start a conversation as the responder, from a received prekey
    /// packet. The named prekey is moved to the deprecated pool.
    pub fn respond<R: Rng + CryptoRng>(
        our_keys: &MasterKeys,
        prekeys: &mut PrekeyStore,
        packet_bytes: &[u8],
        now: Timestamp,
        csprng: &mut R,
    ) -> Result<(Conversation, ReceivedMessage)> {
        let packet = Packet::try_from(packet_bytes)?;
        let ratchet = session::respond_session(our_keys, prekeys, &packet, now, csprng)?;
        let mut conversation = Conversation {
            id: random_id(csprng),
            ratchet,
        };
        let received = conversation.receive(packet_bytes, now)?;
        log::info!(
            "responded to conversation {}",
            hex::encode(&conversation.id[..8])
        );
        Ok((conversation, received))
    }

    /// Local identifier. Never sent on the wire.
    #[inline]
    pub fn id(&self) -> &[u8; CONVERSATION_ID_SIZE] {
        &self.id
    }

    #[inline]
    pub fn ratchet(&self) -> &Ratchet {
        &self.ratchet
    }

    /// Whether the most recent send or receive completed
    /// authentically. Forced false by every failure path.
    #[inline]
    pub fn last_message_authentic(&self) -> bool {
        self.ratchet.last_message_authentic()
    }

    /// Encrypt `message` as the next normal packet.
    pub fn send<R: Rng + CryptoRng>(&mut self, message: &[u8], csprng: &mut R) -> Result<Vec<u8>> {
        self.send_with_type(message, PacketType::Normal, None, csprng)
    }

    fn send_with_type<R: Rng + CryptoRng>(
        &mut self,
        message: &[u8],
        packet_type: PacketType,
        bundle: Option<&PrekeyBundle>,
        csprng: &mut R,
    ) -> Result<Vec<u8>> {
        let result = self.encrypt_packet(message, packet_type, bundle, csprng);
        if result.is_err() {
            self.ratchet.set_last_message_authenticity(false);
        }
        result
    }

    fn encrypt_packet<R: Rng + CryptoRng>(
        &mut self,
        message: &[u8],
        packet_type: PacketType,
        bundle: Option<&PrekeyBundle>,
        csprng: &mut R,
    ) -> Result<Vec<u8>> {
        let send_keys = self.ratchet.next_send_keys(csprng)?;
        let header = RatchetHeader::new(
            send_keys.ratchet_key,
            send_keys.message_number,
            send_keys.previous_message_number,
        );
        let packet = Packet::encrypt(
            packet_type,
            &header.serialize(),
            &send_keys.header_key,
            message,
            &send_keys.message_key,
            bundle,
            csprng,
        )?;
        Ok(packet.serialized().to_vec())
    }

    /// Decrypt one received packet.
    ///
    /// Either the whole receive commits (counters, skipped-key inserts,
    /// an eventual DH step) or the ratchet is left exactly as it was;
    /// the update is staged on a copy and swapped in only after the
    /// message authenticates.
    pub fn receive(&mut self, packet_bytes: &[u8], now: Timestamp) -> Result<ReceivedMessage> {
        match self.receive_staged(packet_bytes, now) {
            Ok(received) => {
                self.ratchet.set_last_message_authenticity(true);
                Ok(received)
            }
            Err(error) => {
                self.ratchet.set_last_message_authenticity(false);
                Err(error)
            }
        }
    }

    fn receive_staged(&mut self, packet_bytes: &[u8], now: Timestamp) -> Result<ReceivedMessage> {
        let packet = Packet::try_from(packet_bytes)?;

        self.ratchet.skipped_keys_mut().prune_expired(now);
        if let Some((plaintext, header)) = self.ratchet.skipped_keys_mut().try_decrypt(&packet) {
            return Ok(ReceivedMessage {
                plaintext,
                message_number: header.message_number(),
                previous_message_number: header.previous_message_number(),
            });
        }

        let (current_key, next_key) = self.ratchet.receive_header_keys();
        let (classification, header_bytes) = match packet.decrypt_header(&current_key) {
            Ok(bytes) => (HeaderDecryptability::Current, Some(bytes)),
            Err(_) => match packet.decrypt_header(&next_key) {
                Ok(bytes) => (HeaderDecryptability::Next, Some(bytes)),
                Err(_) => (HeaderDecryptability::Undecryptable, None),
            },
        };
        self.ratchet.set_header_decryptability(classification);

        let Some(header_bytes) = header_bytes else {
            log::warn!("header not decryptable with current or next header key");
            return Err(AxolotlError::DecryptError("header undecryptable"));
        };
        let header = RatchetHeader::deserialize(&header_bytes)?;

        let mut staged = self.ratchet.clone();
        let message_key = staged.receive(
            header.sender_ephemeral(),
            header.message_number(),
            header.previous_message_number(),
            now,
        )?;
        let plaintext = packet.decrypt_message(&message_key)?;

        self.ratchet = staged;
        Ok(ReceivedMessage {
            plaintext,
            message_number: header.message_number(),
            previous_message_number: header.previous_message_number(),
        })
    }

    /// Structure-preserving export for suspension.
    pub fn export(&self) -> Vec<u8> {
        state::serialize_conversation(self)
    }

    /// Rebuild a conversation from [`Conversation::export`] output.
    pub fn import(bytes: &[u8]) -> Result<Conversation> {
        state::deserialize_conversation(bytes)
    }

    pub(crate) fn from_parts(id: [u8; CONVERSATION_ID_SIZE], ratchet: Ratchet) -> Self {
        Self { id, ratchet }
    }
}

fn random_id<R: Rng + CryptoRng>(csprng: &mut R) -> [u8; CONVERSATION_ID_SIZE] {
    let mut id = [0u8; CONVERSATION_ID_SIZE];
    csprng.fill_bytes(&mut id);
    id
}
