//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! Conversions between runtime state and the wire structures used for
//! suspension and resumption, plus backup sealing.

use crate::consts::{BACKUP_NONCE_SIZE, CONVERSATION_ID_SIZE, SIGNING_PRIVATE_KEY_SIZE};
use crate::conversation::Conversation;
use crate::crypto;
use crate::curve::KeyPair;
use crate::master_keys::MasterKeys;
use crate::prekey_store::{Prekey, PrekeyStore};
use crate::proto::storage::{
    ConversationStructure, KeyPairStructure, MasterKeysStructure, PrekeyStoreStructure,
    PrekeyStructure, RatchetStructure, SkippedKeyStructure, UserStructure,
};
use crate::ratchet::{ChainKey, HeaderKey, MessageKey, Ratchet, RootKey};
use crate::skipped_keys::{SkippedKey, SkippedKeyStore};
use crate::timestamp::Timestamp;
use crate::user::User;
use crate::{error::Result, AxolotlError};

use prost::Message;
use rand::{CryptoRng, Rng};

fn key_32(bytes: &[u8]) -> Result<[u8; 32]> {
    <[u8; 32]>::try_from(bytes).map_err(|_| AxolotlError::InvalidProtobufEncoding)
}

fn key_pair_to_structure(key_pair: &KeyPair) -> KeyPairStructure {
    KeyPairStructure {
        public_key: key_pair.public_key.as_bytes().to_vec(),
        private_key: key_pair.private_key.serialize().to_vec(),
    }
}

fn key_pair_from_structure(structure: Option<KeyPairStructure>) -> Result<KeyPair> {
    let structure = structure.ok_or(AxolotlError::InvalidProtobufEncoding)?;
    KeyPair::from_public_and_private(&structure.public_key, &structure.private_key)
        .map_err(|_| AxolotlError::InvalidProtobufEncoding)
}

fn ratchet_to_structure(ratchet: &Ratchet) -> RatchetStructure {
    RatchetStructure {
        sender_ratchet_key_pair: Some(key_pair_to_structure(ratchet.sender_ratchet_key_pair())),
        their_ratchet_key: ratchet.their_ratchet_key().as_bytes().to_vec(),
        root_key: ratchet.root_key().as_bytes().to_vec(),
        sending_chain_key: ratchet.sending_chain_key().as_bytes().to_vec(),
        receiving_chain_key: ratchet.receiving_chain_key().as_bytes().to_vec(),
        sending_header_key: ratchet.sending_header_key().as_bytes().to_vec(),
        receiving_header_key: ratchet.receiving_header_key().as_bytes().to_vec(),
        next_sending_header_key: ratchet.next_sending_header_key().as_bytes().to_vec(),
        next_receiving_header_key: ratchet.next_receiving_header_key().as_bytes().to_vec(),
        send_message_number: ratchet.send_message_number(),
        receive_message_number: ratchet.receive_message_number(),
        previous_send_message_number: ratchet.previous_send_message_number(),
        pending_ratchet_step: ratchet.pending_ratchet_step(),
        role_alice: ratchet.role_alice(),
        last_message_authentic: ratchet.last_message_authentic(),
        skipped_keys: ratchet
            .skipped_keys()
            .iter()
            .map(|entry| SkippedKeyStructure {
                header_key: entry.header_key().as_bytes().to_vec(),
                message_key: entry.message_key().as_bytes().to_vec(),
                expires_at: entry.expires_at().epoch_seconds(),
            })
            .collect(),
    }
}

fn ratchet_from_structure(structure: RatchetStructure) -> Result<Ratchet> {
    let mut skipped_keys = SkippedKeyStore::new();
    for entry in structure.skipped_keys {
        skipped_keys.restore(SkippedKey::new(
            HeaderKey::new(key_32(&entry.header_key)?),
            MessageKey::new(key_32(&entry.message_key)?),
            Timestamp::from_epoch_seconds(entry.expires_at),
        ));
    }

    Ok(Ratchet::from_parts(
        structure.role_alice,
        key_pair_from_structure(structure.sender_ratchet_key_pair)?,
        key_32(&structure.their_ratchet_key)?.into(),
        RootKey::new(key_32(&structure.root_key)?),
        ChainKey::new(key_32(&structure.sending_chain_key)?),
        ChainKey::new(key_32(&structure.receiving_chain_key)?),
        HeaderKey::new(key_32(&structure.sending_header_key)?),
        HeaderKey::new(key_32(&structure.receiving_header_key)?),
        HeaderKey::new(key_32(&structure.next_sending_header_key)?),
        HeaderKey::new(key_32(&structure.next_receiving_header_key)?),
        structure.send_message_number,
        structure.receive_message_number,
        structure.previous_send_message_number,
        structure.pending_ratchet_step,
        structure.last_message_authentic,
        skipped_keys,
    ))
}

pub(crate) fn serialize_conversation(conversation: &Conversation) -> Vec<u8> {
    ConversationStructure {
        id: conversation.id().to_vec(),
        ratchet: Some(ratchet_to_structure(conversation.ratchet())),
    }
    .encode_to_vec()
}

pub(crate) fn deserialize_conversation(bytes: &[u8]) -> Result<Conversation> {
    let structure = ConversationStructure::decode(bytes)
        .map_err(|_| AxolotlError::InvalidProtobufEncoding)?;
    let id = <[u8; CONVERSATION_ID_SIZE]>::try_from(structure.id.as_slice())
        .map_err(|_| AxolotlError::InvalidProtobufEncoding)?;
    let ratchet = ratchet_from_structure(
        structure.ratchet.ok_or(AxolotlError::InvalidProtobufEncoding)?,
    )?;
    Ok(Conversation::from_parts(id, ratchet))
}

fn prekey_to_structure(prekey: &Prekey) -> PrekeyStructure {
    PrekeyStructure {
        key_pair: Some(key_pair_to_structure(prekey.key_pair())),
        deprecated_at: prekey.deprecated_at().map(|t| t.epoch_seconds()),
        expires_at: prekey.expires_at().map(|t| t.epoch_seconds()),
    }
}

fn prekey_from_structure(structure: PrekeyStructure) -> Result<Prekey> {
    Ok(Prekey::from_parts(
        key_pair_from_structure(structure.key_pair)?,
        structure.deprecated_at.map(Timestamp::from_epoch_seconds),
        structure.expires_at.map(Timestamp::from_epoch_seconds),
    ))
}

pub(crate) fn serialize_user(user: &User) -> Vec<u8> {
    let master_keys = user.master_keys();
    UserStructure {
        master_keys: Some(MasterKeysStructure {
            signing_key_pair: master_keys.signing_key().to_keypair_bytes().to_vec(),
            identity_key_pair: Some(key_pair_to_structure(master_keys.identity_key_pair())),
        }),
        prekeys: Some(PrekeyStoreStructure {
            active: user.prekeys().active().iter().map(prekey_to_structure).collect(),
            deprecated: user
                .prekeys()
                .deprecated()
                .iter()
                .map(prekey_to_structure)
                .collect(),
        }),
    }
    .encode_to_vec()
}

pub(crate) fn deserialize_user(bytes: &[u8]) -> Result<User> {
    let structure =
        UserStructure::decode(bytes).map_err(|_| AxolotlError::InvalidProtobufEncoding)?;

    let master_structure = structure
        .master_keys
        .ok_or(AxolotlError::InvalidProtobufEncoding)?;
    let signing_bytes =
        <[u8; SIGNING_PRIVATE_KEY_SIZE]>::try_from(master_structure.signing_key_pair.as_slice())
            .map_err(|_| AxolotlError::InvalidProtobufEncoding)?;
    let signing_key = ed25519_dalek::SigningKey::from_keypair_bytes(&signing_bytes)
        .map_err(|_| AxolotlError::InvalidProtobufEncoding)?;
    let master_keys = MasterKeys::from_parts(
        signing_key,
        key_pair_from_structure(master_structure.identity_key_pair)?,
    );

    let prekey_structure = structure
        .prekeys
        .ok_or(AxolotlError::InvalidProtobufEncoding)?;
    let active = prekey_structure
        .active
        .into_iter()
        .map(prekey_from_structure)
        .collect::<Result<Vec<_>>>()?;
    let deprecated = prekey_structure
        .deprecated
        .into_iter()
        .map(prekey_from_structure)
        .collect::<Result<Vec<_>>>()?;

    Ok(User::from_parts(
        master_keys,
        PrekeyStore::from_parts(active, deprecated)?,
    ))
}

/// Seal an exported blob under a caller-held backup key. Output is the
/// random nonce followed by the secretbox.
pub fn seal_backup<R: Rng + CryptoRng>(
    plaintext: &[u8],
    backup_key: &[u8; 32],
    csprng: &mut R,
) -> Result<Vec<u8>> {
    let mut nonce = [0u8; BACKUP_NONCE_SIZE];
    csprng.fill_bytes(&mut nonce);
    let mut sealed = Vec::with_capacity(BACKUP_NONCE_SIZE + plaintext.len() + 16);
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&crypto::secretbox_seal(plaintext, backup_key, &nonce)?);
    Ok(sealed)
}

/// Reverse [`seal_backup`].
pub fn open_backup(sealed: &[u8], backup_key: &[u8; 32]) -> Result<Vec<u8>> {
    if sealed.len() < BACKUP_NONCE_SIZE + 16 {
        return Err(AxolotlError::InvalidInput("sealed backup too short"));
    }
    let (nonce, box_bytes) = sealed.split_at(BACKUP_NONCE_SIZE);
    let nonce = <[u8; BACKUP_NONCE_SIZE]>::try_from(nonce).expect("length checked");
    crypto::secretbox_open(box_bytes, backup_key, &nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn backup_round_trips_and_authenticates() {
        let key = [0x55u8; 32];
        let sealed = seal_backup(b"exported state", &key, &mut OsRng).expect("seal");
        assert_eq!(
            open_backup(&sealed, &key).expect("open"),
            b"exported state"
        );

        let mut tampered = sealed.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        assert!(open_backup(&tampered, &key).is_err());
        assert!(open_backup(&sealed[..10], &key).is_err());
        assert!(open_backup(&sealed, &[0u8; 32]).is_err());
    }

    #[test]
    fn user_state_round_trips() {
        let mut csprng = OsRng;
        let now = Timestamp::from_epoch_seconds(1_000);
        let user = User::create(&mut csprng, None, now).expect("creation succeeds");

        let restored = deserialize_user(&serialize_user(&user)).expect("well formed");
        assert_eq!(
            restored.master_keys().public_identity_key(),
            user.master_keys().public_identity_key()
        );
        assert_eq!(
            restored.master_keys().signing_public_key(),
            user.master_keys().signing_public_key()
        );
        assert_eq!(restored.prekeys().list_public(), user.prekeys().list_public());

        assert_eq!(
            deserialize_user(b"not a user").unwrap_err(),
            AxolotlError::InvalidProtobufEncoding
        );
    }
}
