//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! The wire frame carrying one ratchet step.
//!
//! ```text
//! offset size
//! 0      1    packet type        (1 = normal, 2 = prekey)
//! 1      1    current version    (low 4 bits)
//! 2      1    highest version    (low 4 bits)
//! 3      2    header length      (big endian, <= 255)
//! 5      12   header nonce
//! 17     24   message nonce
//! 41     [96] prekey bundle      (prekey packets only)
//! ...    header length + 16      header ciphertext  (ChaCha20-Poly1305)
//! ...    rest                    message ciphertext (XSalsa20-Poly1305)
//! ```
//!
//! The preamble (everything before the header ciphertext, bundle
//! included) is the associated data of the header AEAD, so the bundle
//! fields are authenticated but not confidential.

use crate::consts::{
    limits::MAX_HEADER_LENGTH, HEADER_NONCE_SIZE, HIGHEST_SUPPORTED_PROTOCOL_VERSION,
    MESSAGE_NONCE_SIZE, PROTOCOL_VERSION, PUBLIC_KEY_SIZE,
};
use crate::curve::PublicKey;
use crate::ratchet::{HeaderKey, MessageKey};
use crate::{crypto, error::Result, AxolotlError};

use rand::{CryptoRng, Rng};

const PREAMBLE_SIZE: usize = 1 + 1 + 1 + 2 + HEADER_NONCE_SIZE + MESSAGE_NONCE_SIZE;
const BUNDLE_SIZE: usize = 3 * PUBLIC_KEY_SIZE;
const TAG_SIZE: usize = 16;

const HEADER_LENGTH_OFFSET: usize = 3;
const HEADER_NONCE_OFFSET: usize = 5;
const MESSAGE_NONCE_OFFSET: usize = HEADER_NONCE_OFFSET + HEADER_NONCE_SIZE;
const BUNDLE_OFFSET: usize = PREAMBLE_SIZE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketType {
    Normal = 1,
    Prekey = 2,
}

impl TryFrom<u8> for PacketType {
    type Error = AxolotlError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(PacketType::Normal),
            2 => Ok(PacketType::Prekey),
            _ => Err(AxolotlError::InvalidInput("unknown packet type")),
        }
    }
}

/// The plaintext key material a prekey packet carries so the receiver
/// can run the initial key agreement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrekeyBundle {
    pub sender_identity_key: PublicKey,
    pub sender_ephemeral_key: PublicKey,
    pub prekey: PublicKey,
}

impl PrekeyBundle {
    fn serialize_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.sender_identity_key.as_bytes());
        out.extend_from_slice(self.sender_ephemeral_key.as_bytes());
        out.extend_from_slice(self.prekey.as_bytes());
    }

    fn deserialize(value: &[u8]) -> Result<Self> {
        if value.len() != BUNDLE_SIZE {
            return Err(AxolotlError::InvalidInput("bad prekey bundle length"));
        }
        Ok(Self {
            sender_identity_key: PublicKey::deserialize(&value[..PUBLIC_KEY_SIZE])?,
            sender_ephemeral_key: PublicKey::deserialize(
                &value[PUBLIC_KEY_SIZE..2 * PUBLIC_KEY_SIZE],
            )?,
            prekey: PublicKey::deserialize(&value[2 * PUBLIC_KEY_SIZE..])?,
        })
    }
}

/// A parsed packet. Parsing only reads the preamble; no cryptographic
/// verification happens before [`Packet::decrypt_header`].
#[derive(Clone, Debug)]
pub struct Packet {
    packet_type: PacketType,
    current_version: u8,
    highest_supported_version: u8,
    bundle: Option<PrekeyBundle>,
    header_nonce: [u8; HEADER_NONCE_SIZE],
    message_nonce: [u8; MESSAGE_NONCE_SIZE],
    header_length: usize,
    serialized: Box<[u8]>,
}

impl Packet {
    pub fn encrypt<R: Rng + CryptoRng>(
        packet_type: PacketType,
        header: &[u8],
        header_key: &HeaderKey,
        message: &[u8],
        message_key: &MessageKey,
        bundle: Option<&PrekeyBundle>,
        csprng: &mut R,
    ) -> Result<Packet> {
        if header.len() > MAX_HEADER_LENGTH {
            return Err(AxolotlError::InvalidInput("ratchet header too long"));
        }
        match (packet_type, bundle) {
            (PacketType::Prekey, Some(_)) | (PacketType::Normal, None) => {}
            _ => {
                return Err(AxolotlError::InvalidInput(
                    "prekey bundle must be present exactly on prekey packets",
                ))
            }
        }

        let mut header_nonce = [0u8; HEADER_NONCE_SIZE];
        let mut message_nonce = [0u8; MESSAGE_NONCE_SIZE];
        csprng.fill_bytes(&mut header_nonce);
        csprng.fill_bytes(&mut message_nonce);

        let preamble_len = PREAMBLE_SIZE + bundle.map_or(0, |_| BUNDLE_SIZE);
        let mut serialized =
            Vec::with_capacity(preamble_len + header.len() + TAG_SIZE + message.len() + TAG_SIZE);
        serialized.push(packet_type as u8);
        serialized.push(PROTOCOL_VERSION);
        serialized.push(HIGHEST_SUPPORTED_PROTOCOL_VERSION);
        serialized.extend_from_slice(&(header.len() as u16).to_be_bytes());
        serialized.extend_from_slice(&header_nonce);
        serialized.extend_from_slice(&message_nonce);
        if let Some(bundle) = bundle {
            bundle.serialize_into(&mut serialized);
        }

        let header_ciphertext = crypto::header_seal(
            header,
            header_key.as_bytes(),
            &header_nonce,
            &serialized[..preamble_len],
        )?;
        serialized.extend_from_slice(&header_ciphertext);

        let message_ciphertext =
            crypto::secretbox_seal(message, message_key.as_bytes(), &message_nonce)?;
        serialized.extend_from_slice(&message_ciphertext);

        Ok(Packet {
            packet_type,
            current_version: PROTOCOL_VERSION,
            highest_supported_version: HIGHEST_SUPPORTED_PROTOCOL_VERSION,
            bundle: bundle.cloned(),
            header_nonce,
            message_nonce,
            header_length: header.len(),
            serialized: serialized.into_boxed_slice(),
        })
    }

    #[inline]
    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    #[inline]
    pub fn current_version(&self) -> u8 {
        self.current_version
    }

    #[inline]
    pub fn highest_supported_version(&self) -> u8 {
        self.highest_supported_version
    }

    /// The authenticated-but-plaintext bundle fields, present on prekey
    /// packets. Readable without any key material.
    #[inline]
    pub fn bundle(&self) -> Option<&PrekeyBundle> {
        self.bundle.as_ref()
    }

    #[inline]
    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }

    fn preamble_len(&self) -> usize {
        PREAMBLE_SIZE + self.bundle.as_ref().map_or(0, |_| BUNDLE_SIZE)
    }

    fn header_ciphertext(&self) -> &[u8] {
        let start = self.preamble_len();
        &self.serialized[start..start + self.header_length + TAG_SIZE]
    }

    fn message_ciphertext(&self) -> &[u8] {
        &self.serialized[self.preamble_len() + self.header_length + TAG_SIZE..]
    }

    /// Trial-decrypt the header with `key`. Failure is non-destructive
    /// and, on the receive path, not necessarily an error.
    pub fn decrypt_header(&self, key: &HeaderKey) -> Result<Vec<u8>> {
        crypto::header_open(
            self.header_ciphertext(),
            key.as_bytes(),
            &self.header_nonce,
            &self.serialized[..self.preamble_len()],
        )
    }

    pub fn decrypt_message(&self, key: &MessageKey) -> Result<Vec<u8>> {
        crypto::secretbox_open(self.message_ciphertext(), key.as_bytes(), &self.message_nonce)
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        &self.serialized
    }
}

impl TryFrom<&[u8]> for Packet {
    type Error = AxolotlError;

    fn try_from(value: &[u8]) -> Result<Self> {
        if value.len() < PREAMBLE_SIZE {
            return Err(AxolotlError::InvalidInput("packet too short"));
        }

        let packet_type = PacketType::try_from(value[0])?;
        let current_version = value[1];
        let highest_supported_version = value[2];
        if current_version & 0xF0 != 0 || highest_supported_version & 0xF0 != 0 {
            return Err(AxolotlError::InvalidInput("malformed version field"));
        }
        if current_version == 0 || highest_supported_version < current_version {
            return Err(AxolotlError::InvalidInput("malformed version field"));
        }
        if current_version > HIGHEST_SUPPORTED_PROTOCOL_VERSION {
            return Err(AxolotlError::UnsupportedProtocolVersion(current_version));
        }

        let header_length = u16::from_be_bytes(
            value[HEADER_LENGTH_OFFSET..HEADER_LENGTH_OFFSET + 2]
                .try_into()
                .expect("slice length checked"),
        ) as usize;
        if header_length > MAX_HEADER_LENGTH {
            return Err(AxolotlError::InvalidInput("header length over cap"));
        }

        let header_nonce: [u8; HEADER_NONCE_SIZE] = value
            [HEADER_NONCE_OFFSET..HEADER_NONCE_OFFSET + HEADER_NONCE_SIZE]
            .try_into()
            .expect("slice length checked");
        let message_nonce: [u8; MESSAGE_NONCE_SIZE] = value
            [MESSAGE_NONCE_OFFSET..MESSAGE_NONCE_OFFSET + MESSAGE_NONCE_SIZE]
            .try_into()
            .expect("slice length checked");

        let bundle = match packet_type {
            PacketType::Normal => None,
            PacketType::Prekey => {
                if value.len() < BUNDLE_OFFSET + BUNDLE_SIZE {
                    return Err(AxolotlError::InvalidInput("packet too short"));
                }
                Some(PrekeyBundle::deserialize(
                    &value[BUNDLE_OFFSET..BUNDLE_OFFSET + BUNDLE_SIZE],
                )?)
            }
        };

        let preamble_len = PREAMBLE_SIZE + bundle.as_ref().map_or(0, |_| BUNDLE_SIZE);
        // Both ciphertexts carry a Poly1305 tag even when empty.
        if value.len() < preamble_len + header_length + TAG_SIZE + TAG_SIZE {
            return Err(AxolotlError::InvalidInput("packet too short"));
        }

        Ok(Packet {
            packet_type,
            current_version,
            highest_supported_version,
            bundle,
            header_nonce,
            message_nonce,
            header_length,
            serialized: Box::from(value),
        })
    }
}
