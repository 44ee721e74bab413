//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! The plaintext ratchet header carried inside the header AEAD:
//! sender ephemeral, message number and previous-chain length.

use crate::consts::PUBLIC_KEY_SIZE;
use crate::curve::PublicKey;
use crate::{error::Result, AxolotlError};

/// Encoded size: ephemeral (32) | Ns (4 BE) | PNs (4 BE).
pub const RATCHET_HEADER_SIZE: usize = PUBLIC_KEY_SIZE + 4 + 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RatchetHeader {
    sender_ephemeral: PublicKey,
    message_number: u32,
    previous_message_number: u32,
}

impl RatchetHeader {
    pub fn new(
        sender_ephemeral: PublicKey,
        message_number: u32,
        previous_message_number: u32,
    ) -> Self {
        Self {
            sender_ephemeral,
            message_number,
            previous_message_number,
        }
    }

    #[inline]
    pub fn sender_ephemeral(&self) -> &PublicKey {
        &self.sender_ephemeral
    }

    #[inline]
    pub fn message_number(&self) -> u32 {
        self.message_number
    }

    #[inline]
    pub fn previous_message_number(&self) -> u32 {
        self.previous_message_number
    }

    pub fn serialize(&self) -> [u8; RATCHET_HEADER_SIZE] {
        let mut result = [0u8; RATCHET_HEADER_SIZE];
        result[..PUBLIC_KEY_SIZE].copy_from_slice(self.sender_ephemeral.as_bytes());
        result[PUBLIC_KEY_SIZE..PUBLIC_KEY_SIZE + 4]
            .copy_from_slice(&self.message_number.to_be_bytes());
        result[PUBLIC_KEY_SIZE + 4..].copy_from_slice(&self.previous_message_number.to_be_bytes());
        result
    }

    pub fn deserialize(value: &[u8]) -> Result<Self> {
        if value.len() != RATCHET_HEADER_SIZE {
            return Err(AxolotlError::InvalidInput("bad ratchet header length"));
        }
        let sender_ephemeral = PublicKey::deserialize(&value[..PUBLIC_KEY_SIZE])?;
        let message_number = u32::from_be_bytes(
            value[PUBLIC_KEY_SIZE..PUBLIC_KEY_SIZE + 4]
                .try_into()
                .expect("slice length checked"),
        );
        let previous_message_number = u32::from_be_bytes(
            value[PUBLIC_KEY_SIZE + 4..]
                .try_into()
                .expect("slice length checked"),
        );
        Ok(Self {
            sender_ephemeral,
            message_number,
            previous_message_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::KeyPair;
    use rand::rngs::OsRng;

    #[test]
    fn round_trips() {
        let ephemeral = KeyPair::generate(&mut OsRng).public_key;
        let header = RatchetHeader::new(ephemeral, 7, 3);

        let bytes = header.serialize();
        assert_eq!(bytes.len(), RATCHET_HEADER_SIZE);
        assert_eq!(&bytes[32..36], &[0, 0, 0, 7]);
        assert_eq!(&bytes[36..40], &[0, 0, 0, 3]);

        let parsed = RatchetHeader::deserialize(&bytes).expect("well formed");
        assert_eq!(parsed, header);

        assert!(RatchetHeader::deserialize(&bytes[..39]).is_err());
    }
}
