//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! Thin wrappers over the fixed primitive suite: keyed Blake2b, the
//! ChaCha20-Poly1305 header AEAD and the XSalsa20-Poly1305 message
//! secretbox.

use crate::consts::{HEADER_NONCE_SIZE, MESSAGE_NONCE_SIZE};
use crate::{error::Result, AxolotlError};

use blake2::digest::consts::{U32, U64};
use blake2::digest::Mac;
use blake2::{Blake2b512, Blake2bMac, Digest};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::ChaCha20Poly1305;
use crypto_secretbox::XSalsa20Poly1305;

type Blake2bMac256 = Blake2bMac<U32>;
type Blake2bMac512 = Blake2bMac<U64>;

/// Keyed Blake2b with a 32-byte output. Accepts key lengths between 16
/// and 64 bytes.
pub(crate) fn blake2b_keyed(key: &[u8], input: &[u8]) -> Result<[u8; 32]> {
    if key.len() < 16 {
        return Err(AxolotlError::KeyDerivationFailed("key too short"));
    }
    let mut mac = <Blake2bMac256 as Mac>::new_from_slice(key)
        .map_err(|_| AxolotlError::KeyDerivationFailed("key too long"))?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().into())
}

/// Keyed Blake2b with a 64-byte output, for derivations that are split
/// into several subkeys.
pub(crate) fn blake2b_keyed_64(key: &[u8], input: &[u8]) -> Result<[u8; 64]> {
    if key.len() < 16 {
        return Err(AxolotlError::KeyDerivationFailed("key too short"));
    }
    let mut mac = <Blake2bMac512 as Mac>::new_from_slice(key)
        .map_err(|_| AxolotlError::KeyDerivationFailed("key too long"))?;
    mac.update(input);
    let mut output = [0u8; 64];
    output.copy_from_slice(&mac.finalize().into_bytes());
    Ok(output)
}

/// Unkeyed Blake2b-512 over the concatenation of `inputs`.
pub(crate) fn blake2b_hash_64(inputs: &[&[u8]]) -> [u8; 64] {
    let mut hasher = Blake2b512::new();
    for input in inputs {
        hasher.update(input);
    }
    let mut output = [0u8; 64];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Header AEAD. The preamble of the enclosing packet is passed as `aad`
/// so that any preamble modification invalidates the header tag.
pub(crate) fn header_seal(
    ptext: &[u8],
    key: &[u8; 32],
    nonce: &[u8; HEADER_NONCE_SIZE],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key.into());
    cipher
        .encrypt(nonce.into(), Payload { msg: ptext, aad })
        .map_err(|_| AxolotlError::InvalidInput("header too large for aead"))
}

pub(crate) fn header_open(
    ctext: &[u8],
    key: &[u8; 32],
    nonce: &[u8; HEADER_NONCE_SIZE],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key.into());
    cipher
        .decrypt(nonce.into(), Payload { msg: ctext, aad })
        .map_err(|_| AxolotlError::DecryptError("header aead tag mismatch"))
}

/// Message secretbox.
pub(crate) fn secretbox_seal(
    ptext: &[u8],
    key: &[u8; 32],
    nonce: &[u8; MESSAGE_NONCE_SIZE],
) -> Result<Vec<u8>> {
    let cipher = XSalsa20Poly1305::new(key.into());
    cipher
        .encrypt(nonce.into(), ptext)
        .map_err(|_| AxolotlError::InvalidInput("message too large for secretbox"))
}

pub(crate) fn secretbox_open(
    ctext: &[u8],
    key: &[u8; 32],
    nonce: &[u8; MESSAGE_NONCE_SIZE],
) -> Result<Vec<u8>> {
    let cipher = XSalsa20Poly1305::new(key.into());
    cipher
        .decrypt(nonce.into(), ctext)
        .map_err(|_| AxolotlError::DecryptError("secretbox tag mismatch"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_hash_rejects_out_of_range_keys() {
        assert!(blake2b_keyed(&[0u8; 15], b"input").is_err());
        assert!(blake2b_keyed(&[0u8; 65], b"input").is_err());
        assert!(blake2b_keyed(&[0u8; 16], b"input").is_ok());
        assert!(blake2b_keyed_64(&[0u8; 64], b"input").is_ok());
    }

    #[test]
    fn keyed_hash_separates_keys_and_inputs() {
        let a = blake2b_keyed(&[1u8; 32], b"input").expect("valid key");
        let b = blake2b_keyed(&[2u8; 32], b"input").expect("valid key");
        let c = blake2b_keyed(&[1u8; 32], b"other").expect("valid key");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, blake2b_keyed(&[1u8; 32], b"input").expect("valid key"));
    }

    #[test]
    fn header_aead_binds_aad() {
        let key = [7u8; 32];
        let nonce = [9u8; HEADER_NONCE_SIZE];
        let ctext = header_seal(b"header", &key, &nonce, b"preamble").expect("seal");
        assert_eq!(
            header_open(&ctext, &key, &nonce, b"preamble").expect("open"),
            b"header"
        );
        assert!(header_open(&ctext, &key, &nonce, b"Preamble").is_err());

        let mut bad = ctext.clone();
        bad[0] ^= 0x01;
        assert!(header_open(&bad, &key, &nonce, b"preamble").is_err());
    }

    #[test]
    fn secretbox_rejects_tampering() {
        let key = [3u8; 32];
        let nonce = [4u8; MESSAGE_NONCE_SIZE];
        let ctext = secretbox_seal(b"message", &key, &nonce).expect("seal");
        assert_eq!(
            secretbox_open(&ctext, &key, &nonce).expect("open"),
            b"message"
        );
        for i in 0..ctext.len() {
            let mut bad = ctext.clone();
            bad[i] ^= 0x80;
            assert!(secretbox_open(&bad, &key, &nonce).is_err());
        }
    }
}
