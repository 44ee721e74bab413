//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

#![warn(missing_docs)]

//! Magic numbers.

use std::time::Duration;

/// Protocol version advertised in the packet preamble (low 4 bits).
pub const PROTOCOL_VERSION: u8 = 1;
/// Highest protocol version this decoder understands.
pub const HIGHEST_SUPPORTED_PROTOCOL_VERSION: u8 = 1;

/// X25519 public key, in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;
/// X25519 private key, in bytes.
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Ed25519 public key, in bytes.
pub const SIGNING_PUBLIC_KEY_SIZE: usize = 32;
/// Ed25519 keypair (seed and public half), in bytes.
pub const SIGNING_PRIVATE_KEY_SIZE: usize = 64;
/// Ed25519 signature, in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// Root key of the DH ratchet, in bytes.
pub const ROOT_KEY_SIZE: usize = 32;
/// Sending/receiving chain key, in bytes.
pub const CHAIN_KEY_SIZE: usize = 32;
/// Header AEAD key, in bytes.
pub const HEADER_KEY_SIZE: usize = 32;
/// Message secretbox key, in bytes.
pub const MESSAGE_KEY_SIZE: usize = 32;

/// Nonce of the header AEAD (ChaCha20-Poly1305), in bytes.
pub const HEADER_NONCE_SIZE: usize = 12;
/// Nonce of the message secretbox (XSalsa20-Poly1305), in bytes.
pub const MESSAGE_NONCE_SIZE: usize = 24;
/// Nonce used when sealing exported state with a backup key, in bytes.
pub const BACKUP_NONCE_SIZE: usize = 24;

/// Local conversation identifier, in bytes.
pub const CONVERSATION_ID_SIZE: usize = 32;

/// Various positive integers bounding the maximum size of other data structures.
pub mod limits {
    /// Number of one-time prekeys kept in the active pool.
    pub const PREKEY_COUNT: usize = 100;

    /// Largest number of in-flight messages a well-behaved peer
    /// reorders across.
    pub const MESSAGE_JITTER: usize = 25;

    /// Upper bound on the skipped-key store. Sized as 40 times the
    /// largest reordering window we expect from a lossy transport; a
    /// receive that would stage more than this is rejected instead of
    /// evicting live keys.
    pub const MAX_SKIPPED_KEYS: usize = 40 * MESSAGE_JITTER;

    /// Cap on the encoded ratchet header length field.
    pub const MAX_HEADER_LENGTH: usize = 255;
}

/// How long a skipped (header key, message key) pair stays usable.
pub const SKIPPED_KEY_LIFETIME: Duration = Duration::from_secs(31 * 24 * 60 * 60);

/// How long a deprecated prekey is kept for retried initial messages.
pub const DEPRECATED_PREKEY_LIFETIME: Duration = Duration::from_secs(31 * 24 * 60 * 60);

/// Active prekeys older than this are replaced on rotation.
pub const PREKEY_ROTATION_PERIOD: Duration = Duration::from_secs(31 * 24 * 60 * 60);

/// Validity window stamped into a signed prekey list.
pub const PREKEY_LIST_LIFETIME: Duration = Duration::from_secs(31 * 24 * 60 * 60);
