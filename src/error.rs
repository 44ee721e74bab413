//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! The closed set of error kinds surfaced by this crate.

use displaydoc::Display;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AxolotlError>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum AxolotlError {
    /// invalid input: {0}
    InvalidInput(&'static str),

    /// key generation failed: {0}
    KeyGenerationFailed(&'static str),
    /// key derivation failed: {0}
    KeyDerivationFailed(&'static str),

    /// decryption failed: {0}
    DecryptError(&'static str),

    /// not found: {0}
    NotFound(&'static str),

    /// invalid state for call to {0} to succeed: {1}
    InvalidState(&'static str, &'static str),

    /// signature verification failed
    VerifyError,

    /// unsupported protocol version <{0}>
    UnsupportedProtocolVersion(u8),

    /// serialized state could not be parsed
    InvalidProtobufEncoding,
}
