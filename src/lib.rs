//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! An end-to-end encrypted messaging core: the Double Ratchet layered
//! on an X3DH-style asynchronous key agreement, with header
//! encryption, a skipped-key cache for out-of-order delivery and a
//! one-time prekey store for session bootstrap.

#![warn(clippy::unwrap_used)]
#![deny(unsafe_code)]

pub mod consts;
mod conversation;
mod crypto;
mod curve;
pub mod error;
mod header;
mod kdf;
mod master_keys;
mod packet;
mod prekey_store;
mod proto;
mod ratchet;
mod session;
mod skipped_keys;
mod state;
mod timestamp;
mod user;

pub use {
    conversation::{Conversation, ReceivedMessage},
    curve::{KeyPair, PrivateKey, PublicKey},
    error::AxolotlError,
    header::{RatchetHeader, RATCHET_HEADER_SIZE},
    master_keys::{MasterKeys, SigningPublicKey},
    packet::{Packet, PacketType, PrekeyBundle},
    prekey_store::{PrekeyList, PrekeyStore},
    ratchet::{
        ChainKey, HeaderDecryptability, HeaderKey, InitiatorParameters, MessageKey, Ratchet,
        ResponderParameters, RootKey,
    },
    skipped_keys::SkippedKeyStore,
    state::{open_backup, seal_backup},
    timestamp::Timestamp,
    user::User,
};
