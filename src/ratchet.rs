//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! The Double Ratchet state machine.
//!
//! One `Ratchet` per directional session. All mutating operations are
//! serialized by the caller; the receive path is made atomic one level
//! up by staging a clone and swapping it in only after the message
//! authenticates.

mod keys;
mod params;

pub use self::keys::{ChainKey, HeaderKey, MessageKey, RootKey};
pub use self::params::{InitiatorParameters, ResponderParameters};

use crate::consts::limits::MAX_SKIPPED_KEYS;
use crate::curve::{KeyPair, PublicKey};
use crate::kdf;
use crate::session::role_is_alice;
use crate::skipped_keys::SkippedKeyStore;
use crate::timestamp::Timestamp;
use crate::{error::Result, AxolotlError};

use rand::{CryptoRng, Rng};

/// How the header of the packet currently being received related to
/// our header keys. Informational; overwritten per packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderDecryptability {
    NotTried,
    Current,
    Next,
    Undecryptable,
}

/// Everything one send needs: returned by [`Ratchet::next_send_keys`].
pub(crate) struct SendKeys {
    pub(crate) header_key: HeaderKey,
    pub(crate) message_number: u32,
    pub(crate) previous_message_number: u32,
    pub(crate) ratchet_key: PublicKey,
    pub(crate) message_key: MessageKey,
}

#[derive(Clone, Debug)]
pub struct Ratchet {
    role_alice: bool,
    sender_ratchet_key_pair: KeyPair,
    their_ratchet_key: PublicKey,

    root_key: RootKey,
    sending_chain_key: ChainKey,
    receiving_chain_key: ChainKey,
    sending_header_key: HeaderKey,
    receiving_header_key: HeaderKey,
    next_sending_header_key: HeaderKey,
    next_receiving_header_key: HeaderKey,

    send_message_number: u32,
    receive_message_number: u32,
    previous_send_message_number: u32,

    /// Set after a receive-side DH step; the next send must perform
    /// the mirror step before deriving message keys.
    pending_ratchet_step: bool,

    skipped_keys: SkippedKeyStore,
    header_decryptability: HeaderDecryptability,
    last_message_authentic: bool,
}

pub(crate) fn initialize_initiator_ratchet(parameters: &InitiatorParameters) -> Result<Ratchet> {
    let is_alice = role_is_alice(
        &parameters.our_identity_key_pair().public_key,
        parameters.their_identity_key(),
    )?;
    let initial_keys = kdf::derive_initial_keys(
        &parameters.our_identity_key_pair().private_key,
        parameters.their_identity_key(),
        &parameters.our_ephemeral_key_pair().private_key,
        parameters.their_prekey(),
        is_alice,
    )?;
    log::info!(
        "initiator ratchet created as role {}",
        if is_alice { "A" } else { "B" }
    );
    Ok(Ratchet::new(
        is_alice,
        parameters.our_ephemeral_key_pair().clone(),
        *parameters.their_prekey(),
        initial_keys,
        // The very first send replaces the bootstrap sending chain via
        // a DH step, so the peer classifies it under its next header
        // key.
        true,
    ))
}

pub(crate) fn initialize_responder_ratchet(parameters: &ResponderParameters) -> Result<Ratchet> {
    let is_alice = role_is_alice(
        &parameters.our_identity_key_pair().public_key,
        parameters.their_identity_key(),
    )?;
    let initial_keys = kdf::derive_initial_keys(
        &parameters.our_identity_key_pair().private_key,
        parameters.their_identity_key(),
        &parameters.our_prekey_pair().private_key,
        parameters.their_ephemeral_key(),
        is_alice,
    )?;
    log::info!(
        "responder ratchet created as role {}",
        if is_alice { "A" } else { "B" }
    );
    Ok(Ratchet::new(
        is_alice,
        parameters.our_prekey_pair().clone(),
        *parameters.their_ephemeral_key(),
        initial_keys,
        false,
    ))
}

impl Ratchet {
    fn new(
        role_alice: bool,
        sender_ratchet_key_pair: KeyPair,
        their_ratchet_key: PublicKey,
        initial_keys: kdf::InitialKeys,
        pending_ratchet_step: bool,
    ) -> Self {
        Self {
            role_alice,
            sender_ratchet_key_pair,
            their_ratchet_key,
            root_key: initial_keys.root_key,
            sending_chain_key: initial_keys.sending_chain_key,
            receiving_chain_key: initial_keys.receiving_chain_key,
            sending_header_key: initial_keys.sending_header_key,
            receiving_header_key: initial_keys.receiving_header_key,
            next_sending_header_key: initial_keys.next_sending_header_key,
            next_receiving_header_key: initial_keys.next_receiving_header_key,
            send_message_number: 0,
            receive_message_number: 0,
            previous_send_message_number: 0,
            pending_ratchet_step,
            skipped_keys: SkippedKeyStore::new(),
            header_decryptability: HeaderDecryptability::NotTried,
            last_message_authentic: true,
        }
    }

    /// Derive the keys and counters for the next outgoing message,
    /// performing the pending DH-ratchet step first if one is due.
    pub(crate) fn next_send_keys<R: Rng + CryptoRng>(
        &mut self,
        csprng: &mut R,
    ) -> Result<SendKeys> {
        if self.pending_ratchet_step {
            self.sender_ratchet_key_pair = KeyPair::generate(csprng);
            let (root_key, next_header_key, chain_key) = self.root_key.advance(
                &self.sender_ratchet_key_pair.private_key,
                &self.their_ratchet_key,
            )?;
            self.root_key = root_key;
            self.sending_header_key =
                std::mem::replace(&mut self.next_sending_header_key, next_header_key);
            self.sending_chain_key = chain_key;
            self.previous_send_message_number = self.send_message_number;
            self.send_message_number = 0;
            self.pending_ratchet_step = false;
            log::info!("send-side DH ratchet step");
        }

        let message_key = self.sending_chain_key.message_key()?;
        let message_number = self.send_message_number;
        self.sending_chain_key = self.sending_chain_key.next_chain_key()?;
        self.send_message_number += 1;

        Ok(SendKeys {
            header_key: self.sending_header_key.clone(),
            message_number,
            previous_message_number: self.previous_send_message_number,
            ratchet_key: self.sender_ratchet_key_pair.public_key,
            message_key,
        })
    }

    /// The two keys that might decrypt the next incoming header: the
    /// current receiving header key and the post-ratchet one.
    pub(crate) fn receive_header_keys(&self) -> (HeaderKey, HeaderKey) {
        (
            self.receiving_header_key.clone(),
            self.next_receiving_header_key.clone(),
        )
    }

    pub(crate) fn set_header_decryptability(&mut self, decryptability: HeaderDecryptability) {
        self.header_decryptability = decryptability;
    }

    #[inline]
    pub fn header_decryptability(&self) -> HeaderDecryptability {
        self.header_decryptability
    }

    pub(crate) fn set_last_message_authenticity(&mut self, authentic: bool) {
        self.last_message_authentic = authentic;
    }

    #[inline]
    pub fn last_message_authentic(&self) -> bool {
        self.last_message_authentic
    }

    #[inline]
    pub fn skipped_keys(&self) -> &SkippedKeyStore {
        &self.skipped_keys
    }

    pub(crate) fn skipped_keys_mut(&mut self) -> &mut SkippedKeyStore {
        &mut self.skipped_keys
    }

    /// Advance the receive side for a header that decrypted to
    /// (`their_ephemeral`, `message_number`, `previous_message_number`)
    /// and was already classified. Returns the message key for this
    /// packet; keys for stepped-past numbers land in the skipped store.
    ///
    /// Callers stage this on a clone: a failure leaves the clone to be
    /// discarded and the live state untouched.
    pub(crate) fn receive(
        &mut self,
        their_ephemeral: &PublicKey,
        message_number: u32,
        previous_message_number: u32,
        now: Timestamp,
    ) -> Result<MessageKey> {
        match self.header_decryptability {
            HeaderDecryptability::Current => {
                if message_number < self.receive_message_number {
                    // Replays of already-consumed numbers do not reach
                    // the skipped store, so they end up here.
                    return Err(AxolotlError::DecryptError("replayed message number"));
                }
                self.check_skip_bound(u64::from(message_number - self.receive_message_number))?;

                let message_key = self.stage_current_chain(message_number, now)?;
                self.receive_message_number = message_number + 1;
                Ok(message_key)
            }
            HeaderDecryptability::Next => {
                if previous_message_number < self.receive_message_number {
                    return Err(AxolotlError::DecryptError(
                        "previous chain ended before already-received messages",
                    ));
                }
                self.check_skip_bound(
                    u64::from(previous_message_number - self.receive_message_number)
                        + u64::from(message_number),
                )?;

                // Cache the unseen tail of the old chain under the old
                // header key.
                self.stage_skipped_keys(previous_message_number, now)?;

                // Receive-side DH step: rotate header keys, fold the
                // new ephemeral into the root key.
                let (root_key, next_header_key, chain_key) = self.root_key.advance(
                    &self.sender_ratchet_key_pair.private_key,
                    their_ephemeral,
                )?;
                self.root_key = root_key;
                self.receiving_header_key =
                    std::mem::replace(&mut self.next_receiving_header_key, next_header_key);
                self.receiving_chain_key = chain_key;
                self.their_ratchet_key = *their_ephemeral;
                self.receive_message_number = 0;
                log::info!("receive-side DH ratchet step");

                let message_key = self.stage_current_chain(message_number, now)?;
                self.receive_message_number = message_number + 1;
                self.pending_ratchet_step = true;
                Ok(message_key)
            }
            HeaderDecryptability::Undecryptable => {
                self.last_message_authentic = false;
                Err(AxolotlError::DecryptError("header undecryptable"))
            }
            HeaderDecryptability::NotTried => Err(AxolotlError::InvalidState(
                "receive",
                "header was never classified",
            )),
        }
    }

    /// Reject receives that would stage more keys than the store may
    /// hold; a far-future message number must not evict live keys.
    fn check_skip_bound(&self, staged: u64) -> Result<()> {
        if self.skipped_keys.len() as u64 + staged > MAX_SKIPPED_KEYS as u64 {
            return Err(AxolotlError::DecryptError(
                "message number too far in the future",
            ));
        }
        Ok(())
    }

    /// Cache keys for numbers `receive_message_number..until` under
    /// the current receiving header key, advancing the chain past them.
    fn stage_skipped_keys(&mut self, until: u32, now: Timestamp) -> Result<()> {
        for _ in self.receive_message_number..until {
            self.skipped_keys.put(
                self.receiving_header_key.clone(),
                self.receiving_chain_key.message_key()?,
                now,
            );
            self.receiving_chain_key = self.receiving_chain_key.next_chain_key()?;
        }
        Ok(())
    }

    /// Stage everything below `until`, then return the message key for
    /// `until` itself with the chain advanced past it.
    fn stage_current_chain(&mut self, until: u32, now: Timestamp) -> Result<MessageKey> {
        self.stage_skipped_keys(until, now)?;
        let message_key = self.receiving_chain_key.message_key()?;
        self.receiving_chain_key = self.receiving_chain_key.next_chain_key()?;
        Ok(message_key)
    }

    // Accessors for suspension and tests.

    #[inline]
    pub fn send_message_number(&self) -> u32 {
        self.send_message_number
    }

    #[inline]
    pub fn receive_message_number(&self) -> u32 {
        self.receive_message_number
    }

    #[inline]
    pub fn previous_send_message_number(&self) -> u32 {
        self.previous_send_message_number
    }

    #[inline]
    pub(crate) fn role_alice(&self) -> bool {
        self.role_alice
    }

    #[inline]
    pub(crate) fn pending_ratchet_step(&self) -> bool {
        self.pending_ratchet_step
    }

    #[inline]
    pub(crate) fn sender_ratchet_key_pair(&self) -> &KeyPair {
        &self.sender_ratchet_key_pair
    }

    #[inline]
    pub(crate) fn their_ratchet_key(&self) -> &PublicKey {
        &self.their_ratchet_key
    }

    #[inline]
    pub(crate) fn root_key(&self) -> &RootKey {
        &self.root_key
    }

    #[inline]
    pub(crate) fn sending_chain_key(&self) -> &ChainKey {
        &self.sending_chain_key
    }

    #[inline]
    pub(crate) fn receiving_chain_key(&self) -> &ChainKey {
        &self.receiving_chain_key
    }

    #[inline]
    pub(crate) fn sending_header_key(&self) -> &HeaderKey {
        &self.sending_header_key
    }

    #[inline]
    pub(crate) fn receiving_header_key(&self) -> &HeaderKey {
        &self.receiving_header_key
    }

    #[inline]
    pub(crate) fn next_sending_header_key(&self) -> &HeaderKey {
        &self.next_sending_header_key
    }

    #[inline]
    pub(crate) fn next_receiving_header_key(&self) -> &HeaderKey {
        &self.next_receiving_header_key
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        role_alice: bool,
        sender_ratchet_key_pair: KeyPair,
        their_ratchet_key: PublicKey,
        root_key: RootKey,
        sending_chain_key: ChainKey,
        receiving_chain_key: ChainKey,
        sending_header_key: HeaderKey,
        receiving_header_key: HeaderKey,
        next_sending_header_key: HeaderKey,
        next_receiving_header_key: HeaderKey,
        send_message_number: u32,
        receive_message_number: u32,
        previous_send_message_number: u32,
        pending_ratchet_step: bool,
        last_message_authentic: bool,
        skipped_keys: SkippedKeyStore,
    ) -> Self {
        Self {
            role_alice,
            sender_ratchet_key_pair,
            their_ratchet_key,
            root_key,
            sending_chain_key,
            receiving_chain_key,
            sending_header_key,
            receiving_header_key,
            next_sending_header_key,
            next_receiving_header_key,
            send_message_number,
            receive_message_number,
            previous_send_message_number,
            pending_ratchet_step,
            skipped_keys,
            header_decryptability: HeaderDecryptability::NotTried,
            last_message_authentic,
        }
    }
}
