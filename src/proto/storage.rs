//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! Wire structures for suspension and resumption. Field numbers are
//! part of the stored format; append, never renumber.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyPairStructure {
    #[prost(bytes = "vec", tag = "1")]
    pub public_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub private_key: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SkippedKeyStructure {
    #[prost(bytes = "vec", tag = "1")]
    pub header_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub message_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint64, tag = "3")]
    pub expires_at: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RatchetStructure {
    #[prost(message, optional, tag = "1")]
    pub sender_ratchet_key_pair: ::core::option::Option<KeyPairStructure>,
    #[prost(bytes = "vec", tag = "2")]
    pub their_ratchet_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub root_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub sending_chain_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub receiving_chain_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "6")]
    pub sending_header_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "7")]
    pub receiving_header_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "8")]
    pub next_sending_header_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "9")]
    pub next_receiving_header_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint32, tag = "10")]
    pub send_message_number: u32,
    #[prost(uint32, tag = "11")]
    pub receive_message_number: u32,
    #[prost(uint32, tag = "12")]
    pub previous_send_message_number: u32,
    #[prost(bool, tag = "13")]
    pub pending_ratchet_step: bool,
    #[prost(bool, tag = "14")]
    pub role_alice: bool,
    #[prost(bool, tag = "15")]
    pub last_message_authentic: bool,
    #[prost(message, repeated, tag = "16")]
    pub skipped_keys: ::prost::alloc::vec::Vec<SkippedKeyStructure>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConversationStructure {
    #[prost(bytes = "vec", tag = "1")]
    pub id: ::prost::alloc::vec::Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub ratchet: ::core::option::Option<RatchetStructure>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrekeyStructure {
    #[prost(message, optional, tag = "1")]
    pub key_pair: ::core::option::Option<KeyPairStructure>,
    #[prost(uint64, optional, tag = "2")]
    pub deprecated_at: ::core::option::Option<u64>,
    #[prost(uint64, optional, tag = "3")]
    pub expires_at: ::core::option::Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrekeyStoreStructure {
    #[prost(message, repeated, tag = "1")]
    pub active: ::prost::alloc::vec::Vec<PrekeyStructure>,
    #[prost(message, repeated, tag = "2")]
    pub deprecated: ::prost::alloc::vec::Vec<PrekeyStructure>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MasterKeysStructure {
    /// 64-byte Ed25519 keypair encoding (seed followed by public).
    #[prost(bytes = "vec", tag = "1")]
    pub signing_key_pair: ::prost::alloc::vec::Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub identity_key_pair: ::core::option::Option<KeyPairStructure>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserStructure {
    #[prost(message, optional, tag = "1")]
    pub master_keys: ::core::option::Option<MasterKeysStructure>,
    #[prost(message, optional, tag = "2")]
    pub prekeys: ::core::option::Option<PrekeyStoreStructure>,
}
