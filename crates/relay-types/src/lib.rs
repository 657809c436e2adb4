//! Common types module for the signed-authorization relay.
//!
//! This module defines the data types shared by every relay component: the
//! channel records owned by the payment channel ledger, the signed payloads
//! accepted by the executor together with their canonical byte encodings, and
//! the settlement events published after successful operations.

/// Payment channel records and identifiers.
pub mod channel;
/// Settlement events published by relay components.
pub mod events;
/// Signed payload types and their canonical encodings.
pub mod payload;
/// Registry trait for configurable implementations.
pub mod registry;
/// Secret string wrapper for private key material.
pub mod secret_string;
/// Encoding, hashing and formatting helpers.
pub mod utils;

pub use alloy_primitives::{Address, Bytes, B256, U256};

pub use channel::{Channel, ChannelId, ChannelIdError};
pub use events::SettlementEvent;
pub use payload::{
	CanonicalMessage, ChannelWithdrawal, Cheque, OperatorAction, OperatorAuthorization,
	PreSignedTransfer, SignedPayload,
};
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use utils::{
	personal_message_hash, truncate_id, PackedEncoder, DEFAULT_LEGACY_MARKER, SIGNATURE_LENGTH,
};
