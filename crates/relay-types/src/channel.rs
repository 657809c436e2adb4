//! Payment channel types.
//!
//! A channel binds a payer to a beneficiary. The payer signs ever-increasing
//! cumulative totals; the ledger only ever pays out the difference between
//! the newest accepted total and what was already withdrawn.

use alloy_primitives::{hex, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when building a channel identifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelIdError {
	/// The raw identifier is longer than 32 bytes.
	#[error("Channel id too long: {0} bytes (max 32)")]
	TooLong(usize),
	/// The identifier string is not valid hex.
	#[error("Invalid channel id hex: {0}")]
	InvalidHex(String),
}

/// Externally chosen 32-byte channel identifier.
///
/// Short identifiers are right-padded with zeros, the way a `bytes32` value is
/// built from a shorter byte string. The padded form is exactly what gets
/// signed in a channel withdrawal message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub B256);

impl ChannelId {
	/// Wraps a full 32-byte identifier.
	pub const fn new(id: B256) -> Self {
		Self(id)
	}

	/// Builds an identifier from up to 32 bytes, right-padding with zeros.
	pub fn right_padded(bytes: &[u8]) -> Result<Self, ChannelIdError> {
		if bytes.len() > 32 {
			return Err(ChannelIdError::TooLong(bytes.len()));
		}
		Ok(Self(B256::right_padding_from(bytes)))
	}

	/// Returns the 32 bytes as they appear in the signed message.
	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0 .0
	}
}

impl From<B256> for ChannelId {
	fn from(id: B256) -> Self {
		Self(id)
	}
}

impl fmt::Display for ChannelId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Parses a hex identifier (with or without `0x`), right-padding short values.
impl FromStr for ChannelId {
	type Err = ChannelIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let raw = hex::decode(s).map_err(|e| ChannelIdError::InvalidHex(e.to_string()))?;
		Self::right_padded(&raw)
	}
}

/// A payment channel record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
	/// Receives every redeemed delta.
	pub beneficiary: Address,
	/// Signs cumulative totals and funds the channel.
	pub payer: Address,
	/// Opaque data supplied when the channel was opened.
	pub open_data: Bytes,
	/// Total value redeemed so far. Never decreases.
	pub cumulative_withdrawn: U256,
}

impl Channel {
	/// Creates a freshly opened channel with nothing withdrawn.
	pub fn open(beneficiary: Address, payer: Address, open_data: Bytes) -> Self {
		Self {
			beneficiary,
			payer,
			open_data,
			cumulative_withdrawn: U256::ZERO,
		}
	}

	/// Returns how much a signature attesting to `claimed` would release,
	/// or `None` when `claimed` does not exceed what was already withdrawn.
	pub fn pending_delta(&self, claimed: U256) -> Option<U256> {
		claimed
			.checked_sub(self.cumulative_withdrawn)
			.filter(|delta| !delta.is_zero())
	}
}
