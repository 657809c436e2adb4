//! Signed payload types.
//!
//! Each payload knows its canonical packed byte layout. Signers and the
//! verifying components both derive the signed hash from that layout, so any
//! field that differs between what was signed and what is submitted changes
//! the recovered identity.
//!
//! Layouts:
//! - channel withdrawal: `ledger(20) || channel_id(32, right-padded) || cumulative(32)`
//! - pre-signed transfer / cheque: `token(20) || to(20) || value(32) || fee(32) || data || nonce(32) || [marker]`
//! - operator authorization: `token(20) || operator(20) || nonce(32) || action(1)`

use crate::channel::ChannelId;
use crate::utils::{personal_message_hash, PackedEncoder};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// Canonical message construction shared by every payload type.
pub trait CanonicalMessage {
	/// Returns the packed bytes covered by the signature.
	fn encode(&self) -> Vec<u8>;

	/// Returns the keccak-256 digest of the packed bytes.
	fn digest(&self) -> B256 {
		keccak256(self.encode())
	}

	/// Returns the personal-message hash that is actually signed.
	fn signing_hash(&self) -> B256 {
		personal_message_hash(&self.digest())
	}
}

/// Whether an operator signature grants or removes authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorAction {
	Revoke,
	Authorize,
}

impl OperatorAction {
	/// Returns the flag byte embedded in the signed message.
	pub fn flag(self) -> u8 {
		match self {
			OperatorAction::Revoke => 0,
			OperatorAction::Authorize => 1,
		}
	}

	/// The action whose signed bytes differ only in the flag.
	pub fn opposite(self) -> Self {
		match self {
			OperatorAction::Revoke => OperatorAction::Authorize,
			OperatorAction::Authorize => OperatorAction::Revoke,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			OperatorAction::Revoke => "revoke",
			OperatorAction::Authorize => "authorize",
		}
	}
}

/// A payer's attestation of the total owed on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelWithdrawal {
	/// Identity of the channel ledger the signature is bound to.
	pub ledger: Address,
	pub channel_id: ChannelId,
	/// Cumulative total owed to the beneficiary.
	pub cumulative_value: U256,
}

impl CanonicalMessage for ChannelWithdrawal {
	fn encode(&self) -> Vec<u8> {
		let mut enc = PackedEncoder::new();
		enc.push_address(&self.ledger)
			.push_b256(&self.channel_id.0)
			.push_u256(self.cumulative_value);
		enc.finish()
	}
}

/// A one-shot transfer authorization paying a relayer fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreSignedTransfer {
	/// Identity of the token the signature is bound to.
	pub token: Address,
	pub to: Address,
	pub value: U256,
	/// Paid to whoever submits the transfer.
	pub fee: U256,
	pub nonce: U256,
}

impl CanonicalMessage for PreSignedTransfer {
	fn encode(&self) -> Vec<u8> {
		let mut enc = PackedEncoder::new();
		enc.push_address(&self.token)
			.push_address(&self.to)
			.push_u256(self.value)
			.push_u256(self.fee)
			.push_u256(self.nonce);
		enc.finish()
	}
}

/// A cheque: a one-shot transfer carrying notification data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cheque {
	pub token: Address,
	pub to: Address,
	pub value: U256,
	pub fee: U256,
	/// Forwarded to the recipient's receive hook.
	pub data: Bytes,
	pub nonce: U256,
	/// Compatibility marker appended for legacy signers.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub legacy_marker: Option<Bytes>,
}

impl Cheque {
	/// Appends the given marker to the signed encoding.
	pub fn with_legacy_marker(mut self, marker: impl Into<Bytes>) -> Self {
		self.legacy_marker = Some(marker.into());
		self
	}
}

impl CanonicalMessage for Cheque {
	fn encode(&self) -> Vec<u8> {
		let mut enc = PackedEncoder::new();
		enc.push_address(&self.token)
			.push_address(&self.to)
			.push_u256(self.value)
			.push_u256(self.fee)
			.push_bytes(&self.data)
			.push_u256(self.nonce);
		if let Some(marker) = &self.legacy_marker {
			enc.push_bytes(marker);
		}
		enc.finish()
	}
}

/// A signed grant or revocation of operator rights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorAuthorization {
	pub token: Address,
	pub operator: Address,
	/// Must equal the signer's sequential counter.
	pub nonce: U256,
	pub action: OperatorAction,
}

impl CanonicalMessage for OperatorAuthorization {
	fn encode(&self) -> Vec<u8> {
		let mut enc = PackedEncoder::new();
		enc.push_address(&self.token)
			.push_address(&self.operator)
			.push_u256(self.nonce)
			.push_u8(self.action.flag());
		enc.finish()
	}
}

/// Any payload the relay accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignedPayload {
	ChannelWithdrawal(ChannelWithdrawal),
	PreSignedTransfer(PreSignedTransfer),
	Cheque(Cheque),
	OperatorAuth(OperatorAuthorization),
}

impl CanonicalMessage for SignedPayload {
	fn encode(&self) -> Vec<u8> {
		match self {
			SignedPayload::ChannelWithdrawal(p) => p.encode(),
			SignedPayload::PreSignedTransfer(p) => p.encode(),
			SignedPayload::Cheque(p) => p.encode(),
			SignedPayload::OperatorAuth(p) => p.encode(),
		}
	}
}

impl From<ChannelWithdrawal> for SignedPayload {
	fn from(p: ChannelWithdrawal) -> Self {
		SignedPayload::ChannelWithdrawal(p)
	}
}

impl From<PreSignedTransfer> for SignedPayload {
	fn from(p: PreSignedTransfer) -> Self {
		SignedPayload::PreSignedTransfer(p)
	}
}

impl From<Cheque> for SignedPayload {
	fn from(p: Cheque) -> Self {
		SignedPayload::Cheque(p)
	}
}

impl From<OperatorAuthorization> for SignedPayload {
	fn from(p: OperatorAuthorization) -> Self {
		SignedPayload::OperatorAuth(p)
	}
}
