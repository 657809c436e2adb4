//! Settlement events.
//!
//! Every successful state change is announced on the relay's event bus so
//! that indexers and relayers can follow channel balances and consumed
//! nonces without polling the components.

use crate::channel::ChannelId;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Events produced by the channel ledger and the meta-transfer executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SettlementEvent {
	/// A channel was opened.
	ChannelOpened {
		channel_id: ChannelId,
		beneficiary: Address,
		payer: Address,
	},
	/// A channel signature was redeemed.
	ChannelWithdrawn {
		channel_id: ChannelId,
		beneficiary: Address,
		payer: Address,
		/// Value moved by this redemption.
		amount: U256,
		/// Channel total after this redemption.
		cumulative_withdrawn: U256,
		caller: Address,
	},
	/// A pre-signed transfer was executed.
	PreSignedTransferred {
		signer: Address,
		to: Address,
		value: U256,
		fee: U256,
		nonce: U256,
		relayer: Address,
	},
	/// A cheque was redeemed.
	ChequeRedeemed {
		signer: Address,
		to: Address,
		value: U256,
		fee: U256,
		nonce: U256,
		relayer: Address,
		/// Whether the recipient's receive hook was invoked.
		notified: bool,
	},
	/// An operator was authorized through a signature.
	OperatorAuthorized {
		owner: Address,
		operator: Address,
		nonce: U256,
	},
	/// An operator was revoked through a signature.
	OperatorRevoked {
		owner: Address,
		operator: Address,
		nonce: U256,
	},
}
