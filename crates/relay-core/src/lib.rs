//! Core settlement engine for the signed-authorization relay.
//!
//! This module ties the relay together: the payment channel ledger that
//! redeems cumulative channel signatures, the meta-transfer executor that
//! redeems one-shot signed payloads, the nonce bookkeeping both rely on, and
//! the builder that assembles them from configuration around a shared token
//! ledger, signature service and event bus.

use relay_config::Config;
use relay_ledger::{LedgerError, TokenLedger};
use relay_signature::SignatureError;
use relay_types::{Address, ChannelId, OperatorAction, SettlementEvent, U256};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

pub mod builder;
pub mod channel;
pub mod event_bus;
pub mod executor;
pub mod nonce;

#[cfg(test)]
pub(crate) mod test_utils;

pub use builder::{BuilderError, RelayBuilder, RelayFactories};
pub use channel::PaymentChannelLedger;
pub use event_bus::EventBus;
pub use executor::{ChequeSubmission, MetaTransferExecutor, OperatorSubmission};
pub use nonce::NonceRegistry;

/// Errors returned by channel and meta-transfer operations.
///
/// Every error aborts the whole operation: no nonce is consumed, no channel
/// counter moves and no balance changes.
#[derive(Debug, Error)]
pub enum AuthorizationError {
	/// The signature is malformed or recovers no valid identity.
	#[error("Invalid signature: {0}")]
	InvalidSignature(#[from] SignatureError),
	/// The recovered identity is not the one entitled to authorize.
	#[error("Signer {recovered} is not the expected {expected}")]
	UnauthorizedSigner { expected: Address, recovered: Address },
	#[error("Channel {0} already exists")]
	ChannelAlreadyExists(ChannelId),
	#[error("Channel {0} not found")]
	ChannelNotFound(ChannelId),
	/// The claimed total does not exceed what was already withdrawn.
	#[error("Cumulative value {claimed} does not exceed withdrawn {withdrawn}")]
	StaleOrEqualCumulativeValue { claimed: U256, withdrawn: U256 },
	#[error("Nonce mismatch: expected {expected}, got {supplied}")]
	NonceMismatch { expected: U256, supplied: U256 },
	#[error("Nonce {nonce} already used by {signer}")]
	NonceAlreadyUsed { signer: Address, nonce: U256 },
	/// The signed action flag disagrees with the entrypoint.
	#[error("Payload signed for {} submitted to {}", .signed.as_str(), .expected.as_str())]
	ActionMismatch {
		expected: OperatorAction,
		signed: OperatorAction,
	},
	/// A transfer or cheque with zero value and zero fee.
	#[error("Authorization moves no value")]
	EmptyAuthorization,
	#[error("Recipient {0} cannot receive token notifications")]
	IncompatibleRecipient(Address),
	#[error("Insufficient balance for {account}: required {required}, available {available}")]
	InsufficientBalance {
		account: Address,
		required: U256,
		available: U256,
	},
	/// Any other ledger failure.
	#[error("Ledger error: {0}")]
	Ledger(LedgerError),
}

impl From<LedgerError> for AuthorizationError {
	fn from(err: LedgerError) -> Self {
		match err {
			LedgerError::InsufficientBalance {
				account,
				required,
				available,
			} => AuthorizationError::InsufficientBalance {
				account,
				required,
				available,
			},
			LedgerError::IncompatibleRecipient(recipient) => {
				AuthorizationError::IncompatibleRecipient(recipient)
			},
			other => AuthorizationError::Ledger(other),
		}
	}
}

/// Assembled relay: the components sharing one ledger and event bus.
pub struct RelayEngine {
	config: Config,
	ledger: Arc<dyn TokenLedger>,
	channels: Arc<PaymentChannelLedger>,
	executor: Arc<MetaTransferExecutor>,
	event_bus: EventBus,
}

impl RelayEngine {
	pub fn new(
		config: Config,
		ledger: Arc<dyn TokenLedger>,
		channels: Arc<PaymentChannelLedger>,
		executor: Arc<MetaTransferExecutor>,
		event_bus: EventBus,
	) -> Self {
		Self {
			config,
			ledger,
			channels,
			executor,
			event_bus,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Token ledger the components settle against.
	pub fn ledger(&self) -> &Arc<dyn TokenLedger> {
		&self.ledger
	}

	pub fn channels(&self) -> &Arc<PaymentChannelLedger> {
		&self.channels
	}

	pub fn executor(&self) -> &Arc<MetaTransferExecutor> {
		&self.executor
	}

	/// Subscribes to settlement events from every component.
	pub fn subscribe(&self) -> broadcast::Receiver<SettlementEvent> {
		self.event_bus.subscribe()
	}
}
