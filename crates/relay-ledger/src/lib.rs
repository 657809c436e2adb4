//! Token ledger module for the signed-authorization relay.
//!
//! The relay components never hold balances themselves. They move value
//! through a token ledger collaborator reached over the narrow interface
//! defined here: balance queries, atomic transfer batches with an optional
//! receive notification for contract recipients, the operator relation, and
//! supply changes.

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use relay_types::ImplementationRegistry;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during token ledger operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
	/// The source account cannot cover a transfer leg or burn.
	#[error("Insufficient balance for {account}: required {required}, available {available}")]
	InsufficientBalance {
		account: Address,
		required: U256,
		available: U256,
	},
	/// A strict send targets a contract that cannot be notified.
	#[error("Recipient {0} is a contract without a token receiver")]
	IncompatibleRecipient(Address),
	/// The operator named on a leg is not authorized by the owner.
	#[error("{operator} is not an operator for {owner}")]
	OperatorNotAuthorized { operator: Address, owner: Address },
	/// A recipient's receive hook rejected the notification.
	#[error("Receiver {recipient} rejected the transfer: {reason}")]
	ReceiverRejected { recipient: Address, reason: String },
	/// Value cannot be sent to or minted for the zero address.
	#[error("Zero address is not a valid recipient")]
	ZeroAddress,
	/// A balance or the total supply would exceed 2^256 - 1.
	#[error("Arithmetic overflow")]
	Overflow,
	/// Error that occurs when an implementation's configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// Implementation-specific failure.
	#[error("Ledger error: {0}")]
	Implementation(String),
}

/// Receive-notification capability of a contract identity.
///
/// Invoked while the enclosing batch is still staged; returning an error
/// aborts the whole batch.
pub trait TokenReceiver: Send + Sync {
	fn tokens_received(
		&self,
		operator: Address,
		from: Address,
		to: Address,
		amount: U256,
		data: &[u8],
	) -> Result<(), String>;
}

/// What the ledger knows about a recipient identity.
#[derive(Clone)]
pub enum ReceiverCapability {
	/// A plain account; never notified.
	Account,
	/// A contract, with its receiver if it has one.
	Contract(Option<Arc<dyn TokenReceiver>>),
}

impl ReceiverCapability {
	/// Returns the receiver to notify, if any.
	pub fn receiver(&self) -> Option<&Arc<dyn TokenReceiver>> {
		match self {
			ReceiverCapability::Contract(Some(receiver)) => Some(receiver),
			_ => None,
		}
	}

	/// True for contracts that cannot be notified.
	pub fn is_incompatible(&self) -> bool {
		matches!(self, ReceiverCapability::Contract(None))
	}
}

impl fmt::Debug for ReceiverCapability {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ReceiverCapability::Account => write!(f, "Account"),
			ReceiverCapability::Contract(None) => write!(f, "Contract(None)"),
			ReceiverCapability::Contract(Some(_)) => write!(f, "Contract(Some(<receiver>))"),
		}
	}
}

/// How a transfer leg treats contract recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
	/// Contract recipients must have a receiver, which is notified.
	Send,
	/// Notify when a receiver exists, otherwise move the balance plainly.
	Transfer,
}

/// One balance movement inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLeg {
	pub from: Address,
	pub to: Address,
	pub amount: U256,
	/// Identity moving `from`'s funds, if not `from` itself.
	pub operator: Option<Address>,
	pub mode: TransferMode,
	/// Forwarded to the recipient's receive hook.
	pub data: Bytes,
}

impl TransferLeg {
	/// A compatible-mode leg moved by the owner.
	pub fn new(from: Address, to: Address, amount: U256) -> Self {
		Self {
			from,
			to,
			amount,
			operator: None,
			mode: TransferMode::Transfer,
			data: Bytes::new(),
		}
	}

	pub fn with_operator(mut self, operator: Address) -> Self {
		self.operator = Some(operator);
		self
	}

	pub fn with_mode(mut self, mode: TransferMode) -> Self {
		self.mode = mode;
		self
	}

	pub fn with_data(mut self, data: Bytes) -> Self {
		self.data = data;
		self
	}

	/// Identity reported to receive hooks as the mover of funds.
	pub fn effective_operator(&self) -> Address {
		self.operator.unwrap_or(self.from)
	}
}

/// Trait defining the interface for token ledger collaborators.
///
/// Implementations must apply `transfer_batch` atomically: either every leg
/// and every receive notification succeeds and all balances change, or no
/// balance changes at all.
#[async_trait]
pub trait TokenLedger: Send + Sync {
	/// Identity of the token, bound into pre-signed transfer and cheque messages.
	fn address(&self) -> Address;

	async fn balance_of(&self, account: Address) -> Result<U256, LedgerError>;

	async fn total_supply(&self) -> Result<U256, LedgerError>;

	/// Moves `amount` from `from` to `to`, notifying receivers when present.
	async fn transfer(&self, from: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
		self.transfer_batch(&[TransferLeg::new(from, to, amount)])
			.await
	}

	/// Applies every leg in order, all or nothing.
	async fn transfer_batch(&self, legs: &[TransferLeg]) -> Result<(), LedgerError>;

	/// True when `operator` may move `owner`'s funds. Owners are always
	/// operators for themselves.
	async fn is_operator_for(&self, operator: Address, owner: Address) -> Result<bool, LedgerError>;

	async fn set_operator_authorization(
		&self,
		owner: Address,
		operator: Address,
		authorized: bool,
	) -> Result<(), LedgerError>;

	async fn receiver_capability(&self, account: Address) -> Result<ReceiverCapability, LedgerError>;

	async fn mint(&self, to: Address, amount: U256) -> Result<(), LedgerError>;

	async fn burn(&self, from: Address, amount: U256) -> Result<(), LedgerError>;
}

/// Type alias for ledger factory functions.
pub type LedgerFactory = fn(&toml::Value) -> Result<Box<dyn TokenLedger>, LedgerError>;

/// Registry trait for ledger implementations.
pub trait LedgerRegistry: ImplementationRegistry<Factory = LedgerFactory> {}

/// Get all registered ledger implementations.
pub fn get_all_implementations() -> Vec<(&'static str, LedgerFactory)> {
	use implementations::memory;

	vec![(memory::Registry::NAME, memory::Registry::factory())]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_leg_builders() {
		let from = Address::repeat_byte(1);
		let leg = TransferLeg::new(from, Address::repeat_byte(2), U256::from(3));
		assert_eq!(leg.mode, TransferMode::Transfer);
		assert_eq!(leg.effective_operator(), from);

		let operator = Address::repeat_byte(9);
		let leg = leg
			.with_operator(operator)
			.with_mode(TransferMode::Send)
			.with_data(Bytes::from_static(b"hi"));
		assert_eq!(leg.effective_operator(), operator);
		assert_eq!(leg.mode, TransferMode::Send);
		assert_eq!(leg.data.as_ref(), b"hi");
	}

	#[test]
	fn test_receiver_capability_helpers() {
		assert!(ReceiverCapability::Contract(None).is_incompatible());
		assert!(!ReceiverCapability::Account.is_incompatible());
		assert!(ReceiverCapability::Account.receiver().is_none());
	}

	#[test]
	fn test_registered_implementations() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["memory"]);
	}
}
