//! In-memory token ledger implementation.
//!
//! This module provides a memory-based implementation of the TokenLedger
//! trait. It is the default collaborator for the relay and for tests: it keeps
//! balances, the operator relation and the contract registry in maps behind a
//! single read-write lock, and applies transfer batches by staging every
//! balance change before committing any of them.

use crate::{
	LedgerError, LedgerFactory, LedgerRegistry, ReceiverCapability, TokenLedger, TokenReceiver,
	TransferLeg, TransferMode,
};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use relay_types::ImplementationRegistry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
	balances: HashMap<Address, U256>,
	total_supply: U256,
	/// (owner, operator) pairs.
	operators: HashSet<(Address, Address)>,
	contracts: HashMap<Address, Option<Arc<dyn TokenReceiver>>>,
}

impl LedgerState {
	fn balance(&self, account: &Address) -> U256 {
		self.balances.get(account).copied().unwrap_or_default()
	}

	fn is_operator_for(&self, operator: Address, owner: Address) -> bool {
		operator == owner || self.operators.contains(&(owner, operator))
	}

	fn capability(&self, account: &Address) -> ReceiverCapability {
		match self.contracts.get(account) {
			None => ReceiverCapability::Account,
			Some(receiver) => ReceiverCapability::Contract(receiver.clone()),
		}
	}
}

/// In-memory token ledger.
pub struct MemoryLedger {
	/// Token identity.
	address: Address,
	state: Arc<RwLock<LedgerState>>,
}

impl MemoryLedger {
	/// Creates an empty ledger for the given token identity.
	pub fn new(address: Address) -> Self {
		Self {
			address,
			state: Arc::new(RwLock::new(LedgerState::default())),
		}
	}

	/// Marks `account` as a contract, optionally able to receive notifications.
	pub async fn register_contract(
		&self,
		account: Address,
		receiver: Option<Arc<dyn TokenReceiver>>,
	) {
		let mut state = self.state.write().await;
		state.contracts.insert(account, receiver);
	}
}

#[async_trait]
impl TokenLedger for MemoryLedger {
	fn address(&self) -> Address {
		self.address
	}

	async fn balance_of(&self, account: Address) -> Result<U256, LedgerError> {
		let state = self.state.read().await;
		Ok(state.balance(&account))
	}

	async fn total_supply(&self) -> Result<U256, LedgerError> {
		let state = self.state.read().await;
		Ok(state.total_supply)
	}

	async fn transfer_batch(&self, legs: &[TransferLeg]) -> Result<(), LedgerError> {
		let mut state = self.state.write().await;
		let mut staged: HashMap<Address, U256> = HashMap::new();
		let mut notifications = Vec::new();

		for leg in legs {
			if leg.to == Address::ZERO {
				return Err(LedgerError::ZeroAddress);
			}
			if let Some(operator) = leg.operator {
				if !state.is_operator_for(operator, leg.from) {
					return Err(LedgerError::OperatorNotAuthorized {
						operator,
						owner: leg.from,
					});
				}
			}

			let capability = state.capability(&leg.to);
			if leg.mode == TransferMode::Send && capability.is_incompatible() {
				return Err(LedgerError::IncompatibleRecipient(leg.to));
			}

			let available = staged
				.get(&leg.from)
				.copied()
				.unwrap_or_else(|| state.balance(&leg.from));
			let remaining =
				available
					.checked_sub(leg.amount)
					.ok_or(LedgerError::InsufficientBalance {
						account: leg.from,
						required: leg.amount,
						available,
					})?;
			staged.insert(leg.from, remaining);

			let credited = staged
				.get(&leg.to)
				.copied()
				.unwrap_or_else(|| state.balance(&leg.to))
				.checked_add(leg.amount)
				.ok_or(LedgerError::Overflow)?;
			staged.insert(leg.to, credited);

			if let Some(receiver) = capability.receiver() {
				notifications.push((receiver.clone(), leg));
			}
		}

		for (receiver, leg) in notifications {
			receiver
				.tokens_received(
					leg.effective_operator(),
					leg.from,
					leg.to,
					leg.amount,
					&leg.data,
				)
				.map_err(|reason| LedgerError::ReceiverRejected {
					recipient: leg.to,
					reason,
				})?;
		}

		state.balances.extend(staged);
		tracing::debug!(token = %self.address, legs = legs.len(), "Applied transfer batch");
		Ok(())
	}

	async fn is_operator_for(&self, operator: Address, owner: Address) -> Result<bool, LedgerError> {
		let state = self.state.read().await;
		Ok(state.is_operator_for(operator, owner))
	}

	async fn set_operator_authorization(
		&self,
		owner: Address,
		operator: Address,
		authorized: bool,
	) -> Result<(), LedgerError> {
		let mut state = self.state.write().await;
		if authorized {
			state.operators.insert((owner, operator));
		} else {
			state.operators.remove(&(owner, operator));
		}
		tracing::debug!(%owner, %operator, authorized, "Updated operator relation");
		Ok(())
	}

	async fn receiver_capability(&self, account: Address) -> Result<ReceiverCapability, LedgerError> {
		let state = self.state.read().await;
		Ok(state.capability(&account))
	}

	async fn mint(&self, to: Address, amount: U256) -> Result<(), LedgerError> {
		if to == Address::ZERO {
			return Err(LedgerError::ZeroAddress);
		}
		let mut state = self.state.write().await;
		let supply = state
			.total_supply
			.checked_add(amount)
			.ok_or(LedgerError::Overflow)?;
		// balance <= supply, so this cannot overflow once supply did not
		let balance = state.balance(&to) + amount;
		state.total_supply = supply;
		state.balances.insert(to, balance);
		Ok(())
	}

	async fn burn(&self, from: Address, amount: U256) -> Result<(), LedgerError> {
		let mut state = self.state.write().await;
		let available = state.balance(&from);
		let remaining = available
			.checked_sub(amount)
			.ok_or(LedgerError::InsufficientBalance {
				account: from,
				required: amount,
				available,
			})?;
		state.balances.insert(from, remaining);
		state.total_supply -= amount;
		Ok(())
	}
}

/// Factory function to create an in-memory ledger from configuration.
///
/// Configuration parameters:
/// - `address`: token identity bound into signed transfer messages
pub fn create_ledger(config: &toml::Value) -> Result<Box<dyn TokenLedger>, LedgerError> {
	let address = config
		.get("address")
		.and_then(|v| v.as_str())
		.ok_or_else(|| LedgerError::Configuration("'address' is required".into()))?
		.parse::<Address>()
		.map_err(|e| LedgerError::Configuration(format!("Invalid address: {}", e)))?;

	Ok(Box::new(MemoryLedger::new(address)))
}

/// Registry for the in-memory ledger implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = LedgerFactory;

	fn factory() -> Self::Factory {
		create_ledger
	}
}

impl LedgerRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::Bytes;
	use std::sync::Mutex;

	type Notification = (Address, Address, Address, U256, Vec<u8>);

	#[derive(Default)]
	struct RecordingReceiver {
		received: Mutex<Vec<Notification>>,
		reject: bool,
	}

	impl TokenReceiver for RecordingReceiver {
		fn tokens_received(
			&self,
			operator: Address,
			from: Address,
			to: Address,
			amount: U256,
			data: &[u8],
		) -> Result<(), String> {
			if self.reject {
				return Err("not accepting".into());
			}
			self.received
				.lock()
				.unwrap()
				.push((operator, from, to, amount, data.to_vec()));
			Ok(())
		}
	}

	fn alice() -> Address {
		Address::repeat_byte(0xa1)
	}

	fn bob() -> Address {
		Address::repeat_byte(0xb0)
	}

	async fn funded_ledger() -> MemoryLedger {
		let ledger = MemoryLedger::new(Address::repeat_byte(0x70));
		ledger.mint(alice(), U256::from(100)).await.unwrap();
		ledger
	}

	#[tokio::test]
	async fn test_mint_burn_and_supply() {
		let ledger = funded_ledger().await;
		assert_eq!(ledger.balance_of(alice()).await.unwrap(), U256::from(100));
		assert_eq!(ledger.total_supply().await.unwrap(), U256::from(100));

		ledger.burn(alice(), U256::from(40)).await.unwrap();
		assert_eq!(ledger.balance_of(alice()).await.unwrap(), U256::from(60));
		assert_eq!(ledger.total_supply().await.unwrap(), U256::from(60));

		let result = ledger.burn(alice(), U256::from(61)).await;
		assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
		assert!(matches!(
			ledger.mint(Address::ZERO, U256::from(1)).await,
			Err(LedgerError::ZeroAddress)
		));
	}

	#[tokio::test]
	async fn test_transfer() {
		let ledger = funded_ledger().await;
		ledger.transfer(alice(), bob(), U256::from(30)).await.unwrap();
		assert_eq!(ledger.balance_of(alice()).await.unwrap(), U256::from(70));
		assert_eq!(ledger.balance_of(bob()).await.unwrap(), U256::from(30));

		assert!(matches!(
			ledger.transfer(alice(), Address::ZERO, U256::from(1)).await,
			Err(LedgerError::ZeroAddress)
		));
	}

	#[tokio::test]
	async fn test_batch_is_atomic() {
		let ledger = funded_ledger().await;
		let carol = Address::repeat_byte(0xc0);

		// Second leg overdraws once the first is staged
		let legs = [
			TransferLeg::new(alice(), bob(), U256::from(60)),
			TransferLeg::new(alice(), carol, U256::from(50)),
		];
		let result = ledger.transfer_batch(&legs).await;
		assert_eq!(
			result,
			Err(LedgerError::InsufficientBalance {
				account: alice(),
				required: U256::from(50),
				available: U256::from(40),
			})
		);
		assert_eq!(ledger.balance_of(alice()).await.unwrap(), U256::from(100));
		assert_eq!(ledger.balance_of(bob()).await.unwrap(), U256::ZERO);
		assert_eq!(ledger.balance_of(carol).await.unwrap(), U256::ZERO);
	}

	#[tokio::test]
	async fn test_same_recipient_on_both_legs() {
		let ledger = funded_ledger().await;
		let legs = [
			TransferLeg::new(alice(), bob(), U256::from(10)),
			TransferLeg::new(alice(), bob(), U256::from(2)),
		];
		ledger.transfer_batch(&legs).await.unwrap();
		assert_eq!(ledger.balance_of(bob()).await.unwrap(), U256::from(12));
		assert_eq!(ledger.balance_of(alice()).await.unwrap(), U256::from(88));
	}

	#[tokio::test]
	async fn test_operator_legs() {
		let ledger = funded_ledger().await;
		let operator = Address::repeat_byte(0x0f);
		let leg = TransferLeg::new(alice(), bob(), U256::from(5)).with_operator(operator);

		assert!(ledger.is_operator_for(alice(), alice()).await.unwrap());
		assert!(!ledger.is_operator_for(operator, alice()).await.unwrap());
		assert_eq!(
			ledger.transfer_batch(&[leg.clone()]).await,
			Err(LedgerError::OperatorNotAuthorized {
				operator,
				owner: alice(),
			})
		);

		ledger
			.set_operator_authorization(alice(), operator, true)
			.await
			.unwrap();
		ledger.transfer_batch(&[leg.clone()]).await.unwrap();
		assert_eq!(ledger.balance_of(bob()).await.unwrap(), U256::from(5));

		ledger
			.set_operator_authorization(alice(), operator, false)
			.await
			.unwrap();
		assert!(ledger.transfer_batch(&[leg]).await.is_err());
	}

	#[tokio::test]
	async fn test_send_mode_requires_receiver() {
		let ledger = funded_ledger().await;
		let contract = Address::repeat_byte(0xcc);
		ledger.register_contract(contract, None).await;

		let leg = TransferLeg::new(alice(), contract, U256::from(5));
		assert_eq!(
			ledger
				.transfer_batch(&[leg.clone().with_mode(TransferMode::Send)])
				.await,
			Err(LedgerError::IncompatibleRecipient(contract))
		);
		assert_eq!(ledger.balance_of(contract).await.unwrap(), U256::ZERO);

		ledger.transfer_batch(&[leg]).await.unwrap();
		assert_eq!(ledger.balance_of(contract).await.unwrap(), U256::from(5));
	}

	#[tokio::test]
	async fn test_receiver_notified_with_data() {
		let ledger = funded_ledger().await;
		let contract = Address::repeat_byte(0xcc);
		let receiver = Arc::new(RecordingReceiver::default());
		ledger
			.register_contract(contract, Some(receiver.clone()))
			.await;

		let capability = ledger.receiver_capability(contract).await.unwrap();
		assert!(capability.receiver().is_some());

		let leg = TransferLeg::new(alice(), contract, U256::from(7))
			.with_mode(TransferMode::Send)
			.with_data(Bytes::from_static(b"invoice-42"));
		ledger.transfer_batch(&[leg]).await.unwrap();

		let received = receiver.received.lock().unwrap();
		assert_eq!(received.len(), 1);
		assert_eq!(
			received[0],
			(alice(), alice(), contract, U256::from(7), b"invoice-42".to_vec())
		);
	}

	#[tokio::test]
	async fn test_receiver_rejection_aborts_batch() {
		let ledger = funded_ledger().await;
		let contract = Address::repeat_byte(0xcc);
		let receiver = Arc::new(RecordingReceiver {
			reject: true,
			..Default::default()
		});
		ledger.register_contract(contract, Some(receiver)).await;

		let legs = [
			TransferLeg::new(alice(), bob(), U256::from(1)),
			TransferLeg::new(alice(), contract, U256::from(5)),
		];
		let result = ledger.transfer_batch(&legs).await;
		assert!(matches!(result, Err(LedgerError::ReceiverRejected { .. })));
		assert_eq!(ledger.balance_of(alice()).await.unwrap(), U256::from(100));
		assert_eq!(ledger.balance_of(bob()).await.unwrap(), U256::ZERO);
	}

	#[test]
	fn test_factory() {
		let config: toml::Value =
			toml::from_str("address = \"0x1000000000000000000000000000000000000001\"").unwrap();
		let ledger = create_ledger(&config).unwrap();
		assert_eq!(
			ledger.address(),
			"0x1000000000000000000000000000000000000001"
				.parse::<Address>()
				.unwrap()
		);

		let missing: toml::Value = toml::from_str("other = 1").unwrap();
		assert!(matches!(
			create_ledger(&missing),
			Err(LedgerError::Configuration(_))
		));
		let invalid: toml::Value = toml::from_str("address = \"0x12\"").unwrap();
		assert!(matches!(
			create_ledger(&invalid),
			Err(LedgerError::Configuration(_))
		));
	}
}
