//! Cumulative payment channel ledger.
//!
//! A payer signs ever-increasing totals owed to a channel's beneficiary. Any
//! caller holding the latest signature can redeem it; the ledger pays out only
//! the difference to what was already withdrawn and never lets the withdrawn
//! total decrease. Funds move straight from the payer's token balance, with
//! the channel ledger acting as the payer's authorized operator.

use crate::event_bus::EventBus;
use crate::AuthorizationError;
use relay_ledger::{TokenLedger, TransferLeg};
use relay_signature::SignatureService;
use relay_types::{
	truncate_id, Address, Bytes, Channel, ChannelId, ChannelWithdrawal, SettlementEvent, U256,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

pub struct PaymentChannelLedger {
	/// Identity bound into every withdrawal signature.
	address: Address,
	ledger: Arc<dyn TokenLedger>,
	signatures: Arc<SignatureService>,
	channels: Mutex<HashMap<ChannelId, Channel>>,
	/// Pay out at most the payer's balance instead of failing.
	cap_to_payer_balance: bool,
	event_bus: EventBus,
}

impl PaymentChannelLedger {
	pub fn new(
		address: Address,
		ledger: Arc<dyn TokenLedger>,
		signatures: Arc<SignatureService>,
		cap_to_payer_balance: bool,
		event_bus: EventBus,
	) -> Self {
		Self {
			address,
			ledger,
			signatures,
			channels: Mutex::new(HashMap::new()),
			cap_to_payer_balance,
			event_bus,
		}
	}

	pub fn address(&self) -> Address {
		self.address
	}

	/// Opens a channel. Ids can be used once; channels are never closed.
	#[instrument(skip_all, fields(channel_id = %truncate_id(&channel_id.to_string())))]
	pub async fn open_channel(
		&self,
		channel_id: ChannelId,
		beneficiary: Address,
		payer: Address,
		data: Bytes,
	) -> Result<(), AuthorizationError> {
		let mut channels = self.channels.lock().await;
		if channels.contains_key(&channel_id) {
			tracing::warn!("Channel already exists");
			return Err(AuthorizationError::ChannelAlreadyExists(channel_id));
		}
		channels.insert(channel_id, Channel::open(beneficiary, payer, data));
		drop(channels);

		tracing::info!(%beneficiary, %payer, "Opened channel");
		self.event_bus
			.publish(SettlementEvent::ChannelOpened {
				channel_id,
				beneficiary,
				payer,
			})
			.ok();
		Ok(())
	}

	pub async fn get_channel(&self, channel_id: &ChannelId) -> Result<Channel, AuthorizationError> {
		let channels = self.channels.lock().await;
		channels
			.get(channel_id)
			.cloned()
			.ok_or(AuthorizationError::ChannelNotFound(*channel_id))
	}

	/// Redeems a payer signature over `claimed`, the channel's new cumulative
	/// total, and returns the value moved to the beneficiary.
	#[instrument(skip_all, fields(channel_id = %truncate_id(&channel_id.to_string()), claimed = %claimed))]
	pub async fn withdraw(
		&self,
		channel_id: ChannelId,
		claimed: U256,
		signature: &[u8],
		caller: Address,
	) -> Result<U256, AuthorizationError> {
		self.try_withdraw(channel_id, claimed, signature, caller)
			.await
			.inspect_err(|e| tracing::warn!(error = %e, "Rejected channel withdrawal"))
	}

	async fn try_withdraw(
		&self,
		channel_id: ChannelId,
		claimed: U256,
		signature: &[u8],
		caller: Address,
	) -> Result<U256, AuthorizationError> {
		let mut channels = self.channels.lock().await;
		let channel = channels
			.get_mut(&channel_id)
			.ok_or(AuthorizationError::ChannelNotFound(channel_id))?;

		let message = ChannelWithdrawal {
			ledger: self.address,
			channel_id,
			cumulative_value: claimed,
		};
		let signer = self.signatures.recover_signer(&message, signature)?;
		if signer != channel.payer {
			return Err(AuthorizationError::UnauthorizedSigner {
				expected: channel.payer,
				recovered: signer,
			});
		}

		let delta = channel.pending_delta(claimed).ok_or(
			AuthorizationError::StaleOrEqualCumulativeValue {
				claimed,
				withdrawn: channel.cumulative_withdrawn,
			},
		)?;

		let amount = if self.cap_to_payer_balance {
			let available = self.ledger.balance_of(channel.payer).await?;
			if available.is_zero() {
				return Err(AuthorizationError::InsufficientBalance {
					account: channel.payer,
					required: delta,
					available,
				});
			}
			delta.min(available)
		} else {
			delta
		};

		let leg = TransferLeg::new(channel.payer, channel.beneficiary, amount).with_operator(self.address);
		self.ledger.transfer_batch(&[leg]).await?;

		// amount <= delta, so the total stays within the claimed value
		channel.cumulative_withdrawn += amount;
		let event = SettlementEvent::ChannelWithdrawn {
			channel_id,
			beneficiary: channel.beneficiary,
			payer: channel.payer,
			amount,
			cumulative_withdrawn: channel.cumulative_withdrawn,
			caller,
		};
		tracing::info!(
			amount = %amount,
			cumulative_withdrawn = %channel.cumulative_withdrawn,
			%caller,
			"Redeemed channel signature"
		);
		drop(channels);

		self.event_bus.publish(event).ok();
		Ok(amount)
	}
}
