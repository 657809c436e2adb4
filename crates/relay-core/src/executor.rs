//! Meta-transfer executor.
//!
//! Redeems one-shot signed payloads on behalf of their signers: pre-signed
//! transfers and cheques, which spend a one-time nonce and pay the submitting
//! relayer a fee, and operator authorizations, which advance the signer's
//! sequential nonce and flip the operator relation in the token ledger.
//!
//! Each operation runs under the executor's nonce lock. The signer is
//! recovered and every nonce and balance rule checked before the ledger is
//! asked to move value, and the nonce is consumed only after the ledger
//! applied the whole batch.

use crate::event_bus::EventBus;
use crate::nonce::NonceRegistry;
use crate::AuthorizationError;
use relay_ledger::{TokenLedger, TransferLeg, TransferMode};
use relay_signature::SignatureService;
use relay_types::{
	Address, Bytes, Cheque, OperatorAction, OperatorAuthorization, PreSignedTransfer,
	SettlementEvent, U256,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

/// Cheque fields supplied by a relayer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChequeSubmission {
	pub to: Address,
	pub value: U256,
	pub fee: U256,
	/// Forwarded to the recipient's receive hook.
	pub data: Bytes,
	pub nonce: U256,
	/// Whether the signer appended the legacy marker.
	pub legacy: bool,
}

/// Operator signature fields supplied by a relayer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSubmission {
	/// Account whose operator relation changes. Not part of the signed bytes.
	pub owner: Address,
	pub operator: Address,
	pub nonce: U256,
}

pub struct MetaTransferExecutor {
	ledger: Arc<dyn TokenLedger>,
	signatures: Arc<SignatureService>,
	nonces: Mutex<NonceRegistry>,
	legacy_marker: Bytes,
	event_bus: EventBus,
}

impl MetaTransferExecutor {
	pub fn new(
		ledger: Arc<dyn TokenLedger>,
		signatures: Arc<SignatureService>,
		legacy_marker: impl Into<Bytes>,
		event_bus: EventBus,
	) -> Self {
		Self {
			ledger,
			signatures,
			nonces: Mutex::new(NonceRegistry::new()),
			legacy_marker: legacy_marker.into(),
			event_bus,
		}
	}

	/// Next sequential nonce for operator authorizations by `signer`.
	pub async fn current_nonce(&self, signer: &Address) -> U256 {
		self.nonces.lock().await.current_nonce(signer)
	}

	/// Whether `signer` already spent the one-time `nonce`.
	pub async fn is_nonce_used(&self, signer: &Address, nonce: &U256) -> bool {
		self.nonces.lock().await.is_used(signer, nonce)
	}

	/// Executes a pre-signed transfer, paying `fee` to `relayer`.
	///
	/// Returns the recovered signer.
	#[instrument(skip_all, fields(to = %to, nonce = %nonce))]
	pub async fn pre_signed_transfer(
		&self,
		signature: &[u8],
		to: Address,
		value: U256,
		fee: U256,
		nonce: U256,
		relayer: Address,
	) -> Result<Address, AuthorizationError> {
		let message = PreSignedTransfer {
			token: self.ledger.address(),
			to,
			value,
			fee,
			nonce,
		};

		self.try_pre_signed_transfer(&message, signature, relayer)
			.await
			.inspect_err(|e| tracing::warn!(error = %e, "Rejected pre-signed transfer"))
	}

	async fn try_pre_signed_transfer(
		&self,
		message: &PreSignedTransfer,
		signature: &[u8],
		relayer: Address,
	) -> Result<Address, AuthorizationError> {
		// Zero value and fee would settle for any recovered identity
		if message.value.is_zero() && message.fee.is_zero() {
			return Err(AuthorizationError::EmptyAuthorization);
		}
		let signer = self.signatures.recover_signer(message, signature)?;

		let mut nonces = self.nonces.lock().await;
		nonces.check_once(&signer, message.nonce)?;
		self.ensure_balance(signer, message.value, message.fee)
			.await?;

		let legs = fee_legs(
			TransferLeg::new(signer, message.to, message.value),
			signer,
			relayer,
			message.fee,
		);
		self.ledger.transfer_batch(&legs).await?;
		nonces.consume_once(&signer, message.nonce)?;
		drop(nonces);

		tracing::info!(%signer, %relayer, value = %message.value, fee = %message.fee, "Executed pre-signed transfer");
		self.event_bus
			.publish(SettlementEvent::PreSignedTransferred {
				signer,
				to: message.to,
				value: message.value,
				fee: message.fee,
				nonce: message.nonce,
				relayer,
			})
			.ok();
		Ok(signer)
	}

	/// Redeems a cheque, requiring contract recipients to accept notifications.
	#[instrument(skip_all, fields(to = %cheque.to, nonce = %cheque.nonce))]
	pub async fn send_by_cheque(
		&self,
		cheque: &ChequeSubmission,
		signature: &[u8],
		relayer: Address,
	) -> Result<Address, AuthorizationError> {
		self.redeem_cheque(cheque, signature, relayer, TransferMode::Send)
			.await
			.inspect_err(|e| tracing::warn!(error = %e, "Rejected cheque send"))
	}

	/// Redeems a cheque, moving the balance plainly when the recipient cannot
	/// be notified.
	#[instrument(skip_all, fields(to = %cheque.to, nonce = %cheque.nonce))]
	pub async fn transfer_by_cheque(
		&self,
		cheque: &ChequeSubmission,
		signature: &[u8],
		relayer: Address,
	) -> Result<Address, AuthorizationError> {
		self.redeem_cheque(cheque, signature, relayer, TransferMode::Transfer)
			.await
			.inspect_err(|e| tracing::warn!(error = %e, "Rejected cheque transfer"))
	}

	async fn redeem_cheque(
		&self,
		cheque: &ChequeSubmission,
		signature: &[u8],
		relayer: Address,
		mode: TransferMode,
	) -> Result<Address, AuthorizationError> {
		if cheque.value.is_zero() && cheque.fee.is_zero() {
			return Err(AuthorizationError::EmptyAuthorization);
		}
		let message = Cheque {
			token: self.ledger.address(),
			to: cheque.to,
			value: cheque.value,
			fee: cheque.fee,
			data: cheque.data.clone(),
			nonce: cheque.nonce,
			legacy_marker: cheque.legacy.then(|| self.legacy_marker.clone()),
		};
		let signer = self.signatures.recover_signer(&message, signature)?;

		let mut nonces = self.nonces.lock().await;
		nonces.check_once(&signer, cheque.nonce)?;

		let capability = self.ledger.receiver_capability(cheque.to).await?;
		if mode == TransferMode::Send && capability.is_incompatible() {
			return Err(AuthorizationError::IncompatibleRecipient(cheque.to));
		}
		self.ensure_balance(signer, cheque.value, cheque.fee).await?;

		let value_leg = TransferLeg::new(signer, cheque.to, cheque.value)
			.with_mode(mode)
			.with_data(cheque.data.clone());
		let legs = fee_legs(value_leg, signer, relayer, cheque.fee);
		self.ledger.transfer_batch(&legs).await?;
		nonces.consume_once(&signer, cheque.nonce)?;
		drop(nonces);

		let notified = capability.receiver().is_some();
		tracing::info!(%signer, %relayer, value = %cheque.value, notified, "Redeemed cheque");
		self.event_bus
			.publish(SettlementEvent::ChequeRedeemed {
				signer,
				to: cheque.to,
				value: cheque.value,
				fee: cheque.fee,
				nonce: cheque.nonce,
				relayer,
				notified,
			})
			.ok();
		Ok(signer)
	}

	/// Grants the operator rights `submission.owner` signed.
	///
	/// Returns the owner, whose operator relation changed.
	#[instrument(skip_all, fields(owner = %submission.owner, operator = %submission.operator, nonce = %submission.nonce))]
	pub async fn authorize_operator_with_signature(
		&self,
		submission: &OperatorSubmission,
		signature: &[u8],
	) -> Result<Address, AuthorizationError> {
		self.apply_operator_signature(OperatorAction::Authorize, submission, signature)
			.await
			.inspect_err(|e| tracing::warn!(error = %e, "Rejected operator authorization"))
	}

	/// Revokes the operator rights `submission.owner` signed away.
	#[instrument(skip_all, fields(owner = %submission.owner, operator = %submission.operator, nonce = %submission.nonce))]
	pub async fn revoke_operator_with_signature(
		&self,
		submission: &OperatorSubmission,
		signature: &[u8],
	) -> Result<Address, AuthorizationError> {
		self.apply_operator_signature(OperatorAction::Revoke, submission, signature)
			.await
			.inspect_err(|e| tracing::warn!(error = %e, "Rejected operator revocation"))
	}

	async fn apply_operator_signature(
		&self,
		expected: OperatorAction,
		submission: &OperatorSubmission,
		signature: &[u8],
	) -> Result<Address, AuthorizationError> {
		let message = |action: OperatorAction| OperatorAuthorization {
			token: self.ledger.address(),
			operator: submission.operator,
			nonce: submission.nonce,
			action,
		};

		let recovered = self.signatures.recover_signer(&message(expected), signature)?;
		if recovered != submission.owner {
			// Recovers the owner only if signed for the other entrypoint
			let signed = expected.opposite();
			let under_opposite = self.signatures.recover_signer(&message(signed), signature).ok();
			if under_opposite == Some(submission.owner) {
				return Err(AuthorizationError::ActionMismatch { expected, signed });
			}
			return Err(AuthorizationError::UnauthorizedSigner {
				expected: submission.owner,
				recovered,
			});
		}
		let owner = submission.owner;

		let mut nonces = self.nonces.lock().await;
		nonces.check_sequential(&owner, submission.nonce)?;
		self.ledger
			.set_operator_authorization(
				owner,
				submission.operator,
				expected == OperatorAction::Authorize,
			)
			.await?;
		nonces.consume_sequential(&owner, submission.nonce)?;
		drop(nonces);

		tracing::info!(%owner, operator = %submission.operator, action = expected.as_str(), "Applied operator signature");
		let event = match expected {
			OperatorAction::Authorize => SettlementEvent::OperatorAuthorized {
				owner,
				operator: submission.operator,
				nonce: submission.nonce,
			},
			OperatorAction::Revoke => SettlementEvent::OperatorRevoked {
				owner,
				operator: submission.operator,
				nonce: submission.nonce,
			},
		};
		self.event_bus.publish(event).ok();
		Ok(owner)
	}

	/// Fails unless `signer` can cover `value + fee`.
	async fn ensure_balance(
		&self,
		signer: Address,
		value: U256,
		fee: U256,
	) -> Result<(), AuthorizationError> {
		let available = self.ledger.balance_of(signer).await?;
		let required = value.saturating_add(fee);
		if available < required {
			return Err(AuthorizationError::InsufficientBalance {
				account: signer,
				required,
				available,
			});
		}
		Ok(())
	}
}

/// Appends the relayer fee leg to a value leg. Zero fees add no leg.
fn fee_legs(value_leg: TransferLeg, signer: Address, relayer: Address, fee: U256) -> Vec<TransferLeg> {
	let mut legs = vec![value_leg];
	if !fee.is_zero() {
		legs.push(TransferLeg::new(signer, relayer, fee));
	}
	legs
}
