//! Signature module for the signed-authorization relay.
//!
//! This module provides the two sides of off-path authorization: recovering
//! the identity that signed a canonical message, and producing such
//! signatures for clients and tests. Both sides hash messages the same way
//! (keccak-256 of the packed payload, wrapped with the personal-message
//! prefix), so a payload signed here verifies in every relay component.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use relay_types::{CanonicalMessage, ImplementationRegistry, SignedPayload};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod ecdsa;
	#[cfg(any(test, feature = "testing"))]
	pub mod fake;
	pub mod local;
}

/// Errors that can occur during signature recovery or signing.
#[derive(Debug, Error)]
pub enum SignatureError {
	/// The signature bytes cannot be interpreted.
	#[error("Malformed signature: {0}")]
	Malformed(String),
	/// Recovery succeeded but produced the zero address.
	#[error("Signature recovers to the zero address")]
	ZeroAddress,
	/// The curve arithmetic rejected the signature.
	#[error("Recovery failed: {0}")]
	Recovery(String),
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a signing key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when an implementation's configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Capability that recovers the signer of a message hash.
///
/// Implementations must be deterministic: the same hash and signature always
/// recover the same identity, and any failure is reported as an error rather
/// than a default identity.
pub trait SignatureVerifier: Send + Sync {
	/// Recovers the identity that signed `hash`.
	fn recover(&self, hash: &B256, signature: &[u8]) -> Result<Address, SignatureError>;
}

/// Trait for parties that sign payloads off the critical path.
#[async_trait]
pub trait PayloadSigner: Send + Sync {
	/// Returns the identity signatures from this signer recover to.
	fn address(&self) -> Address;

	/// Signs an already prefixed 32-byte hash.
	async fn sign_hash(&self, hash: &B256) -> Result<Bytes, SignatureError>;

	/// Signs a payload the way the relay components verify it.
	async fn sign_payload(&self, payload: &SignedPayload) -> Result<Bytes, SignatureError> {
		self.sign_hash(&payload.signing_hash()).await
	}
}

/// Type alias for verifier factory functions.
pub type VerifierFactory = fn(&toml::Value) -> Result<Box<dyn SignatureVerifier>, SignatureError>;

/// Registry trait for verifier implementations.
pub trait VerifierRegistry: ImplementationRegistry<Factory = VerifierFactory> {}

/// Returns every verifier implementation that can be selected by name.
pub fn get_all_implementations() -> Vec<(&'static str, VerifierFactory)> {
	use implementations::ecdsa;

	#[allow(unused_mut)]
	let mut implementations = vec![(ecdsa::Registry::NAME, ecdsa::Registry::factory())];

	#[cfg(any(test, feature = "testing"))]
	{
		use implementations::fake;
		implementations.push((fake::Registry::NAME, fake::Registry::factory()));
	}

	implementations
}

/// Service that recovers payload signers.
///
/// Wraps a verifier implementation and derives the signed hash from the
/// payload itself, so callers never hash messages by hand.
pub struct SignatureService {
	verifier: Box<dyn SignatureVerifier>,
}

impl SignatureService {
	pub fn new(verifier: Box<dyn SignatureVerifier>) -> Self {
		Self { verifier }
	}

	/// Recovers the signer of a canonical message.
	pub fn recover_signer<M>(&self, message: &M, signature: &[u8]) -> Result<Address, SignatureError>
	where
		M: CanonicalMessage,
	{
		let hash = message.signing_hash();
		let signer = self.verifier.recover(&hash, signature)?;
		tracing::debug!(hash = %hash, signer = %signer, "Recovered signer");
		Ok(signer)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::fake::{FakeSigner, FakeVerifier};
	use relay_types::{OperatorAction, OperatorAuthorization, U256};

	#[tokio::test]
	async fn test_service_recovers_payload_signer() {
		let signer = FakeSigner::new(Address::repeat_byte(0x42));
		let payload = OperatorAuthorization {
			token: Address::repeat_byte(0x01),
			operator: Address::repeat_byte(0x02),
			nonce: U256::ZERO,
			action: OperatorAction::Authorize,
		};
		let signature = signer
			.sign_payload(&SignedPayload::from(payload.clone()))
			.await
			.unwrap();

		let service = SignatureService::new(Box::new(FakeVerifier));
		let recovered = service.recover_signer(&payload, &signature).unwrap();
		assert_eq!(recovered, signer.address());
	}

	#[test]
	fn test_registered_implementations() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert!(names.contains(&"ecdsa"));
		assert!(names.contains(&"fake"));
	}
}
