//! Deterministic signature scheme for tests.
//!
//! A fake signature is `signer(20) || hash(32)`. The verifier returns the
//! embedded signer when the embedded hash matches the hash being verified.
//! Otherwise it returns an identity derived from both, the way secp256k1
//! recovery over different bytes yields an unrelated address instead of an
//! error. Tests can sign for arbitrary identities without private keys.

use crate::{
	PayloadSigner, SignatureError, SignatureVerifier, VerifierFactory, VerifierRegistry,
};
use alloy_primitives::{keccak256, Address, Bytes, B256};
use async_trait::async_trait;
use relay_types::ImplementationRegistry;

const FAKE_SIGNATURE_LENGTH: usize = 52;

/// Verifier for fake signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeVerifier;

impl SignatureVerifier for FakeVerifier {
	fn recover(&self, hash: &B256, signature: &[u8]) -> Result<Address, SignatureError> {
		if signature.len() != FAKE_SIGNATURE_LENGTH {
			return Err(SignatureError::Malformed(format!(
				"expected {} bytes, got {}",
				FAKE_SIGNATURE_LENGTH,
				signature.len()
			)));
		}
		let signer = if &signature[20..] == hash.as_slice() {
			Address::from_slice(&signature[..20])
		} else {
			let mut preimage = hash.to_vec();
			preimage.extend_from_slice(signature);
			Address::from_word(keccak256(preimage))
		};
		if signer == Address::ZERO {
			return Err(SignatureError::ZeroAddress);
		}
		Ok(signer)
	}
}

/// Signer producing fake signatures for any identity.
#[derive(Debug, Clone, Copy)]
pub struct FakeSigner {
	address: Address,
}

impl FakeSigner {
	pub fn new(address: Address) -> Self {
		Self { address }
	}
}

#[async_trait]
impl PayloadSigner for FakeSigner {
	fn address(&self) -> Address {
		self.address
	}

	async fn sign_hash(&self, hash: &B256) -> Result<Bytes, SignatureError> {
		let mut signature = Vec::with_capacity(FAKE_SIGNATURE_LENGTH);
		signature.extend_from_slice(self.address.as_slice());
		signature.extend_from_slice(hash.as_slice());
		Ok(signature.into())
	}
}

pub fn create_verifier(
	_config: &toml::Value,
) -> Result<Box<dyn SignatureVerifier>, SignatureError> {
	Ok(Box::new(FakeVerifier))
}

/// Registry for the fake verifier implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "fake";
	type Factory = VerifierFactory;

	fn factory() -> Self::Factory {
		create_verifier
	}
}

impl VerifierRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_hash_mismatch_recovers_someone_else() {
		let signer = FakeSigner::new(Address::repeat_byte(0x07));
		let hash = B256::repeat_byte(0x01);
		let signature = signer.sign_hash(&hash).await.unwrap();

		assert_eq!(FakeVerifier.recover(&hash, &signature).unwrap(), signer.address());

		let other = B256::repeat_byte(0x02);
		let stranger = FakeVerifier.recover(&other, &signature).unwrap();
		assert_ne!(stranger, signer.address());
		assert_ne!(stranger, Address::ZERO);
		assert_eq!(FakeVerifier.recover(&other, &signature).unwrap(), stranger);
	}

	#[tokio::test]
	async fn test_zero_signer_rejected() {
		let signer = FakeSigner::new(Address::ZERO);
		let hash = B256::repeat_byte(0x01);
		let signature = signer.sign_hash(&hash).await.unwrap();
		assert!(matches!(
			FakeVerifier.recover(&hash, &signature),
			Err(SignatureError::ZeroAddress)
		));
	}
}
