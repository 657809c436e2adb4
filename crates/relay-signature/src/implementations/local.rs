//! Local private key signer.
//!
//! Signs payload hashes with an in-memory secp256k1 key. Used by clients that
//! produce authorizations off the critical path and by tests that need real
//! signatures.

use crate::{PayloadSigner, SignatureError};
use alloy_primitives::{Address, Bytes, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use relay_types::SecretString;

/// Signer backed by a local private key.
#[derive(Debug, Clone)]
pub struct LocalSigner {
	signer: PrivateKeySigner,
}

impl LocalSigner {
	/// Creates a signer from a hex private key held in a secret.
	pub fn from_secret(private_key: &SecretString) -> Result<Self, SignatureError> {
		let signer = private_key.with_exposed(|key| {
			key.parse::<PrivateKeySigner>()
				.map_err(|e| SignatureError::InvalidKey(format!("Invalid private key: {}", e)))
		})?;
		Ok(Self { signer })
	}

	/// Creates a signer from a hex private key string.
	pub fn from_key_str(private_key: &str) -> Result<Self, SignatureError> {
		Self::from_secret(&SecretString::from(private_key))
	}

	/// Creates a signer with a freshly generated key.
	pub fn random() -> Self {
		Self {
			signer: PrivateKeySigner::random(),
		}
	}
}

#[async_trait]
impl PayloadSigner for LocalSigner {
	fn address(&self) -> Address {
		alloy_signer::Signer::address(&self.signer)
	}

	async fn sign_hash(&self, hash: &B256) -> Result<Bytes, SignatureError> {
		let signature = self
			.signer
			.sign_hash_sync(hash)
			.map_err(|e| SignatureError::SigningFailed(e.to_string()))?;
		// r || s || v with v in {27, 28}
		Ok(Bytes::copy_from_slice(&signature.as_bytes()))
	}
}
