//! secp256k1 ECDSA signature recovery.
//!
//! Accepts 65-byte `r || s || v` signatures. The recovery byte is
//! canonicalized before use: wallets emit either 27/28 or 0/1, and both
//! encodings of the same signature must recover the same identity. Signatures
//! whose `s` lies in the upper half of the curve order are malleated copies of
//! a low-s signature and are rejected unless explicitly allowed.

use crate::{SignatureError, SignatureVerifier, VerifierFactory, VerifierRegistry};
use alloy_primitives::{uint, Address, PrimitiveSignature, B256, U256};
use relay_types::{ImplementationRegistry, SIGNATURE_LENGTH};

/// Half of the secp256k1 group order.
pub const SECP256K1N_HALF: U256 =
	uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

/// Maps a raw recovery byte onto the y-parity bit.
///
/// Values below 27 are shifted into the 27/28 range first, so 0 and 27 both
/// yield `false` and 1 and 28 both yield `true`. Anything else is invalid.
pub fn normalize_recovery_id(v: u8) -> Option<bool> {
	let v = if v < 27 { v + 27 } else { v };
	match v {
		27 => Some(false),
		28 => Some(true),
		_ => None,
	}
}

/// Recovers signers of personal-message hashes.
#[derive(Debug, Clone)]
pub struct EcdsaVerifier {
	reject_high_s: bool,
}

impl EcdsaVerifier {
	pub fn new(reject_high_s: bool) -> Self {
		Self { reject_high_s }
	}
}

impl Default for EcdsaVerifier {
	fn default() -> Self {
		Self::new(true)
	}
}

impl SignatureVerifier for EcdsaVerifier {
	fn recover(&self, hash: &B256, signature: &[u8]) -> Result<Address, SignatureError> {
		if signature.len() != SIGNATURE_LENGTH {
			return Err(SignatureError::Malformed(format!(
				"expected {} bytes, got {}",
				SIGNATURE_LENGTH,
				signature.len()
			)));
		}

		let r = U256::from_be_slice(&signature[..32]);
		let s = U256::from_be_slice(&signature[32..64]);
		let v = signature[64];
		let y_parity = normalize_recovery_id(v)
			.ok_or_else(|| SignatureError::Malformed(format!("invalid recovery id {}", v)))?;

		if self.reject_high_s && s > SECP256K1N_HALF {
			return Err(SignatureError::Malformed("s value in upper half of curve order".into()));
		}

		let address = PrimitiveSignature::new(r, s, y_parity)
			.recover_address_from_prehash(hash)
			.map_err(|e| SignatureError::Recovery(e.to_string()))?;

		if address == Address::ZERO {
			return Err(SignatureError::ZeroAddress);
		}

		Ok(address)
	}
}

/// Factory function to create an ECDSA verifier from configuration.
///
/// Configuration parameters:
/// - `reject_high_s` (optional, default true): reject upper-half `s` values
pub fn create_verifier(
	config: &toml::Value,
) -> Result<Box<dyn SignatureVerifier>, SignatureError> {
	let reject_high_s = match config.get("reject_high_s") {
		None => true,
		Some(value) => value.as_bool().ok_or_else(|| {
			SignatureError::Configuration("'reject_high_s' must be a boolean".into())
		})?,
	};

	Ok(Box::new(EcdsaVerifier::new(reject_high_s)))
}

/// Registry for the ECDSA verifier implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "ecdsa";
	type Factory = VerifierFactory;

	fn factory() -> Self::Factory {
		create_verifier
	}
}

impl VerifierRegistry for Registry {}
