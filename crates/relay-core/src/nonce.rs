//! Per-signer replay protection.
//!
//! Two independent flavors are tracked for every signer:
//! - a sequential counter, starting at 0, that a payload must match exactly
//!   and that advances by one on every accepted payload;
//! - a set of consumed one-time nonces, which may be used in any order but
//!   never twice.
//!
//! The registry is plain data. Its owner serializes access and calls the
//! `check_*` methods before moving value and the `consume_*` methods only
//! after the move succeeded, so a failed operation never burns a nonce.

use crate::AuthorizationError;
use relay_types::{Address, U256};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct NonceRegistry {
	sequential: HashMap<Address, U256>,
	used: HashMap<Address, HashSet<U256>>,
}

impl NonceRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the nonce the signer's next sequential payload must carry.
	pub fn current_nonce(&self, signer: &Address) -> U256 {
		self.sequential.get(signer).copied().unwrap_or_default()
	}

	pub fn check_sequential(&self, signer: &Address, supplied: U256) -> Result<(), AuthorizationError> {
		let expected = self.current_nonce(signer);
		if supplied != expected {
			return Err(AuthorizationError::NonceMismatch { expected, supplied });
		}
		Ok(())
	}

	/// Accepts `supplied` if it equals the current counter and advances it.
	pub fn consume_sequential(
		&mut self,
		signer: &Address,
		supplied: U256,
	) -> Result<(), AuthorizationError> {
		self.check_sequential(signer, supplied)?;
		// An exhausted counter matches no further nonce
		let next = supplied
			.checked_add(U256::from(1))
			.ok_or(AuthorizationError::NonceMismatch {
				expected: supplied,
				supplied,
			})?;
		self.sequential.insert(*signer, next);
		Ok(())
	}

	pub fn is_used(&self, signer: &Address, nonce: &U256) -> bool {
		self.used
			.get(signer)
			.is_some_and(|nonces| nonces.contains(nonce))
	}

	pub fn check_once(&self, signer: &Address, nonce: U256) -> Result<(), AuthorizationError> {
		if self.is_used(signer, &nonce) {
			return Err(AuthorizationError::NonceAlreadyUsed {
				signer: *signer,
				nonce,
			});
		}
		Ok(())
	}

	/// Marks a one-time nonce as consumed.
	pub fn consume_once(&mut self, signer: &Address, nonce: U256) -> Result<(), AuthorizationError> {
		if !self.used.entry(*signer).or_default().insert(nonce) {
			return Err(AuthorizationError::NonceAlreadyUsed {
				signer: *signer,
				nonce,
			});
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn signer(byte: u8) -> Address {
		Address::repeat_byte(byte)
	}

	#[test]
	fn test_sequential_counter() {
		let mut nonces = NonceRegistry::new();
		let alice = signer(1);

		assert_eq!(nonces.current_nonce(&alice), U256::ZERO);
		assert!(matches!(
			nonces.consume_sequential(&alice, U256::from(1)),
			Err(AuthorizationError::NonceMismatch { .. })
		));

		nonces.consume_sequential(&alice, U256::ZERO).unwrap();
		assert_eq!(nonces.current_nonce(&alice), U256::from(1));

		let err = nonces.consume_sequential(&alice, U256::ZERO).unwrap_err();
		assert!(matches!(
			err,
			AuthorizationError::NonceMismatch { expected, supplied }
				if expected == U256::from(1) && supplied == U256::ZERO
		));

		nonces.consume_sequential(&alice, U256::from(1)).unwrap();
		assert_eq!(nonces.current_nonce(&alice), U256::from(2));
	}

	#[test]
	fn test_check_does_not_advance() {
		let nonces = NonceRegistry::new();
		nonces.check_sequential(&signer(1), U256::ZERO).unwrap();
		nonces.check_sequential(&signer(1), U256::ZERO).unwrap();
		assert_eq!(nonces.current_nonce(&signer(1)), U256::ZERO);
	}

	#[test]
	fn test_one_time_nonces_in_any_order() {
		let mut nonces = NonceRegistry::new();
		let alice = signer(1);

		nonces.consume_once(&alice, U256::from(42)).unwrap();
		nonces.consume_once(&alice, U256::from(7)).unwrap();
		assert!(nonces.is_used(&alice, &U256::from(42)));
		assert!(!nonces.is_used(&alice, &U256::ZERO));

		assert!(matches!(
			nonces.consume_once(&alice, U256::from(42)),
			Err(AuthorizationError::NonceAlreadyUsed { .. })
		));
		assert!(nonces.check_once(&alice, U256::from(7)).is_err());
		nonces.check_once(&alice, U256::from(8)).unwrap();
	}

	#[test]
	fn test_signers_are_independent() {
		let mut nonces = NonceRegistry::new();
		nonces.consume_once(&signer(1), U256::ZERO).unwrap();
		nonces.consume_once(&signer(2), U256::ZERO).unwrap();

		nonces.consume_sequential(&signer(1), U256::ZERO).unwrap();
		assert_eq!(nonces.current_nonce(&signer(2)), U256::ZERO);
	}

	#[test]
	fn test_flavors_are_independent() {
		let mut nonces = NonceRegistry::new();
		let alice = signer(1);
		nonces.consume_once(&alice, U256::ZERO).unwrap();
		nonces.consume_sequential(&alice, U256::ZERO).unwrap();
		assert!(nonces.is_used(&alice, &U256::ZERO));
		assert!(!nonces.is_used(&alice, &U256::from(1)));
	}
}
