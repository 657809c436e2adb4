//! Tightly packed message encoding.
//!
//! Signed messages are plain concatenations of their fields, without ABI
//! word alignment for addresses: an address contributes 20 bytes, a numeric
//! field 32 big-endian bytes, and variable data its raw bytes. The resulting
//! byte string is hashed with keccak-256 and then wrapped with the
//! personal-message prefix before signing.

use alloy_primitives::{eip191_hash_message, Address, B256, U256};

/// Builder for canonical packed messages.
#[derive(Debug, Default, Clone)]
pub struct PackedEncoder {
	buf: Vec<u8>,
}

impl PackedEncoder {
	pub fn new() -> Self {
		Self { buf: Vec::new() }
	}

	/// Appends the raw 20 address bytes.
	pub fn push_address(&mut self, addr: &Address) -> &mut Self {
		self.buf.extend_from_slice(addr.as_slice());
		self
	}

	/// Appends a 32-byte big-endian, left-padded integer.
	pub fn push_u256(&mut self, v: U256) -> &mut Self {
		let word: [u8; 32] = v.to_be_bytes::<32>();
		self.buf.extend_from_slice(&word);
		self
	}

	/// Appends a 32-byte word as is.
	pub fn push_b256(&mut self, v: &B256) -> &mut Self {
		self.buf.extend_from_slice(v.as_slice());
		self
	}

	/// Appends variable-length bytes without a length prefix.
	pub fn push_bytes(&mut self, data: &[u8]) -> &mut Self {
		self.buf.extend_from_slice(data);
		self
	}

	pub fn push_u8(&mut self, v: u8) -> &mut Self {
		self.buf.push(v);
		self
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}

/// Wraps a 32-byte message digest with the personal-message prefix.
///
/// Computes `keccak256("\x19Ethereum Signed Message:\n32" || digest)`, which is
/// what wallets sign when asked to sign the digest bytes.
pub fn personal_message_hash(digest: &B256) -> B256 {
	eip191_hash_message(digest.as_slice())
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::keccak256;

	#[test]
	fn test_packed_layout() {
		let addr = Address::repeat_byte(0xaa);
		let mut enc = PackedEncoder::new();
		enc.push_address(&addr)
			.push_u256(U256::from(0x0102u64))
			.push_bytes(&[0xde, 0xad])
			.push_u8(1);
		let out = enc.finish();

		assert_eq!(out.len(), 20 + 32 + 2 + 1);
		assert_eq!(&out[..20], addr.as_slice());
		assert!(out[20..50].iter().all(|b| *b == 0));
		assert_eq!(&out[50..52], &[0x01, 0x02]);
		assert_eq!(&out[52..54], &[0xde, 0xad]);
		assert_eq!(out[54], 1);
	}

	#[test]
	fn test_personal_message_hash_prefix() {
		let digest = keccak256(b"payload");
		let mut prefixed = b"\x19Ethereum Signed Message:\n32".to_vec();
		prefixed.extend_from_slice(digest.as_slice());

		assert_eq!(personal_message_hash(&digest), keccak256(&prefixed));
	}
}
