//! Shared fixtures for component tests.

use relay_ledger::implementations::memory::MemoryLedger;
use relay_ledger::TokenLedger;
use relay_signature::implementations::ecdsa::EcdsaVerifier;
use relay_signature::implementations::fake::FakeVerifier;
use relay_signature::implementations::local::LocalSigner;
use relay_signature::SignatureService;
use relay_types::{Address, U256};
use std::sync::Arc;

/// Well-known development keys.
pub(crate) const PAYER_KEY: &str =
	"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub(crate) const OTHER_KEY: &str =
	"0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub(crate) const ONE_TOKEN: u64 = 1_000_000_000_000_000_000;

pub(crate) fn tokens(n: u64) -> U256 {
	U256::from(n) * U256::from(ONE_TOKEN)
}

pub(crate) fn token_address() -> Address {
	Address::repeat_byte(0x70)
}

pub(crate) fn channel_address() -> Address {
	Address::repeat_byte(0xc4)
}

pub(crate) fn payer_signer() -> LocalSigner {
	LocalSigner::from_key_str(PAYER_KEY).unwrap()
}

pub(crate) fn other_signer() -> LocalSigner {
	LocalSigner::from_key_str(OTHER_KEY).unwrap()
}

pub(crate) fn ecdsa_service() -> Arc<SignatureService> {
	Arc::new(SignatureService::new(Box::new(EcdsaVerifier::default())))
}

pub(crate) fn fake_service() -> Arc<SignatureService> {
	Arc::new(SignatureService::new(Box::new(FakeVerifier)))
}

/// Ledger with `amount` minted to `account`.
pub(crate) async fn funded_ledger(account: Address, amount: U256) -> Arc<MemoryLedger> {
	let ledger = Arc::new(MemoryLedger::new(token_address()));
	ledger.mint(account, amount).await.unwrap();
	ledger
}
