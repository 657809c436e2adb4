//! Builder pattern for constructing relay engines.
//!
//! Resolves the configured token ledger and signature verifier through their
//! factory registries, then wires the channel ledger and the meta-transfer
//! executor around them with a shared event bus. Tests and embedders can
//! inject ready-made ledger or verifier instances instead.

use crate::channel::PaymentChannelLedger;
use crate::event_bus::EventBus;
use crate::executor::MetaTransferExecutor;
use crate::RelayEngine;
use relay_config::Config;
use relay_ledger::{LedgerFactory, TokenLedger};
use relay_signature::{SignatureService, SignatureVerifier, VerifierFactory};
use relay_types::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during relay engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions available to the builder, keyed by implementation name.
pub struct RelayFactories {
	pub ledger_factories: HashMap<String, LedgerFactory>,
	pub verifier_factories: HashMap<String, VerifierFactory>,
}

impl Default for RelayFactories {
	/// Every implementation registered by the ledger and signature crates.
	fn default() -> Self {
		Self {
			ledger_factories: relay_ledger::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			verifier_factories: relay_signature::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}
}

/// Builder for constructing a RelayEngine.
pub struct RelayBuilder {
	config: Config,
	ledger: Option<Arc<dyn TokenLedger>>,
	verifier: Option<Box<dyn SignatureVerifier>>,
}

impl RelayBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			ledger: None,
			verifier: None,
		}
	}

	/// Uses `ledger` instead of the configured ledger implementation.
	pub fn with_ledger(mut self, ledger: Arc<dyn TokenLedger>) -> Self {
		self.ledger = Some(ledger);
		self
	}

	/// Uses `verifier` instead of the configured verifier implementation.
	pub fn with_verifier(mut self, verifier: Box<dyn SignatureVerifier>) -> Self {
		self.verifier = Some(verifier);
		self
	}

	/// Builds the engine, resolving components that were not injected.
	pub fn build(self, factories: RelayFactories) -> Result<RelayEngine, BuilderError> {
		let ledger = match self.ledger {
			Some(ledger) => ledger,
			None => {
				let name = &self.config.ledger.primary;
				let config = self.config.primary_ledger().ok_or_else(|| {
					BuilderError::MissingComponent(format!("ledger implementation '{}'", name))
				})?;
				let factory = factories.ledger_factories.get(name).ok_or_else(|| {
					BuilderError::Config(format!("Unknown ledger implementation '{}'", name))
				})?;
				let ledger = factory(config).map_err(|e| {
					tracing::error!(component = "ledger", implementation = %name, error = %e, "Failed to create ledger implementation");
					BuilderError::Config(format!(
						"Failed to create ledger implementation '{}': {}",
						name, e
					))
				})?;
				tracing::info!(component = "ledger", implementation = %name, "Loaded");
				Arc::from(ledger)
			},
		};

		let verifier = match self.verifier {
			Some(verifier) => verifier,
			None => {
				let name = &self.config.signature.primary;
				let config = self.config.primary_signature().ok_or_else(|| {
					BuilderError::MissingComponent(format!("signature implementation '{}'", name))
				})?;
				let factory = factories.verifier_factories.get(name).ok_or_else(|| {
					BuilderError::Config(format!("Unknown signature implementation '{}'", name))
				})?;
				let verifier = factory(config).map_err(|e| {
					tracing::error!(component = "signature", implementation = %name, error = %e, "Failed to create signature implementation");
					BuilderError::Config(format!(
						"Failed to create signature implementation '{}': {}",
						name, e
					))
				})?;
				tracing::info!(component = "signature", implementation = %name, "Loaded");
				verifier
			},
		};

		if ledger.address() == self.config.channel.address {
			return Err(BuilderError::Config(
				"Channel ledger address must differ from the token address".into(),
			));
		}

		let signatures = Arc::new(SignatureService::new(verifier));
		let event_bus = EventBus::new(self.config.events.capacity);

		let channels = Arc::new(PaymentChannelLedger::new(
			self.config.channel.address,
			ledger.clone(),
			signatures.clone(),
			self.config.channel.cap_to_payer_balance,
			event_bus.clone(),
		));
		let executor = Arc::new(MetaTransferExecutor::new(
			ledger.clone(),
			signatures,
			Bytes::copy_from_slice(self.config.cheque.legacy_marker.as_bytes()),
			event_bus.clone(),
		));

		tracing::info!(
			relay_id = %self.config.relay.id,
			token = %ledger.address(),
			channel_ledger = %self.config.channel.address,
			"Relay engine built"
		);
		Ok(RelayEngine::new(
			self.config,
			ledger,
			channels,
			executor,
			event_bus,
		))
	}
}
